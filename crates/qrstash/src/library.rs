//! The saved-QR library.
//!
//! [`Library`] wires the preference store, the image store and the decoder
//! together and exposes the two flows a front end drives: saving a new QR
//! image and previewing a saved one.

use tracing::{info, warn};

use crate::category::{CategoryRegistry, DEFAULT_SEED};
use crate::config::Config;
use crate::decode::{DecodeService, RqrrDecoder};
use crate::error::Result;
use crate::images::ImageStore;
use crate::preview::{Preview, PreviewSlot};
use crate::record::{filter_by_category, RecordStore, SavedQrRecord};
use crate::storage::{KeyValueStore, SqliteStore};

/// Saved QR codes with their categories and images.
#[derive(Debug)]
pub struct Library<S: KeyValueStore> {
    store: S,
    images: ImageStore,
    decoder: DecodeService,
    seed: Vec<String>,
}

impl Library<SqliteStore> {
    /// Open the library described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or the images directory cannot be
    /// opened.
    pub fn open(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(config.database_path())?;
        let images = ImageStore::open(config.images_dir(), &config.storage.image_extension)?;
        let decoder = DecodeService::new(RqrrDecoder::new(config.decode.max_dimension));
        Ok(Self::new(store, images, decoder).with_seed(config.categories.seed.clone()))
    }
}

impl<S: KeyValueStore> Library<S> {
    /// Assemble a library from its parts.
    #[must_use]
    pub fn new(store: S, images: ImageStore, decoder: DecodeService) -> Self {
        Self {
            store,
            images,
            decoder,
            seed: DEFAULT_SEED.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the categories written on first launch.
    #[must_use]
    pub fn with_seed(mut self, seed: Vec<String>) -> Self {
        self.seed = seed;
        self
    }

    /// The preference store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// The decoder used for previews.
    #[must_use]
    pub fn decoder(&self) -> &DecodeService {
        &self.decoder
    }

    /// The category registry.
    #[must_use]
    pub fn categories(&self) -> CategoryRegistry<'_, S> {
        CategoryRegistry::with_seed(&self.store, self.seed.iter().map(String::as_str))
    }

    /// The record store.
    #[must_use]
    pub fn records(&self) -> RecordStore<'_, S> {
        RecordStore::new(&self.store, &self.images)
    }

    /// Records listed under `category`, in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn browse(&self, category: &str) -> Result<Vec<SavedQrRecord>> {
        let records = self.records().load_all()?;
        Ok(filter_by_category(&records, category)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Save a new QR image.
    ///
    /// The image is written first; if that fails nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorageWrite`] if the image cannot be written,
    /// or an error if the record cannot be persisted.
    pub fn save_qr(&self, image: &[u8], category: &str, title: &str) -> Result<SavedQrRecord> {
        let file_name = self.images.write(image)?;
        let record = SavedQrRecord::new(file_name, category, title);

        if let Err(e) = self.records().append(&record) {
            warn!(
                "Image {} was written but its record was not saved: {}",
                record.file_name, e
            );
            return Err(e);
        }

        info!("Saved QR {} under {}", record.file_name, record.category);
        Ok(record)
    }

    /// Decode `record`'s image in the background and build its preview.
    pub async fn preview(&self, record: &SavedQrRecord) -> Preview {
        let payload = self
            .decoder
            .decode_stored(self.images.clone(), record.file_name.clone())
            .await;
        Preview::new(record, payload)
    }

    /// Request a preview of `record` and deliver it into `slot`.
    ///
    /// Returns `false` if the slot moved on before decoding finished and
    /// the result was discarded.
    pub async fn open_preview(&self, slot: &PreviewSlot, record: &SavedQrRecord) -> bool {
        let ticket = slot.begin();
        let preview = self.preview(record).await;
        slot.deliver(ticket, preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ALL;
    use crate::decode::tests::{qr_png, FixedDecoder};
    use crate::decode::QrDecoder;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    #[derive(Debug)]
    struct SlowDecoder;

    impl QrDecoder for SlowDecoder {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn decode(&self, _image: &[u8]) -> Option<String> {
            std::thread::sleep(Duration::from_millis(300));
            Some("late".to_string())
        }
    }

    fn create_library(payload: Option<&'static str>) -> (tempfile::TempDir, Library<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path().join("images"), "jpg").unwrap();
        let library = Library::new(
            MemoryStore::new(),
            images,
            DecodeService::new(FixedDecoder(payload)),
        );
        (dir, library)
    }

    #[test]
    fn test_save_qr_writes_image_and_record() {
        let (_dir, library) = create_library(None);

        let record = library.save_qr(b"jpeg bytes", "Shop", "Costco").unwrap();

        assert_eq!(library.images().read(&record.file_name).unwrap(), b"jpeg bytes");
        assert_eq!(library.records().load_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_save_qr_clamps_title() {
        let (_dir, library) = create_library(None);
        let record = library
            .save_qr(b"x", "Shop", "This title keeps on going")
            .unwrap();
        assert_eq!(record.title, "This title keeps on ");
    }

    #[test]
    fn test_save_qr_failed_write_creates_no_record() {
        let (_dir, library) = create_library(None);
        std::fs::remove_dir_all(library.images().dir()).unwrap();

        let err = library.save_qr(b"x", "Shop", "Costco").unwrap_err();
        assert!(err.is_storage_write());
        assert!(library.records().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_browse_filters_by_category() {
        let (_dir, library) = create_library(None);
        library.save_qr(b"1", "Shop", "one").unwrap();
        library.save_qr(b"2", "Gas", "two").unwrap();
        library.save_qr(b"3", "Shop", "three").unwrap();

        let shop: Vec<String> = library
            .browse("Shop")
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(shop, ["one", "three"]);
        assert_eq!(library.browse(ALL).unwrap().len(), 3);
    }

    #[test]
    fn test_removing_category_keeps_records() {
        let (_dir, library) = create_library(None);
        library.save_qr(b"1", "Gas", "fuel").unwrap();

        assert!(library.categories().remove("Gas").unwrap());

        assert_eq!(library.browse("Gas").unwrap().len(), 1);
        assert_eq!(library.browse(ALL).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_seed() {
        let (_dir, library) = create_library(None);
        let library = library.with_seed(vec!["Work".to_string()]);

        let tabs = library.categories().load().unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1], "Work");
    }

    #[tokio::test]
    async fn test_preview_with_payload() {
        let (_dir, library) = create_library(Some("https://example.com"));
        let record = library.save_qr(b"x", "Shop", "").unwrap();

        let preview = library.preview(&record).await;
        assert_eq!(preview.title, "Saved QR");
        assert_eq!(preview.text(), "https://example.com");
        assert!(preview.is_link_enabled());
    }

    #[tokio::test]
    async fn test_preview_without_qr() {
        let (_dir, library) = create_library(None);
        let record = library.save_qr(b"x", "Shop", "Costco").unwrap();

        let preview = library.preview(&record).await;
        assert_eq!(preview.title, "Costco");
        assert_eq!(preview.text(), "No QR");
        assert!(!preview.is_link_enabled());
    }

    #[tokio::test]
    async fn test_preview_of_removed_image_is_no_qr() {
        let (_dir, library) = create_library(Some("payload"));
        let record = library.save_qr(b"x", "Shop", "Costco").unwrap();
        std::fs::remove_file(library.images().path_for(&record.file_name).unwrap()).unwrap();

        let preview = library.preview(&record).await;
        assert_eq!(preview.text(), "No QR");
    }

    #[tokio::test]
    async fn test_open_preview_delivers_into_slot() {
        let (_dir, library) = create_library(Some("payload"));
        let record = library.save_qr(b"x", "Shop", "Costco").unwrap();
        let slot = PreviewSlot::new();

        assert!(library.open_preview(&slot, &record).await);
        assert_eq!(slot.current().unwrap().text(), "payload");
    }

    #[tokio::test]
    async fn test_dismissed_preview_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path(), "jpg").unwrap();
        let library = Library::new(MemoryStore::new(), images, DecodeService::new(SlowDecoder));
        let record = library.save_qr(b"x", "Shop", "Costco").unwrap();
        let slot = PreviewSlot::new();

        let (delivered, ()) = tokio::join!(library.open_preview(&slot, &record), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slot.dismiss();
        });

        assert!(!delivered);
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn test_real_decoder_previews_saved_qr_code() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path(), "jpg").unwrap();
        let library = Library::new(
            MemoryStore::new(),
            images,
            DecodeService::new(RqrrDecoder::default()),
        );

        let jpeg = crate::images::normalize_to_jpeg(
            &qr_png("https://example.com/costco", 400),
            90,
        )
        .unwrap();
        let record = library.save_qr(&jpeg, "Shop", "Costco").unwrap();

        let preview = library.preview(&record).await;
        assert_eq!(preview.text(), "https://example.com/costco");
        assert!(preview.is_link_enabled());
    }

    #[tokio::test]
    async fn test_real_decoder_on_non_qr_image() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path(), "jpg").unwrap();
        let library = Library::new(
            MemoryStore::new(),
            images,
            DecodeService::new(RqrrDecoder::default()),
        );

        let blank = image::RgbImage::from_pixel(32, 32, image::Rgb([255, 255, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        blank.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let record = library.save_qr(&png.into_inner(), "Shop", "").unwrap();

        let preview = library.preview(&record).await;
        assert!(preview.payload.is_none());
        assert_eq!(preview.text(), "No QR");
    }
}
