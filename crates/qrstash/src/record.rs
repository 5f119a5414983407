//! Saved QR records.
//!
//! A record ties an image blob to a category label and an optional title.
//! Records are kept in insertion order under [`keys::SAVED_QRS`] and are
//! only ever appended.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::category::ALL;
use crate::error::{Error, Result};
use crate::images::ImageStore;
use crate::storage::{keys, KeyValueStore};

/// Maximum length of a title, in characters.
pub const MAX_TITLE_CHARS: usize = 20;

/// Heading shown for records saved without a title.
pub const UNTITLED: &str = "Saved QR";

/// Metadata of one saved QR code.
///
/// Serialized with the persisted key names `fileName`, `category` and `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQrRecord {
    /// Name of the image blob in the [`ImageStore`].
    pub file_name: String,
    /// Category label, stored by value.
    pub category: String,
    /// Display title, possibly empty.
    pub title: String,
}

impl SavedQrRecord {
    /// Create a record, cutting the title to [`MAX_TITLE_CHARS`].
    #[must_use]
    pub fn new(file_name: impl Into<String>, category: impl Into<String>, title: &str) -> Self {
        Self {
            file_name: file_name.into(),
            category: category.into(),
            title: clamp_title(title),
        }
    }

    /// Title to show in a preview heading.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// Whether this record is listed under `category`.
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        category == ALL || self.category == category
    }

    /// Read a record from its persisted form.
    ///
    /// Requires an object with a non-empty string `fileName` and a string
    /// `category`. A missing or non-string `title` reads as empty.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let file_name = object.get("fileName")?.as_str()?;
        if file_name.is_empty() {
            return None;
        }
        let category = object.get("category")?.as_str()?;
        let title = object
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Self::new(file_name, category, title))
    }
}

/// Cut a title to at most [`MAX_TITLE_CHARS`] characters.
#[must_use]
pub fn clamp_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Select the records listed under `category`, keeping their order.
///
/// `"All"` selects every record; any other label is an exact,
/// case-sensitive match.
#[must_use]
pub fn filter_by_category<'r>(
    records: &'r [SavedQrRecord],
    category: &str,
) -> Vec<&'r SavedQrRecord> {
    records.iter().filter(|r| r.in_category(category)).collect()
}

/// Append-only list of saved records.
#[derive(Debug)]
pub struct RecordStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    images: &'a ImageStore,
}

impl<'a, S: KeyValueStore + ?Sized> RecordStore<'a, S> {
    /// Create a record store backed by `store` whose records point into `images`.
    #[must_use]
    pub fn new(store: &'a S, images: &'a ImageStore) -> Self {
        Self { store, images }
    }

    /// Load every readable record in insertion order.
    ///
    /// Entries that cannot be read as a record are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load_all(&self) -> Result<Vec<SavedQrRecord>> {
        let entries = self.raw_entries()?;
        let records: Vec<SavedQrRecord> = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let record = SavedQrRecord::from_value(entry);
                if record.is_none() {
                    warn!("Skipping malformed saved record #{}: {}", index, entry);
                }
                record
            })
            .collect();
        debug!("Loaded {} of {} saved records", records.len(), entries.len());
        Ok(records)
    }

    /// Append `record` and persist the full list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageMissing`] if the record's image has not been
    /// written, or an error if the store cannot be read or written.
    pub fn append(&self, record: &SavedQrRecord) -> Result<()> {
        if !self.images.contains(&record.file_name) {
            return Err(Error::image_missing(&record.file_name));
        }

        let mut entries = self.raw_entries()?;
        entries.push(serde_json::to_value(record)?);
        self.store.set(keys::SAVED_QRS, &Value::Array(entries))?;

        info!(
            "Saved record {} in category {}",
            record.file_name, record.category
        );
        Ok(())
    }

    /// Find the first record that references the blob `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find(&self, file_name: &str) -> Result<Option<SavedQrRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|r| r.file_name == file_name))
    }

    /// The persisted list as-is, so unreadable entries survive a rewrite.
    fn raw_entries(&self) -> Result<Vec<Value>> {
        match self.store.get(keys::SAVED_QRS)? {
            Some(Value::Array(entries)) => Ok(entries),
            Some(other) => {
                warn!("Saved records have unexpected shape ({}), ignoring", other);
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}
