//! QR payload decoding.
//!
//! Decoding is delegated to a [`QrDecoder`]. The bundled [`RqrrDecoder`]
//! prepares the picture the way a phone camera shot needs (downscale,
//! flatten transparency, greyscale) and then runs `rqrr` grid detection.
//! [`DecodeService`] moves the work onto the blocking thread pool so the
//! caller only ever awaits a result.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, warn};

use crate::images::ImageStore;

/// Longest image side fed to the detector unless configured otherwise.
pub const DEFAULT_MAX_DIMENSION: u32 = 1000;

/// Something that can find a QR code in an image.
///
/// Implementations must not fail loudly: every problem (unreadable bytes,
/// no code present, damaged code) is reported as `None`.
pub trait QrDecoder: Send + Sync {
    /// The name of this decoder (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Return the payload of the first QR code found in `image`.
    fn decode(&self, image: &[u8]) -> Option<String>;
}

/// QR decoder built on the `rqrr` detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RqrrDecoder {
    max_dimension: u32,
}

impl RqrrDecoder {
    /// Create a decoder that downsizes images to at most `max_dimension`
    /// pixels on their longest side before scanning.
    #[must_use]
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Longest side an image is scaled down to before scanning.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl Default for RqrrDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl QrDecoder for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, image: &[u8]) -> Option<String> {
        let decoded = match image::load_from_memory(image) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("Not a decodable image: {}", e);
                return None;
            }
        };

        let grey = prepare_for_scan(&decoded, self.max_dimension);
        let width = usize::try_from(grey.width()).ok()?;
        let height = usize::try_from(grey.height()).ok()?;
        let pixels = grey.into_raw();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| pixels[y * width + x]);
        let grids = prepared.detect_grids();
        debug!("Detected {} candidate QR grids", grids.len());

        for grid in grids {
            match grid.decode() {
                Ok((_, payload)) => return Some(payload),
                Err(e) => debug!("QR grid failed to decode: {:?}", e),
            }
        }
        None
    }
}

/// Scale an image down to fit `max_dimension` and turn it into greyscale,
/// treating transparent pixels as white.
#[must_use]
pub fn prepare_for_scan(image: &DynamicImage, max_dimension: u32) -> GrayImage {
    let scaled = if image.width().max(image.height()) > max_dimension {
        Cow::Owned(image.resize(max_dimension, max_dimension, FilterType::Triangle))
    } else {
        Cow::Borrowed(image)
    };

    let rgba = scaled.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let luma = (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000;
        let alpha = u32::from(a);
        let flattened = (luma * alpha + 255 * (255 - alpha)) / 255;
        Luma([u8::try_from(flattened).unwrap_or(u8::MAX)])
    })
}

/// Runs a [`QrDecoder`] off the calling task.
#[derive(Clone)]
pub struct DecodeService {
    decoder: Arc<dyn QrDecoder>,
}

impl fmt::Debug for DecodeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeService")
            .field("decoder", &self.decoder.name())
            .finish()
    }
}

impl DecodeService {
    /// Wrap a decoder.
    #[must_use]
    pub fn new(decoder: impl QrDecoder + 'static) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }

    /// Name of the wrapped decoder.
    #[must_use]
    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    /// Decode `image` on the blocking pool.
    pub async fn decode(&self, image: Vec<u8>) -> Option<String> {
        let decoder = Arc::clone(&self.decoder);
        Self::run(move || decoder.decode(&image)).await
    }

    /// Load the blob `file_name` from `images` and decode it, both on the
    /// blocking pool.
    ///
    /// A blob that disappeared before the task ran reads as `None`, the same
    /// as an image without a code.
    pub async fn decode_stored(&self, images: ImageStore, file_name: String) -> Option<String> {
        let decoder = Arc::clone(&self.decoder);
        Self::run(move || {
            let Some(bytes) = images.read(&file_name) else {
                debug!("Image {} vanished before decoding", file_name);
                return None;
            };
            decoder.decode(&bytes)
        })
        .await
    }

    async fn run<F>(job: F) -> Option<String>
    where
        F: FnOnce() -> Option<String> + Send + 'static,
    {
        match tokio::task::spawn_blocking(job).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Decode task did not complete: {}", e);
                None
            }
        }
    }
}
