//! On-disk image blobs.
//!
//! Each saved QR code owns one file in the images directory, named by a
//! freshly generated UUID. Records refer to blobs by that name only.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Extension used for blob names unless configured otherwise.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// JPEG quality used when normalizing imported images.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Directory of image blobs.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    extension: String,
}

impl ImageStore {
    /// Open an image store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        debug!("Image store at {}", dir.display());
        Ok(Self {
            dir,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    /// The images directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extension appended to generated names.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Store `bytes` under a newly generated name and return that name.
    ///
    /// The blob is written to a hidden temporary file, synced, then renamed
    /// into place, so a name returned here always refers to a complete file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWrite`] if any step fails. No file is left
    /// behind under the returned name in that case.
    pub fn write(&self, bytes: &[u8]) -> Result<String> {
        let name = format!(
            "{}.{}",
            Uuid::new_v4().to_string().to_uppercase(),
            self.extension
        );
        let target = self.dir.join(&name);
        let temp = self.dir.join(format!(".{name}.tmp"));

        if let Err(source) = write_then_rename(&temp, &target, bytes) {
            let _ = fs::remove_file(&temp);
            warn!("Failed to write image {}: {}", name, source);
            return Err(Error::StorageWrite { name, source });
        }

        debug!("Wrote image {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    /// Read the blob stored under `name`.
    ///
    /// Returns `None` if there is no such blob. Missing images are an
    /// expected outcome, so this never fails.
    #[must_use]
    pub fn read(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Image {} not found", name);
                None
            }
            Err(e) => {
                warn!("Could not read image {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether a blob exists under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_some_and(|path| path.is_file())
    }

    /// Full path of the blob named `name`.
    ///
    /// Returns `None` for names that could escape the images directory or
    /// refer to hidden temporary files.
    #[must_use]
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\']);
        valid.then(|| self.dir.join(name))
    }
}

fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(temp, target)
}

/// Re-encode an image in any supported format as JPEG.
///
/// # Errors
///
/// Returns [`Error::ImageEncode`] if `bytes` is not a decodable image.
pub fn normalize_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    debug!(
        "Normalized {}x{} image to {} JPEG bytes",
        rgb.width(),
        rgb.height(),
        out.len()
    );
    Ok(out)
}
