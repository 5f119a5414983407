//! `qrstash` - A local store for photographed QR codes
//!
//! This library keeps QR code images on disk, files them under user-defined
//! category tabs persisted in a small preference store, and decodes their
//! payloads on demand without blocking the caller.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod category;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod images;
pub mod library;
pub mod logging;
pub mod preview;
pub mod record;
pub mod storage;

pub use category::{Category, CategoryRegistry};
pub use config::Config;
pub use decode::{DecodeService, QrDecoder, RqrrDecoder};
pub use error::{Error, Result};
pub use images::ImageStore;
pub use library::Library;
pub use logging::init_logging;
pub use preview::{Preview, PreviewSlot};
pub use record::{filter_by_category, RecordStore, SavedQrRecord};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
