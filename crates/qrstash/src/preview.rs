//! Preview state for a tapped record.
//!
//! Decoding finishes asynchronously, possibly after the user has moved on.
//! A [`PreviewSlot`] hands out a ticket when a preview is requested and
//! only accepts a result carrying the latest ticket; anything older is
//! dropped on delivery.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::record::SavedQrRecord;

/// Text shown when no payload could be decoded.
pub const NO_QR: &str = "No QR";

/// Placeholder shown for a record whose image is missing.
pub const NO_IMAGE: &str = "No Image";

/// What the user sees after tapping a saved QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// Heading, falling back to a generic title for untitled records.
    pub title: String,
    /// Blob name of the previewed image.
    pub file_name: String,
    /// Decoded payload, if any.
    pub payload: Option<String>,
}

impl Preview {
    /// Build the preview of `record` from a decode result.
    #[must_use]
    pub fn new(record: &SavedQrRecord, payload: Option<String>) -> Self {
        Self {
            title: record.display_title().to_string(),
            file_name: record.file_name.clone(),
            payload,
        }
    }

    /// Text to display under the image.
    #[must_use]
    pub fn text(&self) -> &str {
        self.payload.as_deref().unwrap_or(NO_QR)
    }

    /// Whether the payload can be opened as a link.
    #[must_use]
    pub fn is_link_enabled(&self) -> bool {
        self.payload.is_some()
    }
}

/// Identifies one preview request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket(u64);

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    current: Option<Preview>,
}

/// Holds the preview currently on screen.
#[derive(Debug, Default)]
pub struct PreviewSlot {
    state: Mutex<SlotState>,
}

impl PreviewSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new preview request, invalidating every earlier ticket.
    pub fn begin(&self) -> PreviewTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.current = None;
        PreviewTicket(state.generation)
    }

    /// Offer a finished preview.
    ///
    /// Returns `true` if it was shown, `false` if the request was
    /// superseded or dismissed in the meantime.
    pub fn deliver(&self, ticket: PreviewTicket, preview: Preview) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.0 {
            debug!("Discarding stale preview for {}", preview.file_name);
            return false;
        }
        state.current = Some(preview);
        true
    }

    /// Close the preview. Results still in flight will be discarded.
    pub fn dismiss(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.current = None;
    }

    /// The preview on screen, if any.
    #[must_use]
    pub fn current(&self) -> Option<Preview> {
        self.lock().current.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
