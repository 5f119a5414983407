//! Category registry.
//!
//! Categories (shown as tabs) are short user-defined labels used to group
//! saved QR codes. The registry is an ordered list of unique labels that is
//! persisted as a whole under [`keys::TABS`]. The reserved label `"All"`
//! means "no filter" and is pinned to the front of the list.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{keys, KeyValueStore};

/// The reserved label that matches every record.
pub const ALL: &str = "All";

/// Maximum length of a label, in characters.
pub const MAX_LABEL_CHARS: usize = 12;

/// Categories written on first launch.
pub const DEFAULT_SEED: &[&str] = &[ALL, "Shop", "Gas", "Service", "Contacts"];

/// A validated category label.
///
/// Labels are trimmed, non-empty, at most [`MAX_LABEL_CHARS`] characters
/// and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Parse a user-supplied label.
    ///
    /// Surrounding whitespace is removed and labels longer than
    /// [`MAX_LABEL_CHARS`] are cut down. Returns `None` if nothing is left.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let cut: String = label.trim().chars().take(MAX_LABEL_CHARS).collect();
        let cut = cut.trim_end();
        if cut.is_empty() {
            None
        } else {
            Some(Self(cut.to_string()))
        }
    }

    /// The reserved `"All"` category.
    #[must_use]
    pub fn all() -> Self {
        Self(ALL.to_string())
    }

    /// Whether this is the reserved `"All"` category.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0 == ALL
    }

    /// The label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Category {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Category {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Build a registry sequence from raw labels.
///
/// Invalid and duplicate labels are dropped and `"All"` is moved (or
/// inserted) at the front.
#[must_use]
pub fn normalize_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<Category> {
    let mut tabs: Vec<Category> = Vec::new();
    for category in labels.into_iter().filter_map(Category::parse) {
        if !tabs.contains(&category) {
            tabs.push(category);
        }
    }
    tabs.retain(|c| !c.is_all());
    tabs.insert(0, Category::all());
    tabs
}

/// Pick the tab to show after the registry changed.
///
/// Keeps `selected` if it is still registered, otherwise falls back to `"All"`.
#[must_use]
pub fn resolve_selection(tabs: &[Category], selected: &str) -> Category {
    tabs.iter()
        .find(|c| c.as_str() == selected)
        .cloned()
        .unwrap_or_else(Category::all)
}

/// Ordered, persisted set of category labels.
///
/// Every call reads the current persisted list, so the registry holds no
/// state of its own beyond the seed used on first launch.
#[derive(Debug)]
pub struct CategoryRegistry<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    seed: Vec<Category>,
}

impl<'a, S: KeyValueStore + ?Sized> CategoryRegistry<'a, S> {
    /// Create a registry seeded with [`DEFAULT_SEED`].
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self::with_seed(store, DEFAULT_SEED.iter().copied())
    }

    /// Create a registry with a custom first-launch seed.
    #[must_use]
    pub fn with_seed<'l>(store: &'a S, seed: impl IntoIterator<Item = &'l str>) -> Self {
        Self {
            store,
            seed: normalize_labels(seed),
        }
    }

    /// The sequence written on first launch.
    #[must_use]
    pub fn seed(&self) -> &[Category] {
        &self.seed
    }

    /// Load the registry.
    ///
    /// Seeds the store on first launch. The result always starts with
    /// `"All"`; if the persisted list was missing, unreadable or out of
    /// shape it is repaired and written back.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn load(&self) -> Result<Vec<Category>> {
        if !self.store.get_flag(keys::FIRST_LAUNCH)? {
            self.persist(&self.seed)?;
            self.store.set_flag(keys::FIRST_LAUNCH, true)?;
            info!("Seeded {} default categories", self.seed.len());
        }

        let (tabs, repaired) = match self.store.get(keys::TABS)? {
            Some(Value::Array(items)) => {
                let tabs = normalize_labels(items.iter().filter_map(Value::as_str));
                let repaired = serde_json::to_value(&tabs)? != Value::Array(items);
                (tabs, repaired)
            }
            Some(other) => {
                warn!("Category list has unexpected shape ({}), reseeding", other);
                (self.seed.clone(), true)
            }
            None => (self.seed.clone(), true),
        };

        if repaired {
            debug!("Repairing persisted category list");
            self.persist(&tabs)?;
        }
        Ok(tabs)
    }

    /// Add a category.
    ///
    /// Returns `false` without touching the store if the trimmed label is
    /// empty or already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn add(&self, label: &str) -> Result<bool> {
        let Some(category) = Category::parse(label) else {
            debug!("Ignoring empty category label");
            return Ok(false);
        };

        let mut tabs = self.load()?;
        if tabs.contains(&category) {
            debug!("Category {} already exists", category);
            return Ok(false);
        }

        tabs.push(category.clone());
        self.persist(&tabs)?;
        info!("Added category {}", category);
        Ok(true)
    }

    /// Look up a registered category by its trimmed label.
    ///
    /// Unlike [`Category::parse`] the label is not cut to
    /// [`MAX_LABEL_CHARS`], so an over-long label never matches a shorter tab.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn find(&self, label: &str) -> Result<Option<Category>> {
        let label = label.trim();
        Ok(self.load()?.into_iter().find(|c| c.as_str() == label))
    }

    /// Remove a category.
    ///
    /// The label is trimmed before matching. `"All"` can never be removed.
    /// Records filed under the removed label are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn remove(&self, label: &str) -> Result<bool> {
        let label = label.trim();
        if label == ALL {
            debug!("Refusing to remove the {} category", ALL);
            return Ok(false);
        }

        let mut tabs = self.load()?;
        let Some(position) = tabs.iter().position(|c| c.as_str() == label) else {
            return Ok(false);
        };

        tabs.remove(position);
        self.persist(&tabs)?;
        info!("Removed category {}", label);
        Ok(true)
    }

    fn persist(&self, tabs: &[Category]) -> Result<()> {
        self.store.set(keys::TABS, &serde_json::to_value(tabs)?)
    }
}
