//! The user's saved-book library.
//!
//! A flat ordered list of entries, rewritten wholesale after every mutation.
//! Entries have no identifier: identity is full structural equality, so the
//! same book saved twice with a different rating is a distinct entry, while
//! an exact duplicate save is a no-op.

use crate::storage::StorageManager;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const LIBRARY_FILE: &str = "library.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub title: String,
    pub author: String,
    pub filename: String,
    pub rating: u8,
    /// User-supplied, case-sensitive
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of a save attempt; `AlreadyPresent` wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadyPresent,
}

/// Result of a removal attempt; `NotFound` wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Conjunctive library filter; absent criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    /// Case-insensitive substring over title or author
    pub query: Option<String>,
    /// Exact tag membership (tags themselves are case-sensitive)
    pub tag: Option<String>,
    pub min_rating: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    entries: Vec<LibraryEntry>,
}

impl Library {
    /// Load the library, recovering to empty when the file is absent or
    /// unparsable. A fresh install has no library file and that is fine.
    pub fn load(store: &dyn StorageManager) -> Self {
        if !store.exists(LIBRARY_FILE) {
            return Self::default();
        }

        let bytes = match store.read(LIBRARY_FILE) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("{LIBRARY_FILE}: couldnt read, starting with an empty library: {err}");
                return Self::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => Self { entries },
            Err(err) => {
                log::warn!("{LIBRARY_FILE}: malformed, starting with an empty library: {err}");
                Self::default()
            }
        }
    }

    fn save(&self, store: &dyn StorageManager) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .context("couldnt encode library")?;
        store
            .write(LIBRARY_FILE, json.as_bytes())
            .with_context(|| format!("couldnt write {LIBRARY_FILE}"))
    }

    /// Append an entry and persist, unless a structurally identical entry is
    /// already present.
    pub fn append(
        &mut self,
        store: &dyn StorageManager,
        entry: LibraryEntry,
    ) -> anyhow::Result<SaveOutcome> {
        if self.entries.contains(&entry) {
            return Ok(SaveOutcome::AlreadyPresent);
        }

        self.entries.push(entry);
        self.save(store)?;
        Ok(SaveOutcome::Saved)
    }

    /// Remove the first entry exactly matching `entry` and persist.
    pub fn remove(
        &mut self,
        store: &dyn StorageManager,
        entry: &LibraryEntry,
    ) -> anyhow::Result<RemoveOutcome> {
        match self.entries.iter().position(|e| e == entry) {
            Some(idx) => {
                self.entries.remove(idx);
                self.save(store)?;
                Ok(RemoveOutcome::Removed)
            }
            None => Ok(RemoveOutcome::NotFound),
        }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter(&self, filter: &LibraryFilter) -> Vec<&LibraryEntry> {
        let query = filter.query.as_ref().map(|q| q.to_lowercase());

        self.entries
            .iter()
            .filter(|entry| {
                query
                    .as_ref()
                    .map(|q| {
                        entry.title.to_lowercase().contains(q)
                            || entry.author.to_lowercase().contains(q)
                    })
                    .unwrap_or(true)
            })
            .filter(|entry| {
                filter
                    .tag
                    .as_ref()
                    .map(|tag| entry.tags.iter().any(|t| t == tag))
                    .unwrap_or(true)
            })
            .filter(|entry| {
                filter
                    .min_rating
                    .map(|min| entry.rating >= min)
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Every tag in use, sorted and deduplicated.
    pub fn all_tags(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
