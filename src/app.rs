//! Session state for the presentation collaborator.
//!
//! One `App` owns everything a user-facing surface needs: the two derived
//! stores produced by the pipeline and the saved-book library. Queries are
//! pure reads; mutations persist and return an outcome the caller can
//! render, instead of signalling through shared state.

use anyhow::Context;

use crate::config::Config;
use crate::library::{Library, LibraryEntry, LibraryFilter, RemoveOutcome, SaveOutcome};
use crate::storage::BackendLocal;
use crate::stores::{OcrStore, RecommendationStore};

#[derive(Debug)]
pub struct App {
    backend: BackendLocal,
    ocr: OcrStore,
    recommendations: RecommendationStore,
    library: Library,
}

impl App {
    /// Open a session over an existing data directory.
    ///
    /// The derived stores must exist and parse: a session cannot run before
    /// the pipeline has completed at least once. The library is different;
    /// an absent or broken library file just means starting empty.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let backend = BackendLocal::new(config.base_path())?;

        let ocr = OcrStore::load(&backend)
            .context("OCR store unavailable; run `booksnap pipeline` first")?;
        let recommendations = RecommendationStore::load(&backend)
            .context("recommendation store unavailable; run `booksnap pipeline` first")?;
        let library = Library::load(&backend);

        log::debug!(
            "session open: {} covers, {} ranked, {} library entries",
            ocr.len(),
            recommendations.len(),
            library.len()
        );

        Ok(Self {
            backend,
            ocr,
            recommendations,
            library,
        })
    }

    /// Extracted token sequence for one cover, if it was processed.
    pub fn tokens(&self, key: &str) -> Option<&[String]> {
        self.ocr.tokens(key)
    }

    /// Ranked neighbor keys for one cover, if it was ranked.
    pub fn recommendations_for(&self, key: &str) -> Option<&[String]> {
        self.recommendations.neighbors(key)
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn filter_library(&self, filter: &LibraryFilter) -> Vec<&LibraryEntry> {
        self.library.filter(filter)
    }

    /// Save a book to the library. `AlreadyPresent` means an identical entry
    /// exists and nothing was written.
    pub fn save_entry(&mut self, entry: LibraryEntry) -> anyhow::Result<SaveOutcome> {
        self.library.append(&self.backend, entry)
    }

    /// Remove the exact entry from the library.
    pub fn remove_entry(&mut self, entry: &LibraryEntry) -> anyhow::Result<RemoveOutcome> {
        self.library.remove(&self.backend, entry)
    }

    /// Title/author guess for a cover, for pre-filling a catalog lookup.
    pub fn guess_title_author(&self, key: &str) -> Option<(String, String)> {
        self.tokens(key).map(guess_title_author)
    }
}

/// Rough title/author split: the first three detected tokens read as the
/// title, the next two as the author.
pub fn guess_title_author(tokens: &[String]) -> (String, String) {
    let title = tokens.iter().take(3).cloned().collect::<Vec<_>>().join(" ");
    let author = tokens
        .iter()
        .skip(3)
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    (title, author)
}
