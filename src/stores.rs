//! Derived flat stores produced by the pipeline.
//!
//! Both stores map ImageKey (the cover filename) to an ordered string list
//! and are serialized as pretty-printed JSON. They are regenerated wholesale
//! on every pipeline run; readers that find them missing or malformed cannot
//! proceed, so loads here are strict.

use crate::storage::StorageManager;
use anyhow::Context;
use std::collections::BTreeMap;

pub const OCR_STORE_FILE: &str = "ocr_output.json";
pub const RECOMMENDATION_STORE_FILE: &str = "recommendations.json";

type KeyedLists = BTreeMap<String, Vec<String>>;

fn load_map(store: &dyn StorageManager, file: &str) -> anyhow::Result<KeyedLists> {
    let bytes = store
        .read(file)
        .with_context(|| format!("couldnt read {file}; has the pipeline been run?"))?;
    serde_json::from_slice(&bytes).with_context(|| format!("{file} is malformed"))
}

fn save_map(store: &dyn StorageManager, file: &str, map: &KeyedLists) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(map).with_context(|| format!("couldnt encode {file}"))?;
    store
        .write(file, json.as_bytes())
        .with_context(|| format!("couldnt write {file}"))
}

/// ImageKey → TokenSequence, the raw extraction output per cover.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OcrStore {
    entries: KeyedLists,
}

impl OcrStore {
    pub fn new(entries: KeyedLists) -> Self {
        Self { entries }
    }

    pub fn load(store: &dyn StorageManager) -> anyhow::Result<Self> {
        Ok(Self {
            entries: load_map(store, OCR_STORE_FILE)?,
        })
    }

    pub fn save(&self, store: &dyn StorageManager) -> anyhow::Result<()> {
        save_map(store, OCR_STORE_FILE, &self.entries)
    }

    pub fn tokens(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|tokens| tokens.as_slice())
    }

    /// Keys in sorted order; this order fixes ranking tie-breaks.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ImageKey → RecommendationList, the ranked neighbors per cover.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecommendationStore {
    entries: KeyedLists,
}

impl RecommendationStore {
    pub fn new(entries: KeyedLists) -> Self {
        Self { entries }
    }

    pub fn load(store: &dyn StorageManager) -> anyhow::Result<Self> {
        Ok(Self {
            entries: load_map(store, RECOMMENDATION_STORE_FILE)?,
        })
    }

    pub fn save(&self, store: &dyn StorageManager) -> anyhow::Result<()> {
        save_map(store, RECOMMENDATION_STORE_FILE, &self.entries)
    }

    pub fn neighbors(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(|keys| keys.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
