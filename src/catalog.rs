//! Book-catalog metadata lookup.
//!
//! Thin blocking client for a Google-Books-style volumes endpoint. Only the
//! first search result is read. A response without items is a normal
//! "not found" outcome; transport and decode failures propagate to the
//! caller unchanged, with no retry.

use anyhow::Context;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";

/// Catalog record for one matched book, camelCase on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeItem {
    #[serde(rename = "volumeInfo")]
    volume_info: Volume,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    items: Option<Vec<VolumeItem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Volume),
    NotFound,
}

pub struct CatalogClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

fn build_query(title: &str, author: Option<&str>) -> String {
    match author {
        Some(author) if !author.trim().is_empty() => {
            format!("intitle:{title}+inauthor:{author}")
        }
        _ => format!("intitle:{title}"),
    }
}

impl CatalogClient {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Point the client at a different endpoint; tests use a local one.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Look a book up by title and optional author.
    pub fn lookup(&self, title: &str, author: Option<&str>) -> anyhow::Result<LookupOutcome> {
        let query = build_query(title, author);
        log::debug!("catalog lookup: {query}");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query.as_str())])
            .send()
            .context("catalog request failed")?;

        let parsed: SearchResponse = response
            .json()
            .context("couldnt parse catalog response")?;

        match parsed.items.and_then(|items| items.into_iter().next()) {
            Some(item) => Ok(LookupOutcome::Found(item.volume_info)),
            None => Ok(LookupOutcome::NotFound),
        }
    }
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}
