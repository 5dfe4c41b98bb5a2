//! The offline batch pipeline: covers → tokens → documents → vectors →
//! neighbor lists.
//!
//! Both derived stores are rewritten wholesale on every run; nothing is
//! updated incrementally. The whole eligible document set goes through the
//! embedder in one batch.

use crate::config::Config;
use crate::embed::Embedder;
use crate::extract::{self, ExtractionReport, TextExtractor};
use crate::rank::{self, SimilarityMatrix};
use crate::storage::BackendLocal;
use crate::stores::{OcrStore, RecommendationStore};

/// Join a token sequence into the single text blob fed to the embedder.
pub fn synthesize_document(tokens: &[String]) -> String {
    tokens.join(" ")
}

/// Counts from one ranking run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecommendReport {
    /// Covers that received a vector and a neighbor list
    pub embedded: usize,
    /// Covers excluded because no text was detected on them
    pub skipped_empty: usize,
}

/// Split the OCR store into the embedding-eligible keys and their documents.
///
/// Covers with an empty token sequence are excluded: they get no vector and
/// no entry in the recommendation store.
fn eligible_documents(ocr: &OcrStore) -> (Vec<String>, Vec<String>, usize) {
    let mut keys = Vec::new();
    let mut documents = Vec::new();
    let mut skipped_empty = 0;

    for (key, tokens) in ocr.iter() {
        let document = synthesize_document(tokens);
        if document.is_empty() {
            log::debug!("{key}: no text detected, excluded from ranking");
            skipped_empty += 1;
            continue;
        }
        keys.push(key.clone());
        documents.push(document);
    }

    (keys, documents, skipped_empty)
}

/// OCR every cover image and rewrite the OCR store.
pub fn run_extraction(
    config: &Config,
    extractor: &dyn TextExtractor,
) -> anyhow::Result<ExtractionReport> {
    let (results, report) = extract::extract_images(extractor, &config.images_dir())?;

    let backend = BackendLocal::new(config.base_path())?;
    OcrStore::new(results).save(&backend)?;

    log::info!(
        "extraction done: {} covers, {} skipped",
        report.processed,
        report.skipped
    );
    Ok(report)
}

/// Embed the OCR'd covers and rewrite the recommendation store.
///
/// Requires an existing OCR store; a missing or malformed one is an error.
pub fn run_recommendation(
    config: &Config,
    embedder: &mut Embedder,
) -> anyhow::Result<RecommendReport> {
    let backend = BackendLocal::new(config.base_path())?;
    let ocr = OcrStore::load(&backend)?;

    let (keys, documents, skipped_empty) = eligible_documents(&ocr);
    log::debug!(
        "embedding {} documents with model '{}'",
        documents.len(),
        embedder.name()
    );

    let embeddings = embedder.embed_batch(&documents)?;
    let matrix = SimilarityMatrix::from_embeddings(&embeddings)?;
    let neighbors = rank::recommendations(&keys, &matrix, config.recommend.top_k)?;

    RecommendationStore::new(neighbors).save(&backend)?;

    log::info!(
        "ranking done: {} covers embedded, {} without text",
        keys.len(),
        skipped_empty
    );
    Ok(RecommendReport {
        embedded: keys.len(),
        skipped_empty,
    })
}

/// Full batch: extraction then ranking.
pub fn run(
    config: &Config,
    extractor: &dyn TextExtractor,
    embedder: &mut Embedder,
) -> anyhow::Result<(ExtractionReport, RecommendReport)> {
    let extraction = run_extraction(config, extractor)?;
    let ranking = run_recommendation(config, embedder)?;
    Ok((extraction, ranking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_document_is_tokens_joined_by_single_spaces() {
        let tokens = vec!["DUNE".to_string(), "Frank".to_string(), "Herbert".to_string()];
        assert_eq!(synthesize_document(&tokens), "DUNE Frank Herbert");
        assert_eq!(synthesize_document(&[]), "");
    }

    #[test]
    fn test_covers_without_text_are_excluded() {
        let mut entries = BTreeMap::new();
        entries.insert("a.jpg".to_string(), vec!["Dune".to_string()]);
        entries.insert("blank.png".to_string(), vec![]);
        entries.insert(
            "b.jpg".to_string(),
            vec!["Dune".to_string(), "Herbert".to_string()],
        );
        let ocr = OcrStore::new(entries);

        let (keys, documents, skipped) = eligible_documents(&ocr);

        assert_eq!(keys, vec!["a.jpg", "b.jpg"]);
        assert_eq!(documents, vec!["Dune", "Dune Herbert"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_eligible_keys_come_out_sorted() {
        // the OCR store iterates sorted keys; that order is the ranking
        // tie-break, so it must survive the eligibility pass
        let mut entries = BTreeMap::new();
        entries.insert("z.jpg".to_string(), vec!["z".to_string()]);
        entries.insert("a.jpg".to_string(), vec!["a".to_string()]);
        entries.insert("m.jpg".to_string(), vec!["m".to_string()]);
        let ocr = OcrStore::new(entries);

        let (keys, _, _) = eligible_documents(&ocr);
        assert_eq!(keys, vec!["a.jpg", "m.jpg", "z.jpg"]);
    }
}
