//! Embedding generation over synthesized cover documents.
//!
//! Wraps fastembed's `TextEmbedding`. The model is loaded once per pipeline
//! run and invoked with one batch over every eligible document.

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Model names accepted in config, mapped to fastembed's catalog.
const SUPPORTED_MODELS: &[(&str, fastembed::EmbeddingModel)] = &[
    ("all-MiniLM-L6-v2", fastembed::EmbeddingModel::AllMiniLML6V2),
    ("all-MiniLM-L6-v2-q", fastembed::EmbeddingModel::AllMiniLML6V2Q),
    ("bge-small-en-v1.5", fastembed::EmbeddingModel::BGESmallENV15),
    ("bge-small-en-v1.5-q", fastembed::EmbeddingModel::BGESmallENV15Q),
    ("bge-base-en-v1.5", fastembed::EmbeddingModel::BGEBaseENV15),
    ("bge-base-en-v1.5-q", fastembed::EmbeddingModel::BGEBaseENV15Q),
];

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("model initialization failed: {0}")]
    InitFailed(String),

    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("unknown model '{0}', supported: {}", supported_model_names())]
    UnknownModel(String),
}

fn supported_model_names() -> String {
    SUPPORTED_MODELS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn lookup_model(name: &str) -> Result<fastembed::EmbeddingModel, EmbedError> {
    SUPPORTED_MODELS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, model)| model.clone())
        .ok_or_else(|| EmbedError::UnknownModel(name.to_string()))
}

/// One embedding model, loaded and owned for the duration of a pipeline run.
///
/// `embed_batch` takes `&mut self` because the underlying model does; the
/// pipeline is single-threaded, so no interior locking is needed.
pub struct Embedder {
    model: TextEmbedding,
    name: String,
    dimensions: usize,
}

impl Embedder {
    /// Load the configured model, downloading it on first use.
    ///
    /// Model files are cached under `cache_dir/models/`.
    pub fn new(config: &EmbeddingConfig, cache_dir: PathBuf) -> Result<Self, EmbedError> {
        let model_enum = lookup_model(&config.model)?;
        // fastembed drives the download itself; the timeout stays advisory
        let _timeout = if config.download_timeout_secs > 0 {
            Duration::from_secs(config.download_timeout_secs)
        } else {
            DEFAULT_DOWNLOAD_TIMEOUT
        };

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir)
            .map_err(|e| EmbedError::InitFailed(format!("couldnt create models dir: {e}")))?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbedError::InitFailed(e.to_string()))?;

        let dimensions = probe_dimensions(&mut model)?;
        log::info!("loaded embedding model '{}' ({dimensions} dims)", config.model);

        Ok(Self {
            model,
            name: config.model.clone(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vector length produced by this model. All vectors in one run share it.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed every document in one model invocation.
    ///
    /// Documents must be non-empty; the pipeline filters empty ones out
    /// before calling. The result is index-aligned with the input.
    pub fn embed_batch(&mut self, documents: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self
            .model
            .embed(documents.to_vec(), None)
            .map_err(|e| EmbedError::EmbeddingFailed(e.to_string()))?;

        if embeddings.len() != documents.len() {
            return Err(EmbedError::EmbeddingFailed(format!(
                "model returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        Ok(embeddings)
    }
}

fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbedError> {
    let probe = model
        .embed(vec!["probe"], None)
        .map_err(|e| EmbedError::InitFailed(format!("couldnt probe dimensions: {e}")))?;

    probe
        .first()
        .map(|v| v.len())
        .ok_or_else(|| EmbedError::InitFailed("model returned no embedding".to_string()))
}
