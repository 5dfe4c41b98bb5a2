use crate::storage::{BackendLocal, StorageManager};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.yaml";

/// Default embedding model (384 dimensions, small enough for laptop batches)
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
/// Default number of neighbors per recommendation list
const DEFAULT_TOP_K: usize = 3;
/// Default tesseract language pack
const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Configuration for the text extraction stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language code (e.g. "eng")
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Tesseract page segmentation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psm: Option<i32>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            psm: None,
        }
    }
}

/// Configuration for embedding generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g. "all-MiniLM-L6-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Configuration for the similarity ranking stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Neighbors per image; lists are clamped to min(top_k, N-1)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_ocr_language() -> String {
    DEFAULT_OCR_LANGUAGE.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory of raw cover images, relative to the base path unless absolute
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub recommend: RecommendConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

fn default_images_dir() -> String {
    "raw_images".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            ocr: OcrConfig::default(),
            embedding: EmbeddingConfig::default(),
            recommend: RecommendConfig::default(),
            base_path: String::new(),
        }
    }
}

impl Config {
    fn validate(&self) {
        if self.ocr.language.trim().is_empty() {
            panic!("ocr.language must not be empty");
        }

        if self.recommend.top_k == 0 {
            panic!("recommend.top_k must be greater than 0");
        }

        if self.embedding.download_timeout_secs == 0 {
            panic!("embedding.download_timeout_secs must be greater than 0");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let store = BackendLocal::new(base_path).expect("couldnt create base path");

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store
                .write(
                    CONFIG_FILE,
                    serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
                )
                .expect("couldnt write default config");
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE).expect("couldnt read config"))
            .expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let store = BackendLocal::new(&self.base_path).expect("couldnt create base path");

        let config_str = serde_yml::to_string(&self).unwrap();
        store
            .write(CONFIG_FILE, config_str.as_bytes())
            .expect("couldnt write config");
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Absolute location of the raw image directory.
    pub fn images_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.images_dir);
        if dir.is_absolute() {
            dir
        } else {
            PathBuf::from(&self.base_path).join(dir)
        }
    }

    /// Cache directory for downloaded embedding models.
    pub fn model_cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.base_path)
    }

    #[cfg(test)]
    pub fn for_tests(base_path: &str) -> Self {
        Self {
            images_dir: default_images_dir(),
            ocr: OcrConfig::default(),
            embedding: EmbeddingConfig::default(),
            recommend: RecommendConfig::default(),
            base_path: base_path.to_string(),
        }
    }
}
