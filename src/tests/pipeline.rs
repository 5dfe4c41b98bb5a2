//! End-to-end pipeline tests.
//!
//! Tests that need the embedding model are marked #[ignore] by default.
//! Run with: cargo test -- --ignored

use crate::config::Config;
use crate::embed::Embedder;
use crate::extract::{ExtractError, TextExtractor};
use crate::pipeline;
use crate::storage::{BackendLocal, StorageManager};
use crate::stores::{OcrStore, RecommendationStore, OCR_STORE_FILE};
use image::DynamicImage;

/// Answers with a token list chosen by image width, so one stub can serve
/// several distinct covers in a directory walk.
struct WidthKeyedExtractor;

impl TextExtractor for WidthKeyedExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<Vec<String>, ExtractError> {
        let tokens: &[&str] = match image.width() {
            10 => &["Dune"],
            20 => &["Dune", "Herbert"],
            30 => &["Cooking"],
            _ => &[],
        };
        Ok(tokens.iter().map(|s| s.to_string()).collect())
    }
}

fn write_png(path: &std::path::Path, width: u32) {
    let img = image::RgbaImage::from_pixel(width, 8, image::Rgba([200, 200, 200, 255]));
    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn config_with_covers(dir: &tempfile::TempDir) -> Config {
    let config = Config::for_tests(dir.path().to_str().unwrap());
    let images = config.images_dir();
    std::fs::create_dir_all(&images).unwrap();
    write_png(&images.join("a.jpg"), 10);
    write_png(&images.join("b.jpg"), 20);
    write_png(&images.join("c.jpg"), 30);
    write_png(&images.join("blank.png"), 40);
    config
}

#[test]
fn test_extraction_writes_loadable_ocr_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_covers(&dir);

    let report = pipeline::run_extraction(&config, &WidthKeyedExtractor).unwrap();
    assert_eq!(report.processed, 4);
    assert_eq!(report.skipped, 0);

    let backend = BackendLocal::new(config.base_path()).unwrap();
    let ocr = OcrStore::load(&backend).unwrap();
    assert_eq!(ocr.len(), 4);
    assert_eq!(ocr.tokens("a.jpg").unwrap(), ["Dune"]);
    assert_eq!(ocr.tokens("b.jpg").unwrap(), ["Dune", "Herbert"]);
    assert!(ocr.tokens("blank.png").unwrap().is_empty());
}

#[test]
fn test_rerunning_extraction_replaces_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_covers(&dir);

    pipeline::run_extraction(&config, &WidthKeyedExtractor).unwrap();

    // one cover disappears; the rerun must not leave its entry behind
    std::fs::remove_file(config.images_dir().join("c.jpg")).unwrap();
    pipeline::run_extraction(&config, &WidthKeyedExtractor).unwrap();

    let backend = BackendLocal::new(config.base_path()).unwrap();
    let ocr = OcrStore::load(&backend).unwrap();
    assert_eq!(ocr.len(), 3);
    assert!(ocr.tokens("c.jpg").is_none());
}

#[test]
#[ignore = "requires model download"]
fn test_recommendations_separate_dune_from_cooking() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path().to_str().unwrap());
    let backend = BackendLocal::new(config.base_path()).unwrap();
    backend
        .write(
            OCR_STORE_FILE,
            br#"{
                "a.jpg": ["Dune"],
                "b.jpg": ["Dune", "Herbert"],
                "c.jpg": ["Cooking"],
                "blank.png": []
            }"#,
        )
        .unwrap();

    let mut embedder = Embedder::new(&config.embedding, config.model_cache_dir()).unwrap();
    let report = pipeline::run_recommendation(&config, &mut embedder).unwrap();
    assert_eq!(report.embedded, 3);
    assert_eq!(report.skipped_empty, 1);

    let recs = RecommendationStore::load(&backend).unwrap();

    // the textless cover gets no entry at all
    assert!(recs.neighbors("blank.png").is_none());

    // near-identical token lists rank each other first
    assert_eq!(recs.neighbors("a.jpg").unwrap()[0], "b.jpg");
    assert_eq!(recs.neighbors("b.jpg").unwrap()[0], "a.jpg");

    for key in ["a.jpg", "b.jpg", "c.jpg"] {
        let neighbors = recs.neighbors(key).unwrap();
        assert!(neighbors.len() <= 2);
        assert!(!neighbors.contains(&key.to_string()));
    }
}

#[test]
#[ignore = "requires model download"]
fn test_pipeline_is_idempotent_for_a_fixed_image_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_tests(dir.path().to_str().unwrap());
    let backend = BackendLocal::new(config.base_path()).unwrap();
    backend
        .write(
            OCR_STORE_FILE,
            br#"{"a.jpg": ["Dune"], "b.jpg": ["Dune", "Herbert"], "c.jpg": ["Cooking"]}"#,
        )
        .unwrap();

    let mut embedder = Embedder::new(&config.embedding, config.model_cache_dir()).unwrap();

    pipeline::run_recommendation(&config, &mut embedder).unwrap();
    let first = RecommendationStore::load(&backend).unwrap();

    pipeline::run_recommendation(&config, &mut embedder).unwrap();
    let second = RecommendationStore::load(&backend).unwrap();

    assert_eq!(first, second);
}
