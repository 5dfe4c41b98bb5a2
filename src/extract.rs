//! Text extraction from cover images.
//!
//! Wraps the OCR engine behind a small trait so the batch walk and the
//! pipeline can be exercised without a tesseract install. Covers are
//! converted to grayscale before recognition.

use anyhow::Context;
use image::DynamicImage;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::OcrConfig;

/// Error type for single-image extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("ocr engine failed: {0}")]
    Engine(String),
}

/// Produces the ordered token sequence for one decoded cover image.
///
/// Token order is detection order, which is not guaranteed to match reading
/// order. An empty result is valid: it means no text was detected.
pub trait TextExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<Vec<String>, ExtractError>;
}

/// Tesseract-backed extractor driving the system `tesseract` binary.
pub struct TesseractExtractor {
    args: rusty_tesseract::Args,
}

impl TesseractExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        let defaults = rusty_tesseract::Args::default();
        Self {
            args: rusty_tesseract::Args {
                lang: config.language.clone(),
                psm: config.psm.or(defaults.psm),
                ..defaults
            },
        }
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<Vec<String>, ExtractError> {
        let gray = DynamicImage::ImageLuma8(image.to_luma8());

        let tess_image = rusty_tesseract::Image::from_dynamic_image(&gray)
            .map_err(|e| ExtractError::Engine(e.to_string()))?;
        let output = rusty_tesseract::image_to_data(&tess_image, &self.args)
            .map_err(|e| ExtractError::Engine(e.to_string()))?;

        // Word rows carry the recognized text; structural rows are blank.
        // Every detected token is kept, whatever its confidence score.
        Ok(output
            .data
            .into_iter()
            .filter(|row| !row.text.trim().is_empty())
            .map(|row| row.text)
            .collect())
    }
}

/// Counts from one extraction batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub processed: usize,
    pub skipped: usize,
}

fn is_cover_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".png")
}

/// Run the extractor over every cover image in `images_dir`.
///
/// Files are visited in sorted name order. An image that cannot be read,
/// decoded, or recognized is logged and skipped; the batch continues with
/// the rest. There is no retry.
pub fn extract_images(
    extractor: &dyn TextExtractor,
    images_dir: &Path,
) -> anyhow::Result<(BTreeMap<String, Vec<String>>, ExtractionReport)> {
    let entries = std::fs::read_dir(images_dir)
        .with_context(|| format!("couldnt read image directory {}", images_dir.display()))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .filter(|name| is_cover_image(name))
        .collect();
    names.sort();

    let mut results = BTreeMap::new();
    let mut report = ExtractionReport::default();

    let progress = ProgressBar::new(names.len() as u64);
    for name in names {
        let path = images_dir.join(&name);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("{name}: couldnt read file, skipping: {err}");
                report.skipped += 1;
                progress.inc(1);
                continue;
            }
        };

        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("{name}: couldnt decode image, skipping: {err}");
                report.skipped += 1;
                progress.inc(1);
                continue;
            }
        };

        match extractor.extract(&image) {
            Ok(tokens) => {
                log::debug!("{name}: {} tokens", tokens.len());
                results.insert(name, tokens);
                report.processed += 1;
            }
            Err(err) => {
                log::warn!("{name}: extraction failed, skipping: {err}");
                report.skipped += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok((results, report))
}
