use clap::Parser;

mod app;
mod catalog;
mod cli;
mod config;
mod embed;
mod extract;
mod library;
mod pipeline;
mod rank;
mod storage;
mod stores;
#[cfg(test)]
mod tests;

use app::App;
use catalog::{CatalogClient, LookupOutcome};
use config::Config;
use embed::Embedder;
use extract::TesseractExtractor;
use library::{LibraryEntry, LibraryFilter, RemoveOutcome, SaveOutcome};

/// Comma-separated tag input. Tags keep their case.
pub fn parse_tags(tags: String) -> Vec<String> {
    tags.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}

fn default_base_path() -> String {
    format!(
        "{}/.local/share/booksnap",
        homedir::my_home()
            .expect("couldnt find home dir")
            .expect("couldnt find home dir")
            .to_string_lossy()
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();

    let base_path = args.base_path.clone().unwrap_or_else(default_base_path);
    let config = Config::load_with(&base_path);

    match args.command {
        cli::Command::Pipeline {} => {
            let extractor = TesseractExtractor::new(&config.ocr);
            let mut embedder = Embedder::new(&config.embedding, config.model_cache_dir())?;
            let (extraction, ranking) = pipeline::run(&config, &extractor, &mut embedder)?;
            println!(
                "{} covers extracted ({} skipped), {} ranked ({} without text)",
                extraction.processed, extraction.skipped, ranking.embedded, ranking.skipped_empty
            );
        }

        cli::Command::Extract {} => {
            let extractor = TesseractExtractor::new(&config.ocr);
            let report = pipeline::run_extraction(&config, &extractor)?;
            println!(
                "{} covers extracted ({} skipped)",
                report.processed, report.skipped
            );
        }

        cli::Command::Recommend {} => {
            let mut embedder = Embedder::new(&config.embedding, config.model_cache_dir())?;
            let report = pipeline::run_recommendation(&config, &mut embedder)?;
            println!(
                "{} covers ranked ({} without text)",
                report.embedded, report.skipped_empty
            );
        }

        cli::Command::Show { key } => {
            let app = App::open(config)?;

            let Some(tokens) = app.tokens(&key) else {
                println!("No OCR data found for {key}");
                return Ok(());
            };

            println!("Extracted text: {}", pipeline::synthesize_document(tokens));

            let (title, author) = app.guess_title_author(&key).unwrap_or_default();
            println!("Title guess:  {title}");
            println!("Author guess: {author}");

            match app.recommendations_for(&key) {
                Some(neighbors) if !neighbors.is_empty() => {
                    println!("Similar covers:");
                    for neighbor in neighbors {
                        println!("  {neighbor}");
                    }
                }
                _ => println!("No similar covers for {key}"),
            }
        }

        cli::Command::Meta { title, author } => {
            let client = CatalogClient::new();
            match client.lookup(&title, author.as_deref())? {
                LookupOutcome::Found(volume) => {
                    println!("{}", serde_json::to_string_pretty(&volume).unwrap())
                }
                LookupOutcome::NotFound => println!("Book not found"),
            }
        }

        cli::Command::Library { action } => match action {
            cli::LibraryArgs::List {
                query,
                tag,
                min_rating,
            } => {
                let app = App::open(config)?;
                let entries = app.filter_library(&LibraryFilter {
                    query,
                    tag,
                    min_rating,
                });
                println!("{}", serde_json::to_string_pretty(&entries).unwrap());
            }

            cli::LibraryArgs::Add {
                title,
                author,
                filename,
                rating,
                tags,
            } => {
                let mut app = App::open(config)?;
                let entry = LibraryEntry {
                    title,
                    author,
                    filename,
                    rating,
                    tags: tags.map(parse_tags).unwrap_or_default(),
                };
                match app.save_entry(entry)? {
                    SaveOutcome::Saved => println!("Book saved to your library"),
                    SaveOutcome::AlreadyPresent => {
                        println!("This book is already in your library")
                    }
                }
            }

            cli::LibraryArgs::Tags {} => {
                let app = App::open(config)?;
                for tag in app.library().all_tags() {
                    println!("{tag}");
                }
            }

            cli::LibraryArgs::Remove {
                title,
                author,
                filename,
                rating,
                tags,
            } => {
                let mut app = App::open(config)?;
                let entry = LibraryEntry {
                    title,
                    author,
                    filename,
                    rating,
                    tags: tags.map(parse_tags).unwrap_or_default(),
                };
                match app.remove_entry(&entry)? {
                    RemoveOutcome::Removed => println!("Book removed from your library"),
                    RemoveOutcome::NotFound => println!("No matching book in your library"),
                }
            }
        },
    }

    Ok(())
}
