use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory (defaults to ~/.local/share/booksnap)
    #[clap(short, long)]
    pub base_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full batch: extraction, then embedding and ranking
    Pipeline {},

    /// OCR every cover image into the OCR store
    Extract {},

    /// Embed OCR'd covers and rewrite the recommendation store
    Recommend {},

    /// Show extracted text and similar covers for one image
    Show {
        /// Cover filename (the image key)
        key: String,
    },

    /// Query the book catalog for metadata
    Meta {
        /// Book title
        title: String,

        /// Author name
        #[clap(short, long)]
        author: Option<String>,
    },

    /// Manage the saved-book library
    Library {
        #[clap(subcommand)]
        action: LibraryArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibraryArgs {
    /// List saved books, optionally filtered
    List {
        /// Substring match over title or author
        #[clap(short, long)]
        query: Option<String>,

        /// Exact tag (case-sensitive)
        #[clap(short = 'g', long)]
        tag: Option<String>,

        /// Minimum rating
        #[clap(short = 'r', long)]
        min_rating: Option<u8>,
    },

    /// Save a book with a rating and tags
    Add {
        title: String,

        author: String,

        /// Cover filename the book was recognized from
        filename: String,

        #[clap(short, long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        /// Comma-separated tags
        #[clap(short = 'g', long)]
        tags: Option<String>,
    },

    /// List every tag in use
    Tags {},

    /// Remove a saved book; every field must match exactly
    Remove {
        title: String,

        author: String,

        filename: String,

        #[clap(short, long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        /// Comma-separated tags
        #[clap(short = 'g', long)]
        tags: Option<String>,
    },
}
