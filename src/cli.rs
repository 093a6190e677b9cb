use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve the site's URL space and page data from the content source
#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Inspect sitemap and page data resolved from the headless CMS", long_about = None)]
pub struct Cli {
    /// TOML settings file; environment variables override its values
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Serve content from a JSON fixture instead of the delivery API
    #[arg(long, global = true, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Read preview (unpublished) content
    #[arg(long, global = true)]
    pub preview: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every routable path and the item rendering it
    Sitemap,
    /// Print the assembled data for one page
    Page {
        /// Path segments, e.g. `blog my-post`; none for the root page
        segments: Vec<String>,
    },
    /// Print the site configuration item
    Config,
}
