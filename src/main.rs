mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use trellis::memory::MemorySource;
use trellis::settings::Settings;
use trellis::Site;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = Settings::load(cli.settings.as_deref())?;
    let site = match &cli.fixture {
        Some(path) => Site::new(Arc::new(MemorySource::from_file(path)?), settings.site.clone()),
        None => Site::from_settings(&settings)?,
    };

    match cli.command {
        Commands::Sitemap => {
            let paths = site.get_sitemap_paths(cli.preview).await?;
            print_json(&paths)?;
        }
        Commands::Page { segments } => {
            match site.get_page_data(segments.as_slice(), cli.preview).await? {
                Some(page) => print_json(&page)?,
                None => {
                    eprintln!("No page at /{}", segments.join("/"));
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Config => {
            let config = site.load_config(cli.preview).await?;
            print_json(&config)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{json}");
    Ok(())
}
