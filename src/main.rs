use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tower::Service;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use maps_scraper::config::resolve_total;
use maps_scraper::input::{resolve_search_terms, DEFAULT_INPUT_FILE};
use maps_scraper::{ScrapeRequest, ScraperService};

#[derive(Debug, Parser)]
#[command(name = "maps-scraper")]
#[command(about = "Scrape business listings from Google Maps search results")]
struct Cli {
    /// Search term or keyword
    #[arg(short, long)]
    search: Option<String>,

    /// Total number of listings to scrape per search term
    #[arg(short, long)]
    total: Option<usize>,

    /// Enable test mode with 2 entries only
    #[arg(long)]
    test: bool,

    /// Directory for the .xlsx/.csv output
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Search terms file, one per line (used when --search is absent)
    #[arg(long, default_value = DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Log screenshots of listings that fail to extract
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error occurred: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let search_terms = resolve_search_terms(cli.search.as_deref(), &cli.input)?;
    let total = resolve_total(cli.total, cli.test);

    let request = ScrapeRequest::new(search_terms)
        .with_total(total)
        .with_output_dir(cli.output_dir)
        .with_headless(cli.headless)
        .with_debug(cli.debug);

    let summary = ScraperService::new().call(request).await?;

    for term in &summary.terms {
        match &term.export_error {
            None => info!(
                "{}: {} records ({} skipped) -> {:?}",
                term.term, term.exported, term.skipped, term.files
            ),
            Some(e) => error!("{}: export failed: {}", term.term, e),
        }
    }

    let failed = summary.failed_exports();
    if failed > 0 {
        anyhow::bail!("{} of {} exports failed", failed, summary.terms.len());
    }
    Ok(())
}
