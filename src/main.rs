use std::{path::PathBuf, process, time::Duration};

use anyhow::Context;
use clap::Parser;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use server_value_scanner::{
    app::{FeedOrigin, ServerAuction},
    domain::{ListingFilter, SortMode},
    infra::{FeedClient, FeedDocument, DEFAULT_FEED_URL},
    ui::table::{render, TableOptions},
    util::version::{version_label, APP_NAME},
};

/// Rank server-auction listings by how far they undercut a fitted fair price.
#[derive(Parser)]
#[command(name = "server_value_scanner")]
#[command(version)]
struct Cli {
    /// Feed URL to download
    #[arg(long, env = "SERVER_VALUE_FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Read the feed from a local JSON file instead of downloading it
    #[arg(long, value_name = "PATH")]
    feed_file: Option<PathBuf>,

    /// How long a downloaded feed is reused, in seconds
    #[arg(long, default_value_t = 300)]
    cache_ttl_secs: u64,

    /// Always download a fresh copy of the feed
    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    ram_min: Option<u32>,
    #[arg(long)]
    ram_max: Option<u32>,
    /// Only ECC (true) or only non-ECC (false) listings
    #[arg(long)]
    ecc: Option<bool>,
    /// Minimum SSD + HDD capacity in GB
    #[arg(long)]
    storage_min: Option<f64>,
    #[arg(long)]
    storage_max: Option<f64>,
    #[arg(long)]
    ssd_min: Option<f64>,
    #[arg(long)]
    ssd_max: Option<f64>,
    #[arg(long)]
    price_min: Option<f64>,
    #[arg(long)]
    price_max: Option<f64>,

    /// value_asc, value_desc, price_asc or price_desc (default: value_desc)
    #[arg(long)]
    sort: Option<String>,

    /// Show at most N listings
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Include the description column
    #[arg(long)]
    descriptions: bool,

    /// Print records as JSON instead of a table
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn listing_filter(&self) -> ListingFilter {
        ListingFilter {
            ram_min: self.ram_min,
            ram_max: self.ram_max,
            is_ecc: self.ecc,
            storage_min: self.storage_min,
            storage_max: self.storage_max,
            ssd_min: self.ssd_min,
            ssd_max: self.ssd_max,
            price_min: self.price_min,
            price_max: self.price_max,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(error) = run(cli).await {
        eprintln!("Error: {error:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("server_value_scanner=debug,warn")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("server_value_scanner=info,warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let auction = match &cli.feed_file {
        Some(path) => {
            let document = FeedDocument::from_path(path)
                .with_context(|| format!("failed to load feed from {}", path.display()))?;
            ServerAuction::from_document(&document)?
        }
        None => {
            let mut client = FeedClient::with_url(&cli.feed_url)?
                .with_ttl(Duration::from_secs(cli.cache_ttl_secs));
            if cli.no_cache {
                client = client.with_ttl(Duration::ZERO).without_snapshot();
            }
            ServerAuction::fetch(&client)
                .await
                .with_context(|| format!("failed to load feed from {}", cli.feed_url))?
        }
    };

    let mut view = auction.data().filter(&cli.listing_filter());
    if let Some(mode) = cli.sort.as_deref() {
        view = view.sort(SortMode::parse_lenient(mode));
    }
    if let Some(limit) = cli.limit {
        view = view.limit(limit);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view.records())?);
        return Ok(());
    }

    println!(
        "{APP_NAME} {} | {} of {} listings | fit rank {} over {} rows{}",
        version_label(),
        view.len(),
        auction.data().len(),
        auction.fit().rank,
        auction.fit().fitted_rows,
        auction.origin().map(origin_label).unwrap_or_default(),
    );
    print!(
        "{}",
        render(
            &view,
            TableOptions {
                descriptions: cli.descriptions,
                index: true,
            },
        )
    );
    Ok(())
}

fn origin_label(origin: &FeedOrigin) -> String {
    let when = OffsetDateTime::from(origin.fetched_at)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown time".to_string());
    format!(" | feed {:?} at {when}", origin.status)
}
