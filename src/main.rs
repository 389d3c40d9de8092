use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use knapsack_scraper::config::{BACKOFF_BASE, BASE_URL, CONCURRENCY, MAX_ATTEMPTS, REQUEST_TIMEOUT_SECS};
use knapsack_scraper::export::{self, Format};
use knapsack_scraper::{
    Category, HarvestConfig, Harvester, HttpFetcher, Progress, SearchRequest, SortKey,
};

#[derive(Parser)]
#[command(
    name = "knapsack_scraper",
    version,
    about = "Search the KNApSAcK database by metabolite or organism"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, fetch every compound page, and write the table to disk
    Search {
        #[command(flatten)]
        query: Query,
        /// Output file (default: results_KNApSAcK_<type>_<keyword>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Row order of the written table
        #[arg(long, value_enum, default_value_t = SortKey::Completion)]
        sort: SortKey,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Only report how many compounds the search page lists
    Count {
        #[command(flatten)]
        query: Query,
        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args)]
struct Query {
    /// Type of search
    #[arg(value_enum)]
    category: Category,
    /// Term to search for (e.g. "flavones", "Bacillus")
    #[arg(short, long)]
    keyword: String,
}

#[derive(Args)]
struct Tuning {
    #[arg(long, default_value = BASE_URL)]
    base_url: String,
    /// Simultaneous detail requests (1 = sequential)
    #[arg(short, long, default_value_t = CONCURRENCY)]
    workers: usize,
    /// Attempts per compound page before it is dropped
    #[arg(long, default_value_t = MAX_ATTEMPTS)]
    attempts: u32,
    /// Retry n waits backoff_base^n seconds
    #[arg(long, default_value_t = BACKOFF_BASE)]
    backoff_base: u64,
    /// Skip the 1-3 s pause after each successful page
    #[arg(long)]
    no_jitter: bool,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = REQUEST_TIMEOUT_SECS)]
    timeout: u64,
}

impl Tuning {
    fn config(&self) -> HarvestConfig {
        let defaults = HarvestConfig::default();
        HarvestConfig {
            base_url: self.base_url.clone(),
            concurrency: self.workers,
            max_attempts: self.attempts,
            backoff_base: self.backoff_base,
            jitter: if self.no_jitter { None } else { defaults.jitter.clone() },
            request_timeout: Duration::from_secs(self.timeout),
            ..defaults
        }
    }
}

/// Drives an indicatif bar from harvest progress.
struct BarProgress(ProgressBar);

impl Progress for BarProgress {
    fn begin(&self, total: usize) {
        self.0.set_length(total as u64);
    }

    fn advance(&self, completed: usize) {
        self.0.set_position(completed as u64);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Search { query, output, format, sort, tuning } => {
            let harvester = build_harvester(&tuning)?;
            let request = SearchRequest::new(query.category, query.keyword);

            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("Compounds [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                    .progress_chars("=> "),
            );
            let progress: Arc<dyn Progress> = Arc::new(BarProgress(pb.clone()));

            let mut results = harvester.run(&request, Some(progress)).await?;
            pb.finish_and_clear();

            if results.is_no_results() {
                println!("No results were found!");
                return Ok(());
            }

            println!("Successful search!");
            println!("Number of compounds found: {}", results.scheduled);
            if results.failed > 0 {
                println!("Dropped {} compounds after repeated failures.", results.failed);
            }

            results.sort_by(sort);
            let path = output
                .unwrap_or_else(|| export::default_filename(request.category, &request.keyword, format));
            export::save(&path, &results, format)
                .with_context(|| format!("Failed to save results to {}", path.display()))?;
            println!("Saved {} compounds to {}", results.len(), path.display());
            Ok(())
        }
        Commands::Count { query, tuning } => {
            let harvester = build_harvester(&tuning)?;
            let request = SearchRequest::new(query.category, query.keyword);
            let found = harvester.search(&request).await?;
            if found.has_results() {
                println!("Number of compounds found: {}", found.detail_links().len());
            } else {
                println!("No results were found!");
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_harvester(tuning: &Tuning) -> anyhow::Result<Harvester<HttpFetcher>> {
    let config = tuning.config();
    let fetcher = HttpFetcher::new(&config).context("Failed to create HTTP client")?;
    Ok(Harvester::new(fetcher, config)?)
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
