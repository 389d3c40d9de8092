//! Search → fan-out → collect.
//!
//! The search page is fetched once, then every compound link gets its own
//! detail task. Tasks run behind a semaphore and report back over a channel;
//! the receive loop owns the result set and the completion counter.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::HarvestConfig;
use crate::error::{DetailError, HarvestError};
use crate::fetcher::PageFetcher;
use crate::parser::{extract_compound, extract_search_results, SearchResults};
use crate::record::{CompoundLink, CompoundRecord, OrganismIndex, ResultSet, SearchRequest};

/// Receives completion counts while a run is in flight.
///
/// Any `Fn(usize) + Send + Sync` closure is a valid sink.
pub trait Progress: Send + Sync {
    /// Number of detail fetches about to start.
    fn begin(&self, _total: usize) {}

    /// Called once per finished task with a strictly increasing count.
    fn advance(&self, completed: usize);
}

impl<F> Progress for F
where
    F: Fn(usize) + Send + Sync,
{
    fn advance(&self, completed: usize) {
        self(completed)
    }
}

pub struct Harvester<F> {
    fetcher: Arc<F>,
    config: Arc<HarvestConfig>,
}

impl<F> Harvester<F>
where
    F: PageFetcher + 'static,
{
    pub fn new(fetcher: F, config: HarvestConfig) -> Result<Self, HarvestError> {
        config.validate()?;
        Ok(Self {
            fetcher: Arc::new(fetcher),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn search_url(&self, request: &SearchRequest) -> Result<String, HarvestError> {
        let endpoint = format!("{}/result.php", self.config.base());
        reqwest::Url::parse_with_params(
            &endpoint,
            &[
                ("sname", request.category.as_str()),
                ("word", request.keyword.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| HarvestError::InvalidUrl {
            url: endpoint,
            reason: e.to_string(),
        })
    }

    pub fn detail_url(&self, link: &CompoundLink) -> String {
        format!(
            "{}/{}",
            self.config.base(),
            link.as_str().trim_start_matches('/')
        )
    }

    /// Fetches the result page only. A failure here is fatal for the run.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, HarvestError> {
        let url = self.search_url(request)?;
        info!("Searching {} {:?}: {}", request.category, request.keyword, url);

        let document = self.fetcher.fetch(&url).await.map_err(HarvestError::Search)?;
        let results = extract_search_results(&document, request.category);

        info!("Compounds found: {}", results.detail_links().len());
        if let Some(index) = &results.organism_index {
            debug!("Organism index holds {} CAS entries", index.len());
        }
        Ok(results)
    }

    /// Runs the whole pipeline for `request`.
    ///
    /// Detail pages that keep failing are dropped and counted in
    /// `ResultSet::failed`; only a failed search aborts the run.
    pub async fn run(
        &self,
        request: &SearchRequest,
        progress: Option<Arc<dyn Progress>>,
    ) -> Result<ResultSet, HarvestError> {
        let results = self.search(request).await?;
        if !results.has_results() {
            info!("No results were found for {:?}", request.keyword);
            return Ok(ResultSet::no_results(request.category));
        }

        let urls: Vec<String> = results
            .detail_links()
            .iter()
            .map(|link| self.detail_url(link))
            .collect();
        let index = results.organism_index.map(Arc::new);
        let total = urls.len();

        if let Some(p) = &progress {
            p.begin(total);
        }

        let mut tally = Tally {
            set: ResultSet {
                category: Some(request.category),
                records: Vec::with_capacity(total),
                scheduled: total,
                failed: 0,
            },
            completed: 0,
            progress,
        };

        if self.config.concurrency == 1 {
            for url in &urls {
                let outcome =
                    fetch_compound(self.fetcher.as_ref(), &self.config, url, index.as_deref()).await;
                tally.record(outcome);
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
            let (tx, mut rx) = mpsc::channel::<Option<CompoundRecord>>(self.config.concurrency * 2);

            for url in urls {
                let fetcher = Arc::clone(&self.fetcher);
                let config = Arc::clone(&self.config);
                let index = index.clone();
                let sem = Arc::clone(&semaphore);
                let tx = tx.clone();

                tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return;
                    };
                    let outcome =
                        fetch_compound(fetcher.as_ref(), &config, &url, index.as_deref()).await;
                    let _ = tx.send(outcome).await;
                });
            }

            // rx closes once every task has dropped its sender
            drop(tx);

            while let Some(outcome) = rx.recv().await {
                tally.record(outcome);
            }
        }

        let set = tally.set;
        info!(
            "Retrieved {} of {} compounds ({} failed)",
            set.len(),
            set.scheduled,
            set.failed
        );
        Ok(set)
    }
}

struct Tally {
    set: ResultSet,
    completed: usize,
    progress: Option<Arc<dyn Progress>>,
}

impl Tally {
    fn record(&mut self, outcome: Option<CompoundRecord>) {
        match outcome {
            Some(record) => self.set.records.push(record),
            None => self.set.failed += 1,
        }
        self.completed += 1;
        if let Some(p) = &self.progress {
            p.advance(self.completed);
        }
    }
}

/// One detail task: retry, then join with the organism index if present.
async fn fetch_compound<F>(
    fetcher: &F,
    config: &HarvestConfig,
    url: &str,
    index: Option<&OrganismIndex>,
) -> Option<CompoundRecord>
where
    F: PageFetcher + ?Sized,
{
    match fetch_with_retry(fetcher, config, url).await {
        Ok(record) => Some(match index {
            Some(index) => record.with_organism(index),
            None => record,
        }),
        Err(e) => {
            warn!(
                "Dropping {} after {} attempts: {}",
                url, config.max_attempts, e
            );
            None
        }
    }
}

pub(crate) async fn fetch_with_retry<F>(
    fetcher: &F,
    config: &HarvestConfig,
    url: &str,
) -> Result<CompoundRecord, DetailError>
where
    F: PageFetcher + ?Sized,
{
    let mut attempt = 1;
    loop {
        match fetch_once(fetcher, url).await {
            Ok(record) => {
                let jitter = config.jitter_delay();
                if !jitter.is_zero() {
                    sleep(jitter).await;
                }
                return Ok(record);
            }
            Err(e) if attempt < config.max_attempts => {
                let backoff = config.backoff(attempt);
                warn!(
                    "{} (attempt {}/{}), backing off {:.1}s",
                    e,
                    attempt,
                    config.max_attempts,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_once<F>(fetcher: &F, url: &str) -> Result<CompoundRecord, DetailError>
where
    F: PageFetcher + ?Sized,
{
    debug!("Fetching {}", url);
    let document = fetcher.fetch(url).await?;
    Ok(extract_compound(&document)?)
}
