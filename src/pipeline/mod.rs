//! Pipeline orchestrator: ties extraction → storage together.
//!
//! ## Run modes
//!
//! `scrape()`: fetch and extract one ticker, then upsert it unless this is a dry run.
//!
//! `run_batch()`: a ticker list scraped concurrently, bounded by
//!   `pipeline.concurrency`. Unknown tickers are counted and skipped; they
//!   never reach storage. Each batch is recorded in `scrape_runs`.

use crate::config::PipelineConfig;
use crate::models::{AssetKind, AssetRecord};
use crate::scraper::{Extractor, ScrapeError};
use crate::storage::{Repository, RunTotals};
use anyhow::{Context, Result, anyhow};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// One entry of a batch: which ticker, scraped as which kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeJob {
    pub ticker: String,
    pub kind: AssetKind,
}

pub struct Pipeline {
    extractor: Arc<Extractor>,
    repo: Arc<Mutex<Repository>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(extractor: Extractor, repo: Repository, config: PipelineConfig) -> Self {
        Self {
            extractor: Arc::new(extractor),
            repo: Arc::new(Mutex::new(repo)),
            config,
        }
    }

    /// Scrape one ticker. Domain failures stay downcastable to `ScrapeError`.
    pub async fn scrape(&self, kind: AssetKind, ticker: &str, persist: bool) -> Result<AssetRecord> {
        scrape_one(&self.extractor, &self.repo, kind, ticker, persist).await
    }

    pub async fn run_batch(&self, jobs: Vec<ScrapeJob>) -> Result<PipelineStats> {
        let run_id = with_repo(&self.repo, |r| r.begin_scrape_run())?;
        info!("=== Batch run {}: {} tickers ===", run_id, jobs.len());

        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let extractor = Arc::clone(&self.extractor);
            let repo = Arc::clone(&self.repo);
            let sem = Arc::clone(&sem);
            let ticker = job.ticker.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await?;
                scrape_one(&extractor, &repo, job.kind, &job.ticker, true).await
            });
            handles.push((ticker, handle));
        }

        let mut stats = PipelineStats::default();
        for (ticker, handle) in handles {
            stats.tickers_processed += 1;
            match handle.await {
                Ok(Ok(record)) => {
                    info!("{}: stored ({})", record.ticker(), record.kind());
                    stats.stored += 1;
                }
                Ok(Err(e)) if is_not_found(&e) => {
                    warn!("{}: not found, skipped", ticker);
                    stats.not_found += 1;
                }
                Ok(Err(e)) => {
                    warn!("{}: {:#}", ticker, e);
                    stats.errors += 1;
                }
                Err(e) => {
                    error!("Task panic for {}: {}", ticker, e);
                    stats.errors += 1;
                }
            }
        }

        let error_msg = (stats.errors > 0).then(|| format!("{} errors", stats.errors));
        with_repo(&self.repo, |r| {
            r.finish_scrape_run(run_id, stats.totals(), error_msg.as_deref())
        })
        .ok();

        info!(
            "=== Done: {} tickers | {} stored | {} not found | {} errors ===",
            stats.tickers_processed, stats.stored, stats.not_found, stats.errors
        );
        Ok(stats)
    }

    /// Run a closure against the shared repository.
    pub fn with_repository<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        with_repo(&self.repo, f)
    }
}

async fn scrape_one(
    extractor: &Extractor,
    repo: &Mutex<Repository>,
    kind: AssetKind,
    ticker: &str,
    persist: bool,
) -> Result<AssetRecord> {
    let record = extractor.execute(kind, ticker).await?;
    if !persist {
        return Ok(record);
    }
    with_repo(repo, |r| r.insert(&record))
        .with_context(|| format!("failed to store {}", record.ticker()))
}

fn with_repo<T>(repo: &Mutex<Repository>, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
    let guard = repo.lock().map_err(|_| anyhow!("repository lock poisoned"))?;
    f(&guard)
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ScrapeError>()
        .is_some_and(ScrapeError::is_not_found)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub tickers_processed: usize,
    pub stored: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl PipelineStats {
    fn totals(&self) -> RunTotals {
        RunTotals {
            tickers_processed: self.tickers_processed,
            assets_stored: self.stored,
            not_found: self.not_found,
        }
    }
}
