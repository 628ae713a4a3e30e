use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::browser::PageSource;
use crate::cache::CacheStore;
use crate::config::{self, Settings, MAX_COMPANIES};
use crate::extract::extract_record;
use crate::models::{CompanyPreview, CompanyRecord};

/// How long in-flight page loads get to wind down once a run is cancelled.
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// How the records in a [`Snapshot`] were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a cache younger than the freshness window.
    Cached { last_updated: DateTime<Utc> },
    /// Scraped during this run.
    Refreshed {
        fetched_at: DateTime<Utc>,
        attempted: usize,
        failed: usize,
        saved: bool,
    },
    /// The listing page could not be scraped; there is nothing to show.
    Unavailable,
    /// The run was interrupted; the cache was left as it was.
    Cancelled,
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Cached { last_updated } => {
                write!(f, "cached {}", last_updated.format("%Y-%m-%d %H:%M UTC"))
            }
            Freshness::Refreshed {
                fetched_at,
                attempted,
                failed,
                saved,
            } => {
                write!(
                    f,
                    "live {} ({}/{} scraped",
                    fetched_at.format("%Y-%m-%d %H:%M UTC"),
                    attempted - failed,
                    attempted
                )?;
                if !saved {
                    write!(f, ", not cached")?;
                }
                write!(f, ")")
            }
            Freshness::Unavailable => write!(f, "listing unavailable"),
            Freshness::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub records: Vec<CompanyRecord>,
    pub freshness: Freshness,
}

impl Snapshot {
    fn empty(freshness: Freshness) -> Self {
        Self {
            records: Vec::new(),
            freshness,
        }
    }
}

/// Cache-or-scrape: serves a fresh snapshot from disk, otherwise scrapes and saves one.
pub struct Pipeline<S> {
    source: S,
    cache: CacheStore,
    workers: usize,
    force_refresh: bool,
    window: TimeDelta,
}

impl<S: PageSource> Pipeline<S> {
    pub fn new(source: S, settings: &Settings) -> Self {
        Self {
            source,
            cache: CacheStore::new(&settings.cache_path),
            workers: settings.workers(),
            force_refresh: settings.force_refresh,
            window: config::freshness_window(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Never fails: problems are logged and surface as fewer (or no) records.
    pub async fn get_records(&self, cancel: &CancellationToken) -> Snapshot {
        if !self.force_refresh {
            if let Some(snapshot) = self.cached_snapshot(Utc::now()) {
                return snapshot;
            }
        }
        self.refresh(cancel).await
    }

    fn cached_snapshot(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        match self.cache.load() {
            Ok(cache) if cache.is_fresh(now, self.window) => {
                info!(
                    count = cache.startups.len(),
                    last_updated = %cache.last_updated,
                    "using cached companies"
                );
                Some(Snapshot {
                    freshness: Freshness::Cached {
                        last_updated: cache.last_updated,
                    },
                    records: cache.startups,
                })
            }
            Ok(cache) => {
                info!(
                    age_hours = cache.age(now).num_hours(),
                    "cache is stale, refreshing"
                );
                None
            }
            Err(miss) => {
                info!(reason = %miss, "no usable cache, refreshing");
                None
            }
        }
    }

    async fn refresh(&self, cancel: &CancellationToken) -> Snapshot {
        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(),
            listing = self.source.fetch_listing() => listing,
        };

        let previews = match listing {
            Ok(previews) => previews,
            Err(e) => {
                error!(error = %e, "failed to scrape listing page");
                return Snapshot::empty(Freshness::Unavailable);
            }
        };

        let selected: Vec<CompanyPreview> = previews.into_iter().take(MAX_COMPANIES).collect();
        let attempted = selected.len();
        info!(attempted, workers = self.workers, "scraping company pages");

        let scraping = self.scrape_companies(selected, cancel);
        tokio::pin!(scraping);
        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // sources that watch the same token close their sessions here
                if tokio::time::timeout(CANCEL_GRACE, &mut scraping).await.is_err() {
                    warn!("page loads still running after cancellation, abandoning them");
                }
                return cancelled();
            }
            records = &mut scraping => records,
        };
        let failed = attempted - records.len();

        let (fetched_at, saved) = match self.cache.save(&records) {
            Ok(saved_at) => {
                info!(count = records.len(), failed, "saved companies to cache");
                (saved_at, true)
            }
            Err(e) => {
                warn!(error = %e, "failed to save cache");
                (Utc::now(), false)
            }
        };

        Snapshot {
            records,
            freshness: Freshness::Refreshed {
                fetched_at,
                attempted,
                failed,
                saved,
            },
        }
    }

    /// Scrape previews on a bounded pool. Output keeps preview order and holds only
    /// the companies that scraped successfully.
    async fn scrape_companies(
        &self,
        previews: Vec<CompanyPreview>,
        cancel: &CancellationToken,
    ) -> Vec<CompanyRecord> {
        let mut results: Vec<(usize, CompanyRecord)> = stream::iter(previews.into_iter().enumerate())
            .map(|(index, preview)| async move {
                self.scrape_company(&preview, cancel)
                    .await
                    .map(|record| (index, record))
            })
            .buffer_unordered(self.workers)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, record)| record).collect()
    }

    async fn scrape_company(
        &self,
        preview: &CompanyPreview,
        cancel: &CancellationToken,
    ) -> Option<CompanyRecord> {
        if cancel.is_cancelled() {
            return None;
        }
        match self.source.fetch_detail(&preview.slug).await {
            Ok(raw) => {
                let mut record = extract_record(&preview.slug, &raw, Utc::now());
                if record.tagline.is_empty() {
                    record.tagline = preview.tagline.clone();
                }
                Some(record)
            }
            Err(e) if cancel.is_cancelled() => {
                debug!(slug = %preview.slug, error = %e, "company scrape stopped by cancellation");
                None
            }
            Err(e) => {
                warn!(
                    slug = %preview.slug,
                    name = %preview.name,
                    error = %e,
                    "failed to scrape company, skipping"
                );
                None
            }
        }
    }
}

fn cancelled() -> Snapshot {
    warn!("refresh cancelled, cache left untouched");
    Snapshot::empty(Freshness::Cancelled)
}
