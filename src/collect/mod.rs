//! Collection of monitoring data ahead of a scoring pass.
//!
//! Fetches for every (day, service) pair run concurrently and are joined
//! before the engine sees anything. Failures and timeouts turn into
//! unavailable data for that day.

mod snapshot;

pub use snapshot::*;

use crate::engine::{DayData, DaySource, DayWindow, Score, ServiceRef};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fetch error types.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("data unavailable: {0}")]
    Unavailable(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Fetches one service's data for one day.
#[async_trait]
pub trait DayFetcher: Send + Sync {
    async fn fetch(&self, window: &DayWindow, service: &ServiceRef) -> Result<DayData, FetchError>;
}

/// Maps a logical URL to the checks that monitor it.
pub trait ServiceResolver {
    fn resolve(&self, url: &str) -> Vec<ServiceRef>;
}

/// Previously persisted scores, per logical URL.
pub trait ScoreHistory {
    fn last_month_score(&self, url: &str) -> Option<Score>;
}

/// Bounds applied to a collection run.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub max_concurrent: usize,
    pub timeout: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fetched data keyed by day window and service.
#[derive(Debug, Default, Clone)]
pub struct CollectedDays {
    days: HashMap<(DayWindow, ServiceRef), DayData>,
}

impl CollectedDays {
    pub fn insert(&mut self, window: DayWindow, service: ServiceRef, data: DayData) {
        self.days.insert((window, service), data);
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of entries that hold usable data.
    pub fn available(&self) -> usize {
        self.days
            .values()
            .filter(|d| !matches!(d, DayData::Unavailable))
            .count()
    }
}

impl DaySource for CollectedDays {
    fn day(&self, services: &[ServiceRef], window: &DayWindow) -> Vec<DayData> {
        services
            .iter()
            .map(|s| {
                self.days
                    .get(&(*window, s.clone()))
                    .cloned()
                    .unwrap_or(DayData::Unavailable)
            })
            .collect()
    }
}

/// Fetch every (window, service) pair concurrently and wait for all of them.
pub async fn collect_days<F>(
    fetcher: Arc<F>,
    services: &[ServiceRef],
    windows: &[DayWindow],
    limits: FetchLimits,
) -> CollectedDays
where
    F: DayFetcher + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limits.max_concurrent.max(1)));
    let mut set = JoinSet::new();

    for window in windows {
        for service in services {
            let fetcher = fetcher.clone();
            let semaphore = semaphore.clone();
            let window = *window;
            let service = service.clone();

            set.spawn(async move {
                // Hold permit until the fetch finishes
                let _permit = semaphore.acquire_owned().await.ok();

                let data = match tokio::time::timeout(limits.timeout, fetcher.fetch(&window, &service)).await {
                    Ok(Ok(data)) => data,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "Collector: Fetch failed for {} (offset {}): {}",
                            service,
                            window.offset,
                            e
                        );
                        DayData::Unavailable
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Collector: {} for {} (offset {})",
                            FetchError::Timeout(limits.timeout),
                            service,
                            window.offset
                        );
                        DayData::Unavailable
                    }
                };

                (window, service, data)
            });
        }
    }

    let mut collected = CollectedDays::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((window, service, data)) => collected.insert(window, service, data),
            Err(e) => tracing::error!("Collector: Fetch task failed: {}", e),
        }
    }

    tracing::debug!(
        "Collector: Collected {} day entries, {} with data",
        collected.len(),
        collected.available()
    );

    collected
}
