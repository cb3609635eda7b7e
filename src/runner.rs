//! Orchestrates one scoring run: collect, score, report.

use crate::collect::{collect_days, CollectedDays, DayFetcher, FetchLimits, ScoreHistory, ServiceResolver};
use crate::config::ServerConfig;
use crate::engine::{is_computable, DaySource, Engine, PriorMonth, ServiceRef};
use crate::report::{write_report, UrlReport};

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

/// Score one URL from data that has already been collected.
///
/// Uses the stored month score when there is one and the day leaving the
/// window has data; otherwise every day of the month is recomputed.
pub fn score_url<S, H>(engine: &Engine, source: &S, history: &H, url: &str, services: &[ServiceRef]) -> UrlReport
where
    S: DaySource + ?Sized,
    H: ScoreHistory + ?Sized,
{
    let today = engine.compute_day_stats(source, services, 0);

    let prior = history
        .last_month_score(url)
        .filter(|s| is_computable(s.month_score))
        .map(|s| PriorMonth {
            month_score: s.month_score,
            oldest_day: engine.compute_day_stats(source, services, engine.departing_offset()),
        })
        .filter(|p| !p.oldest_day.is_empty());

    if prior.is_some() {
        tracing::debug!("Runner: Sliding month score forward for {}", url);
    }

    let month = engine.compute_month_stats(source, services, prior.as_ref());
    let score = engine.to_score(&today, &month);

    tracing::info!(
        "The current result for {} is {} and the 30 day result is {}",
        url,
        score.day_score,
        score.month_score
    );

    UrlReport {
        url: url.to_string(),
        generated_at: Utc::now(),
        today,
        month,
        score,
    }
}

/// Collect and score every URL, writing a report for each.
///
/// A failed report write is logged and does not drop the result.
pub async fn run<F>(cfg: &ServerConfig, fetcher: Arc<F>, urls: &[String], now: DateTime<Utc>) -> Vec<UrlReport>
where
    F: DayFetcher + ServiceResolver + ScoreHistory + 'static,
{
    let engine = Engine::new(cfg.scoring.clone(), now);
    let limits = FetchLimits {
        max_concurrent: cfg.max_concurrent_fetches,
        timeout: cfg.fetch_timeout,
    };

    // the departing day is only needed for the sliding update
    let windows: Vec<_> = (engine.departing_offset()..=0).map(|o| engine.window(o)).collect();

    let mut reports = Vec::with_capacity(urls.len());
    for url in urls {
        let services = fetcher.resolve(url);
        if services.is_empty() {
            tracing::warn!("Runner: No services found for {}, skipping", url);
            continue;
        }

        let collected: CollectedDays = collect_days(fetcher.clone(), &services, &windows, limits).await;
        let report = score_url(&engine, &collected, &*fetcher, url, &services);

        match write_report(Path::new(&cfg.report_dir), &report) {
            Ok(path) => tracing::info!("Saved result for {} to {}", url, path.display()),
            Err(e) => tracing::error!("Error while saving result for {}: {}", url, e),
        }

        reports.push(report);
    }

    reports
}
