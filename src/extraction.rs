//! The per-visit extraction pipeline: settle the page, locate ad
//! candidates, partition them into standalone ads and chumboxes, then
//! recover destination URLs and evidence screenshots for each, emitting
//! one record per URL to the persistence sink.
//!
//! This module is the only place aware of ad ordinals, file naming and
//! persistence. Ordinals are locals of one `extract_ads` call; nothing is
//! retained across visits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::AD_CONTAINER_SELECTORS;
use crate::chumbox::{self, Classification, SubAd};
use crate::config::Settings;
use crate::driver::{Driver, DriverError};
use crate::evidence;
use crate::links;
use crate::settle;

/// Identity of one visit, passed by value through the pipeline. Replaces
/// any notion of cross-command shared state.
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub visit_id: i64,
    pub browser_id: i64,
    pub visit_url: String,
    /// Baseline visit without banner interaction.
    pub clean_run: bool,
}

/// One extracted destination URL. An ad element may yield zero, one or
/// many of these, all sharing the same ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdRecord {
    pub visit_id: i64,
    pub browser_id: i64,
    /// Zero-based position of the ad (standalone or chumbox) in this visit.
    pub ad_number_in_visit: i64,
    /// 1-based position inside the chumbox; `None` for standalone ads.
    pub sub_ad_number_in_chumbox: Option<i64>,
    pub ad_url: String,
    pub visit_url: String,
    pub chumbox_platform: Option<String>,
    pub clean_run: bool,
}

/// Persistence boundary: each record is stored independently, immediately
/// after being produced. No transactional guarantee is assumed.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn store(&self, record: &AdRecord) -> anyhow::Result<()>;
}

/// Best-effort accounting of one extraction pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionSummary {
    pub ads_processed: usize,
    pub ads_failed: usize,
    pub ads_skipped: usize,
    pub records_stored: usize,
}

/// Query the DOM for every element matching the ad-container catalog.
/// Duplicates are permitted; numbering downstream is by position, not
/// identity.
pub async fn locate_ad_candidates<D: Driver>(
    driver: &D,
) -> Result<Vec<D::Element>, DriverError> {
    let mut ads = Vec::new();
    for selector in AD_CONTAINER_SELECTORS.iter().copied() {
        match driver.query(selector).await {
            Ok(mut found) => ads.append(&mut found),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(selector, error = %e, "ad selector query failed"),
        }
    }
    Ok(ads)
}

/// Run the full extraction pipeline for one visit.
///
/// Every per-element failure is caught at the narrowest scope and degrades
/// to zero records for that element; only session-fatal driver errors
/// propagate.
pub async fn extract_ads<D, S>(
    driver: &D,
    sink: &S,
    ctx: &VisitContext,
    settings: &Settings,
) -> Result<ExtractionSummary, DriverError>
where
    D: Driver,
    S: RecordSink,
{
    settle::settle_page(driver, settings.page_settle_timeout).await?;

    let candidates = locate_ad_candidates(driver).await?;
    let dir = screenshot_dir(settings, ctx);

    let mut standalone_ads = Vec::new();
    let mut chumbox_roots = Vec::new();
    for candidate in candidates {
        match chumbox::classify(driver, &candidate).await {
            Ok(Classification::Standalone) => standalone_ads.push(candidate),
            Ok(Classification::ChumboxRoot(_)) => chumbox_roots.push(candidate),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(error = %e, "classification failed, dropping candidate"),
        }
    }
    info!(
        url = %ctx.visit_url,
        standalone = standalone_ads.len(),
        chumboxes = chumbox_roots.len(),
        "partitioned ad candidates"
    );

    let mut summary = ExtractionSummary::default();
    let mut ad_ordinal: i64 = 0;

    for ad in &standalone_ads {
        match process_standalone(driver, sink, ctx, settings, ad, ad_ordinal, &dir).await {
            Ok(Some(stored)) => {
                summary.records_stored += stored;
                summary.ads_processed += 1;
                ad_ordinal += 1;
            }
            Ok(None) => {
                debug!(ordinal = ad_ordinal, "ad failed the capture probe, skipping");
                summary.ads_skipped += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "failed to extract standalone ad");
                summary.ads_failed += 1;
            }
        }
    }

    for root in &chumbox_roots {
        let split = match chumbox::split(driver, root, settings.visibility_timeout).await {
            Ok(split) => split,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "failed to split chumbox");
                summary.ads_failed += 1;
                continue;
            }
        };

        // All records of one chumbox share one ordinal; the shared counter
        // advances exactly once, on the first successfully processed
        // sub-ad. A chumbox that fails on every sub-ad never advances it.
        let chumbox_ordinal = ad_ordinal;
        let mut sub_ad_ordinal: i64 = 1;
        let mut counted = false;

        for sub_ad in &split.sub_ads {
            match process_sub_ad(
                driver,
                sink,
                ctx,
                sub_ad,
                split.platform,
                chumbox_ordinal,
                sub_ad_ordinal,
                &dir,
            )
            .await
            {
                Ok(stored) => {
                    summary.records_stored += stored;
                    sub_ad_ordinal += 1;
                    if !counted {
                        counted = true;
                        ad_ordinal += 1;
                        summary.ads_processed += 1;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "failed to extract sub-ad from chumbox"),
            }
        }

        if !counted {
            summary.ads_failed += 1;
        }
    }

    info!(
        url = %ctx.visit_url,
        processed = summary.ads_processed,
        failed = summary.ads_failed,
        skipped = summary.ads_skipped,
        records = summary.records_stored,
        "ad extraction finished"
    );
    Ok(summary)
}

async fn process_standalone<D, S>(
    driver: &D,
    sink: &S,
    ctx: &VisitContext,
    settings: &Settings,
    ad: &D::Element,
    ordinal: i64,
    dir: &Path,
) -> Result<Option<usize>, DriverError>
where
    D: Driver,
    S: RecordSink,
{
    if settings.probe_ads && !ad_worth_capturing(driver, ad, settings.probe_wait).await? {
        return Ok(None);
    }

    let path = dir.join(format!("{}_{}.png", ctx.visit_id, ordinal));
    let urls = links::extract_links(driver, ad).await;
    evidence::capture(driver, ad, &path).await;

    let mut stored = 0;
    for ad_url in urls {
        let record = AdRecord {
            visit_id: ctx.visit_id,
            browser_id: ctx.browser_id,
            ad_number_in_visit: ordinal,
            sub_ad_number_in_chumbox: None,
            ad_url,
            visit_url: ctx.visit_url.clone(),
            chumbox_platform: None,
            clean_run: ctx.clean_run,
        };
        if store_record(sink, &record).await {
            stored += 1;
        }
    }
    Ok(Some(stored))
}

#[allow(clippy::too_many_arguments)]
async fn process_sub_ad<D, S>(
    driver: &D,
    sink: &S,
    ctx: &VisitContext,
    sub_ad: &SubAd<D::Element>,
    platform: Option<&'static str>,
    ordinal: i64,
    sub_ordinal: i64,
    dir: &Path,
) -> Result<usize, DriverError>
where
    D: Driver,
    S: RecordSink,
{
    let path = dir.join(format!("{}_{}c{}.png", ctx.visit_id, ordinal, sub_ordinal));
    let urls = links::extract_links(driver, &sub_ad.click_target).await;
    evidence::capture(driver, &sub_ad.screenshot_target, &path).await;

    let mut stored = 0;
    for ad_url in urls {
        let record = AdRecord {
            visit_id: ctx.visit_id,
            browser_id: ctx.browser_id,
            ad_number_in_visit: ordinal,
            sub_ad_number_in_chumbox: Some(sub_ordinal),
            ad_url,
            visit_url: ctx.visit_url.clone(),
            chumbox_platform: platform.map(str::to_string),
            clean_run: ctx.clean_run,
        };
        if store_record(sink, &record).await {
            stored += 1;
        }
    }
    Ok(stored)
}

/// Best-effort pre-filter: scroll the ad into view, give it a moment to
/// render, then reject anything tiny or not displayed.
async fn ad_worth_capturing<D: Driver>(
    driver: &D,
    ad: &D::Element,
    base_wait: Duration,
) -> Result<bool, DriverError> {
    driver.scroll_into_view(ad).await?;

    let jitter: f64 = {
        let mut rng = rand::thread_rng();
        use rand::Rng;
        rng.gen_range(0.0..0.25)
    };
    tokio::time::sleep(base_wait.mul_f64(1.0 - jitter)).await;

    let (width, height) = driver.size(ad).await?;
    if width < 30.0 || height < 30.0 {
        return Ok(false);
    }
    driver.is_displayed(ad).await
}

/// Sink failures are logged, not escalated; records are independent.
async fn store_record<S: RecordSink>(sink: &S, record: &AdRecord) -> bool {
    match sink.store(record).await {
        Ok(()) => true,
        Err(e) => {
            warn!(ad_url = %record.ad_url, error = %e, "failed to store ad record");
            false
        }
    }
}

/// `{data_dir}/ads_screenshots/{domain}/{browser_id}/`
fn screenshot_dir(settings: &Settings, ctx: &VisitContext) -> PathBuf {
    let domain = url::Url::parse(&ctx.visit_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    settings
        .data_dir
        .join("ads_screenshots")
        .join(domain)
        .join(ctx.browser_id.to_string())
}
