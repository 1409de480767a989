//! Chumbox classification and splitting.
//!
//! A chumbox is a cluster of syndicated "recommended content" ad units
//! sharing one DOM container. Classification tests an ad container against
//! the platform signature catalog; splitting enumerates the individual
//! sub-ads and resolves, per sub-ad, the clickable element and the ancestor
//! element worth capturing as evidence.

use std::time::Duration;

use tracing::warn;

use crate::catalog::{ChumboxSignature, CHUMBOX_PLATFORMS};
use crate::driver::{wait_visible, Driver, DriverError};

/// Outcome of testing one ad container against the signature catalog.
#[derive(Debug, Clone, Copy)]
pub enum Classification {
    Standalone,
    ChumboxRoot(&'static ChumboxSignature),
}

/// One sub-ad inside a chumbox. Click target and screenshot target may
/// differ because ad networks often wrap the visible creative in extra
/// layout containers.
#[derive(Debug, Clone)]
pub struct SubAd<E> {
    pub click_target: E,
    pub screenshot_target: E,
}

/// Result of splitting a chumbox container into sub-ads.
#[derive(Debug, Clone)]
pub struct SplitChumbox<E> {
    /// `None` when the container no longer matches any signature and is
    /// processed as a single undifferentiated ad.
    pub platform: Option<&'static str>,
    pub sub_ads: Vec<SubAd<E>>,
}

/// Test `element` against the signature catalog in priority order; the
/// first signature with at least one matching descendant wins.
pub async fn classify<D: Driver>(
    driver: &D,
    element: &D::Element,
) -> Result<Classification, DriverError> {
    for signature in CHUMBOX_PLATFORMS {
        let matches = driver.query_within(element, signature.sub_ad_selector).await?;
        if !matches.is_empty() {
            return Ok(Classification::ChumboxRoot(signature));
        }
    }
    Ok(Classification::Standalone)
}

/// Split a classified chumbox root into per-sub-ad handles.
///
/// Each sub-ad gets an independent bounded visibility wait; one detached or
/// never-visible sub-ad is skipped and logged without aborting the others.
/// A container whose signature no longer matches anything at split time
/// falls back to a single `{root, root}` handle with no platform tag. A
/// container whose sub-ads all fail their visibility wait yields an empty
/// handle list, so the caller records nothing for it.
pub async fn split<D: Driver>(
    driver: &D,
    root: &D::Element,
    visibility_timeout: Duration,
) -> Result<SplitChumbox<D::Element>, DriverError> {
    wait_visible(driver, root, visibility_timeout).await?;

    for signature in CHUMBOX_PLATFORMS {
        let found = driver.query_within(root, signature.sub_ad_selector).await?;
        if found.is_empty() {
            continue;
        }

        let mut sub_ads = Vec::with_capacity(found.len());
        for sub_ad in found {
            match prepare_sub_ad(driver, sub_ad, signature, visibility_timeout).await {
                Ok(handle) => sub_ads.push(handle),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(platform = signature.platform, error = %e, "sub-ad skipped");
                }
            }
        }
        return Ok(SplitChumbox {
            platform: Some(signature.platform),
            sub_ads,
        });
    }

    // The signature matched at classification time but the container has
    // since changed; treat the whole element as one ad.
    Ok(SplitChumbox {
        platform: None,
        sub_ads: vec![SubAd {
            click_target: root.clone(),
            screenshot_target: root.clone(),
        }],
    })
}

/// Wait for one sub-ad and resolve its screenshot ancestor.
async fn prepare_sub_ad<D: Driver>(
    driver: &D,
    sub_ad: D::Element,
    signature: &ChumboxSignature,
    visibility_timeout: Duration,
) -> Result<SubAd<D::Element>, DriverError> {
    wait_visible(driver, &sub_ad, visibility_timeout).await?;

    let mut screenshot_target = sub_ad.clone();
    for _ in 0..signature.screenshot_ancestor_depth {
        screenshot_target = driver.parent(&screenshot_target).await?;
    }

    Ok(SubAd {
        click_target: sub_ad,
        screenshot_target,
    })
}
