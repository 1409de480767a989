//! Destination-link recovery for one ad element.
//!
//! Ad tags routinely bury their anchors one or more iframes deep, so the
//! extractor harvests the element's own anchors and then walks every
//! descendant frame depth-first, switching the driver context in and back
//! out at each level. Clicking is deliberately avoided; only declarative
//! `href` attributes are harvested, an accepted recall limitation.

use async_recursion::async_recursion;
use tracing::{debug, warn};

use crate::driver::Driver;

/// Collect every anchor href reachable from `ad_element`, including inside
/// nested frames. Never fails: any per-scope error degrades to "no links
/// found" for that scope.
///
/// Hard invariant: whatever happens inside the frame walk, the driver's
/// active context is the top-level document when this returns.
pub async fn extract_links<D: Driver>(driver: &D, ad_element: &D::Element) -> Vec<String> {
    let mut urls = Vec::new();

    match driver.hrefs_within(ad_element).await {
        Ok(mut hrefs) => urls.append(&mut hrefs),
        Err(e) => debug!(error = %e, "anchor harvest failed in ad container"),
    }

    match driver.frames_within(ad_element).await {
        Ok(frames) => walk_frames(driver, frames, &mut urls).await,
        Err(e) => debug!(error = %e, "iframe enumeration failed in ad container"),
    }

    // The frame walk restores its own parent contexts, but the top-level
    // switch must happen no matter how the walk went.
    if let Err(e) = driver.enter_top_frame().await {
        warn!(error = %e, "failed to restore top-level browsing context");
    }

    urls
}

/// Depth-first walk over a set of sibling frames. Each frame is entered,
/// harvested, recursed into, and left again; errors inside one frame never
/// skip the return to the parent context.
#[async_recursion]
async fn walk_frames<D: Driver>(driver: &D, frames: Vec<D::Element>, urls: &mut Vec<String>) {
    for frame in frames {
        if let Err(e) = driver.enter_frame(&frame).await {
            // Cross-origin or detached frame; nothing to recover here.
            debug!(error = %e, "could not enter frame");
            continue;
        }

        match driver.hrefs_in_frame().await {
            Ok(mut hrefs) => urls.append(&mut hrefs),
            Err(e) => debug!(error = %e, "anchor harvest failed in frame"),
        }

        match driver.frames_in_frame().await {
            Ok(nested) => walk_frames(driver, nested, urls).await,
            Err(e) => debug!(error = %e, "nested iframe enumeration failed"),
        }

        if let Err(e) = driver.enter_parent_frame().await {
            warn!(error = %e, "failed to return to parent frame");
        }
    }
}
