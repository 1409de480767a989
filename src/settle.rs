//! Page settling: scroll the page in half-screen increments with humanized
//! pacing so lazy-loaded ad slots fire, then wait out the remaining budget
//! for the document to report ready.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::driver::{Driver, DriverError};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Scroll until the bottom of the page is reached or the time budget is
/// exhausted, then spend whatever budget remains waiting for
/// `document.readyState == "complete"`. Best-effort: a ready-wait timeout
/// is accepted as partial page readiness, and every non-fatal driver error
/// just ends the settling early.
pub async fn settle_page<D: Driver>(driver: &D, timeout: Duration) -> Result<(), DriverError> {
    let screen_height = match driver.viewport_height().await {
        Ok(h) => h,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(error = %e, "could not read viewport height, skipping page settle");
            return Ok(());
        }
    };

    let mut i = 0.5f64;
    let mut slept = Duration::ZERO;

    loop {
        if let Err(e) = driver.scroll_to(screen_height * i).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(error = %e, "scroll command failed, stopping settle loop");
            break;
        }
        i += 0.5;

        // Random pause between 0.5 and 4.0 seconds to mimic human pacing
        // and let lazy content load.
        let pause_secs: f64 = {
            let mut rng = rand::thread_rng();
            use rand::Rng;
            rng.gen_range(0.5..4.0)
        };
        let pause = Duration::from_secs_f64(pause_secs);
        tokio::time::sleep(pause).await;
        slept += pause;

        let scroll_height = match driver.scroll_height().await {
            Ok(h) => h,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "could not read scroll height, stopping settle loop");
                break;
            }
        };
        if screen_height * i > scroll_height || slept > timeout {
            break;
        }
    }
    debug!(slept_secs = slept.as_secs_f64(), "scrolled through page");

    if slept < timeout {
        let remaining = timeout - slept;
        if !wait_for_ready(driver, remaining).await? {
            info!("timed out waiting for page to load completely, continuing with what has loaded");
        }
    }
    Ok(())
}

/// Poll `document.readyState` until complete or the budget runs out.
/// Returns whether the page reported complete.
async fn wait_for_ready<D: Driver>(
    driver: &D,
    budget: Duration,
) -> Result<bool, DriverError> {
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        match driver.ready_state_complete().await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(error = %e, "readyState probe failed"),
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}
