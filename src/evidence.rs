//! Evidence screenshots. Failure here is never a reason to discard URLs
//! that were already extracted for the same ad.

use std::path::Path;

use tracing::{debug, warn};

use crate::driver::Driver;

/// Screenshot `target` to `path`, creating the parent directory if needed.
/// Returns whether a file was saved; all failures degrade to `false`.
pub async fn capture<D: Driver>(driver: &D, target: &D::Element, path: &Path) -> bool {
    if let Some(dir) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "could not create screenshot directory");
            return false;
        }
    }

    match driver.screenshot_element(target, path).await {
        Ok(()) => {
            debug!(path = %path.display(), "screenshot saved");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "screenshot failed");
            false
        }
    }
}
