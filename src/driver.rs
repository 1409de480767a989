//! The browser-automation boundary. Everything the pipeline needs from a
//! driver session is expressed here as a trait so the extraction logic can
//! run against a live WebDriver session or an in-memory mock DOM.
//!
//! The driver owns exactly one piece of shared mutable state: the current
//! browsing context (top document or one specific frame). Callers that
//! enter a frame are responsible for leaving it again; `links` upholds this
//! by always restoring the top-level context before returning.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Error taxonomy at the driver boundary.
///
/// Everything except `Session` is recoverable at some narrower scope:
/// stale references and visibility timeouts are isolated to one element,
/// script errors degrade to empty results, screenshot errors to "no
/// evidence saved". `Session` means the browser session itself is gone and
/// must propagate out of the whole extraction pass.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("stale element reference")]
    Stale,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("driver session failure: {0}")]
    Session(String),

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// True for failures with no narrower recovery scope than the visit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Session(_))
    }
}

/// Synchronous-in-spirit, bounded-latency operations on one browsing
/// session. Element handles are opaque, valid only for the current page
/// load, and may go stale at any point.
#[async_trait]
pub trait Driver: Send + Sync {
    type Element: Clone + Send + Sync;

    // -- page geometry & readiness -----------------------------------------

    async fn viewport_height(&self) -> Result<f64, DriverError>;
    async fn scroll_height(&self) -> Result<f64, DriverError>;
    async fn scroll_to(&self, y: f64) -> Result<(), DriverError>;
    async fn scroll_into_view(&self, el: &Self::Element) -> Result<(), DriverError>;
    async fn ready_state_complete(&self) -> Result<bool, DriverError>;

    // -- element queries ----------------------------------------------------

    /// All matches for a CSS selector in the current document.
    async fn query(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;

    /// All descendant matches for a CSS selector under `scope`.
    async fn query_within(
        &self,
        scope: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>, DriverError>;

    async fn parent(&self, el: &Self::Element) -> Result<Self::Element, DriverError>;
    async fn is_displayed(&self, el: &Self::Element) -> Result<bool, DriverError>;

    /// Rendered (width, height) of an element.
    async fn size(&self, el: &Self::Element) -> Result<(f64, f64), DriverError>;

    // -- link harvesting ----------------------------------------------------

    /// Non-empty `href`s of all anchors under `scope`, excluding content of
    /// nested frames.
    async fn hrefs_within(&self, scope: &Self::Element) -> Result<Vec<String>, DriverError>;

    /// Non-empty `href`s of all anchors in the current frame's document.
    async fn hrefs_in_frame(&self) -> Result<Vec<String>, DriverError>;

    // -- frame context ------------------------------------------------------

    /// Descendant `<iframe>` elements under `scope` in the current context.
    async fn frames_within(&self, scope: &Self::Element)
        -> Result<Vec<Self::Element>, DriverError>;

    /// `<iframe>` elements anywhere in the current frame's document.
    async fn frames_in_frame(&self) -> Result<Vec<Self::Element>, DriverError>;

    async fn enter_frame(&self, frame: &Self::Element) -> Result<(), DriverError>;
    async fn enter_parent_frame(&self) -> Result<(), DriverError>;

    /// Switch back to the top-level (default) document.
    async fn enter_top_frame(&self) -> Result<(), DriverError>;

    // -- evidence -----------------------------------------------------------

    async fn screenshot_element(
        &self,
        el: &Self::Element,
        path: &Path,
    ) -> Result<(), DriverError>;
}

/// Poll an element until it is displayed or the timeout elapses.
///
/// Stale references and session failures are surfaced immediately; other
/// transient query errors are retried until the deadline.
pub async fn wait_visible<D: Driver>(
    driver: &D,
    el: &D::Element,
    timeout: Duration,
) -> Result<(), DriverError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match driver.is_displayed(el).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e @ DriverError::Stale) => return Err(e),
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(DriverError::Timeout("element visibility".to_string()));
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
