//! Environment-driven settings, read once at startup (`.env` supported via
//! dotenv in `main`). All knobs default to values usable against a local
//! geckodriver.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Browser to request from the WebDriver server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Firefox,
    Chrome,
}

impl FromStr for BrowserKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserKind::Firefox),
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// WebDriver server endpoint, e.g. geckodriver on localhost:4444.
    pub webdriver_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    /// Root directory for screenshot evidence.
    pub data_dir: PathBuf,
    /// Stable identifier of this browser instance, recorded on every row.
    pub browser_id: i64,
    /// Whether this is a baseline visit without banner interaction.
    pub clean_run: bool,
    /// Total scroll-and-wait budget for page settling.
    pub page_settle_timeout: Duration,
    /// Bounded wait for element visibility (chumbox root and sub-ads).
    pub visibility_timeout: Duration,
    /// Gate standalone ads behind a scroll-into-view size/visibility probe.
    pub probe_ads: bool,
    /// Base wait applied by the probe after scrolling an ad into view.
    pub probe_wait: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            browser: BrowserKind::Firefox,
            headless: true,
            data_dir: PathBuf::from("./datadir"),
            browser_id: 0,
            clean_run: false,
            page_settle_timeout: Duration::from_secs(30),
            visibility_timeout: Duration::from_secs(10),
            probe_ads: false,
            probe_wait: Duration::from_millis(500),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let webdriver_url =
            std::env::var("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url);
        let browser = match std::env::var("BROWSER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.browser,
        };
        let headless = env_flag("HEADLESS").unwrap_or(defaults.headless);
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let browser_id = env_parse("BROWSER_ID")?.unwrap_or(defaults.browser_id);
        let clean_run = env_flag("CLEAN_RUN").unwrap_or(defaults.clean_run);
        let page_settle_timeout = env_parse("PAGE_SETTLE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.page_settle_timeout);
        let visibility_timeout = env_parse("VISIBILITY_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.visibility_timeout);
        let probe_ads = env_flag("PROBE_ADS").unwrap_or(defaults.probe_ads);
        let probe_wait = env_parse("PROBE_WAIT_MILLIS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.probe_wait);

        Ok(Settings {
            webdriver_url,
            browser,
            headless,
            data_dir,
            browser_id,
            clean_run,
            page_settle_timeout,
            visibility_timeout,
            probe_ads,
            probe_wait,
        })
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) => Ok(Some(
            v.parse().with_context(|| format!("invalid {} value", name))?,
        )),
        Err(_) => Ok(None),
    }
}
