//! Live `Driver` implementation over the WebDriver protocol (thirtyfour).
//!
//! The session is stateful: element queries, script execution and frame
//! switches all act on the current browsing context, which is why the
//! pipeline above this layer is strictly sequential.

use std::path::Path;

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;

use crate::config::{BrowserKind, Settings};
use crate::driver::{Driver, DriverError};

/// In-page script collecting the `href` of every anchor with a non-empty
/// href. Scoped to `arguments[0]` when an element is passed, otherwise to
/// the current frame's document.
const COLLECT_HREFS: &str = r#"
    var scope = arguments[0] || document;
    var links = [];
    scope.querySelectorAll('a').forEach(function (element) {
        var href = element.href;
        if (href) links.push(href);
    });
    return links;
"#;

pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    /// Connect to a running WebDriver server (geckodriver/chromedriver).
    pub async fn connect(settings: &Settings) -> Result<Self, DriverError> {
        let driver = match settings.browser {
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if settings.headless {
                    caps.set_headless().map_err(DriverError::from)?;
                }
                WebDriver::new(&settings.webdriver_url, caps).await?
            }
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if settings.headless {
                    caps.set_headless().map_err(DriverError::from)?;
                }
                WebDriver::new(&settings.webdriver_url, caps).await?
            }
        };
        Ok(Self { driver })
    }

    pub async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    pub async fn quit(self) -> Result<(), DriverError> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn eval_number(&self, script: &str) -> Result<f64, DriverError> {
        let ret = self.driver.execute(script, vec![]).await?;
        ret.json()
            .as_f64()
            .ok_or_else(|| DriverError::Script(format!("non-numeric result from {script:?}")))
    }

    async fn collect_hrefs(
        &self,
        scope: Option<&WebElement>,
    ) -> Result<Vec<String>, DriverError> {
        let args = match scope {
            Some(el) => vec![el.to_json()?],
            None => vec![],
        };
        let ret = self.driver.execute(COLLECT_HREFS, args).await?;
        serde_json::from_value(ret.json().clone())
            .map_err(|e| DriverError::Script(format!("href list decode: {e}")))
    }
}

#[async_trait]
impl Driver for WebDriverSession {
    type Element = WebElement;

    async fn viewport_height(&self) -> Result<f64, DriverError> {
        self.eval_number("return window.innerHeight;").await
    }

    async fn scroll_height(&self) -> Result<f64, DriverError> {
        self.eval_number("return document.body.scrollHeight;").await
    }

    async fn scroll_to(&self, y: f64) -> Result<(), DriverError> {
        self.driver
            .execute("window.scrollTo(0, arguments[0]);", vec![y.into()])
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&self, el: &WebElement) -> Result<(), DriverError> {
        self.driver
            .execute(
                "arguments[0].scrollIntoView({block: 'center'});",
                vec![el.to_json()?],
            )
            .await?;
        Ok(())
    }

    async fn ready_state_complete(&self) -> Result<bool, DriverError> {
        let ret = self
            .driver
            .execute("return document.readyState;", vec![])
            .await?;
        Ok(ret.json().as_str() == Some("complete"))
    }

    async fn query(&self, selector: &str) -> Result<Vec<WebElement>, DriverError> {
        Ok(self.driver.find_all(By::Css(selector)).await?)
    }

    async fn query_within(
        &self,
        scope: &WebElement,
        selector: &str,
    ) -> Result<Vec<WebElement>, DriverError> {
        Ok(scope.find_all(By::Css(selector)).await?)
    }

    async fn parent(&self, el: &WebElement) -> Result<WebElement, DriverError> {
        Ok(el.find(By::XPath("..")).await?)
    }

    async fn is_displayed(&self, el: &WebElement) -> Result<bool, DriverError> {
        Ok(el.is_displayed().await?)
    }

    async fn size(&self, el: &WebElement) -> Result<(f64, f64), DriverError> {
        let rect = el.rect().await?;
        Ok((rect.width, rect.height))
    }

    async fn hrefs_within(&self, scope: &WebElement) -> Result<Vec<String>, DriverError> {
        self.collect_hrefs(Some(scope)).await
    }

    async fn hrefs_in_frame(&self) -> Result<Vec<String>, DriverError> {
        self.collect_hrefs(None).await
    }

    async fn frames_within(&self, scope: &WebElement) -> Result<Vec<WebElement>, DriverError> {
        Ok(scope.find_all(By::Tag("iframe")).await?)
    }

    async fn frames_in_frame(&self) -> Result<Vec<WebElement>, DriverError> {
        Ok(self.driver.find_all(By::Tag("iframe")).await?)
    }

    async fn enter_frame(&self, frame: &WebElement) -> Result<(), DriverError> {
        frame.clone().enter_frame().await?;
        Ok(())
    }

    async fn enter_parent_frame(&self) -> Result<(), DriverError> {
        self.driver.enter_parent_frame().await?;
        Ok(())
    }

    async fn enter_top_frame(&self) -> Result<(), DriverError> {
        self.driver.enter_default_frame().await?;
        Ok(())
    }

    async fn screenshot_element(&self, el: &WebElement, path: &Path) -> Result<(), DriverError> {
        el.screenshot(path)
            .await
            .map_err(|e| DriverError::Screenshot(e.to_string()))
    }
}

impl From<WebDriverError> for DriverError {
    fn from(e: WebDriverError) -> Self {
        match e {
            WebDriverError::StaleElementReference(_) => DriverError::Stale,
            WebDriverError::Timeout(msg) => DriverError::Timeout(msg),
            WebDriverError::JavascriptError(info) => {
                DriverError::Script(format!("{info:?}"))
            }
            WebDriverError::ScriptTimeout(info) => DriverError::Script(format!("{info:?}")),
            WebDriverError::InvalidSessionId(info) => {
                DriverError::Session(format!("{info:?}"))
            }
            WebDriverError::SessionNotCreated(info) => {
                DriverError::Session(format!("{info:?}"))
            }
            WebDriverError::NoSuchWindow(info) => DriverError::Session(format!("{info:?}")),
            WebDriverError::FatalError(msg) => DriverError::Session(msg),
            other => DriverError::Other(other.to_string()),
        }
    }
}
