//! Advertisement destination-URL and evidence-screenshot extraction from
//! rendered pages, with chumbox (syndicated recommendation cluster)
//! classification and per-element failure isolation.

pub mod catalog;
pub mod chumbox;
pub mod config;
pub mod db;
pub mod driver;
pub mod evidence;
pub mod extraction;
pub mod links;
pub mod settle;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{BrowserKind, Settings};
pub use driver::{Driver, DriverError};
pub use extraction::{extract_ads, AdRecord, ExtractionSummary, RecordSink, VisitContext};
pub use webdriver::WebDriverSession;
