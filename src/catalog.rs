//! Static, process-wide catalogs driving ad discovery and chumbox
//! classification. Both are loaded once and never mutated.

use once_cell::sync::Lazy;

/// DOM signature of a known chumbox platform.
///
/// `sub_ad_selector` matches the individual recommendation units inside the
/// shared container; `screenshot_ancestor_depth` is how many parent steps to
/// walk up from a sub-ad to reach the element worth capturing as evidence
/// (0 = the sub-ad itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChumboxSignature {
    pub platform: &'static str,
    pub sub_ad_selector: &'static str,
    pub screenshot_ancestor_depth: usize,
}

/// Known chumbox platforms, in priority order. The first signature whose
/// sub-ad selector matches a descendant wins, so order here is deliberate.
pub static CHUMBOX_PLATFORMS: &[ChumboxSignature] = &[
    ChumboxSignature {
        platform: "adblade",
        sub_ad_selector: ".adblade-dyna a.description",
        screenshot_ancestor_depth: 2,
    },
    ChumboxSignature {
        platform: "contentad",
        sub_ad_selector: ".ac_container",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "feednetwork",
        sub_ad_selector: ".my6_item",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "mgid",
        sub_ad_selector: ".mgline",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "outbrain",
        sub_ad_selector: ".ob-dynamic-rec-container.ob-p",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "revcontent",
        sub_ad_selector: ".rc-item",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "taboola",
        sub_ad_selector: ".trc_spotlight_item.syndicatedItem",
        screenshot_ancestor_depth: 0,
    },
    ChumboxSignature {
        platform: "zergnet",
        sub_ad_selector: ".zergentity",
        screenshot_ancestor_depth: 0,
    },
];

/// Ad-container selectors derived from the EasyList filter rules, in the
/// order the locator queries them. Duplicates across selectors are allowed;
/// the orchestrator numbers ads by position, not identity.
pub static AD_CONTAINER_SELECTORS: Lazy<Vec<&'static str>> = Lazy::new(|| vec![
    ".ad-container",
    ".adsbygoogle",
    "[id^='google_ads_iframe']",
    "[id^='div-gpt-ad']",
    ".GoogleActiveViewElement",
    ".ad-slot",
    ".ad-banner",
    ".ad-wrapper",
    ".advertisement",
    "[data-ad-unit]",
    "[data-google-query-id]",
    "#taboola-below-article-thumbnails",
    ".trc_related_container",
    ".OUTBRAIN",
    ".ob-widget",
    ".mgbox",
    ".rc-wc",
    ".zergnet-widget",
    ".adblade-dyna",
    ".ac_adbox",
    "iframe[id^='aswift_']",
    "iframe[src*='doubleclick.net']",
    ".sponsored-content",
    ".native-ad",
]);

pub fn signature_for(platform: &str) -> Option<&'static ChumboxSignature> {
    CHUMBOX_PLATFORMS.iter().find(|s| s.platform == platform)
}
