//! Search phrases, locales and the exclusion vocabulary
//!
//! Everything here is plain data so it can be reviewed and edited without
//! touching the control flow in the orchestrator.

use std::path::Path;

use crate::models::{Locale, RegionConfig, RegionId};

/// Phrases sent to the search provider, in the order they are issued
pub const SEARCH_QUERIES: &[&str] = &[
    "aircraft MRO hangar construction",
    "aircraft maintenance hangar retrofit",
    "MRO facility expansion",
    "aircraft hangar renovation",
    "aviation maintenance facility",
];

/// Words whose presence in a title or summary marks a false positive
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "museum",
    "historic",
    "vintage",
    "classic",
    "antique",
    "exhibition",
    "display",
    "showcase",
    "tourist",
    "air show",
    "airshow",
    "festival",
    "celebration",
    "memorial",
    "tribute",
    "heritage",
    "legacy",
];

/// (country, language) pairs queried for a region
pub fn locales_for(region: RegionId) -> Vec<Locale> {
    let pairs: &[(&str, &str)] = match region {
        RegionId::UkNa => &[("us", "en"), ("gb", "en"), ("ca", "en")],
        RegionId::Emea => &[("de", "en"), ("fr", "en"), ("ae", "en")],
    };

    pairs
        .iter()
        .map(|(country, language)| Locale::new(*country, *language))
        .collect()
}

pub fn region_config(region: RegionId, reports_dir: &Path) -> RegionConfig {
    RegionConfig {
        region_id: region,
        queries: SEARCH_QUERIES.iter().map(|q| q.to_string()).collect(),
        locales: locales_for(region),
        output_path: reports_dir.join(region.report_file_name()),
    }
}

/// Configuration for every region, in processing order
pub fn all_regions(reports_dir: &Path) -> Vec<RegionConfig> {
    RegionId::ALL
        .iter()
        .map(|region| region_config(*region, reports_dir))
        .collect()
}
