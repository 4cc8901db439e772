use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use url::Url;

use crate::error::ScoutError;

/// One of the fixed market groupings a run is performed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    UkNa,
    Emea,
}

impl RegionId {
    pub const ALL: [RegionId; 2] = [RegionId::UkNa, RegionId::Emea];

    pub fn slug(&self) -> &'static str {
        match self {
            RegionId::UkNa => "uk_na",
            RegionId::Emea => "emea",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RegionId::UkNa => "UK & North America",
            RegionId::Emea => "EMEA (Europe, Middle East, Africa)",
        }
    }

    pub fn report_file_name(&self) -> &'static str {
        match self {
            RegionId::UkNa => "UK_NA.csv",
            RegionId::Emea => "EMEA.csv",
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RegionId {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uk_na" => Ok(RegionId::UkNa),
            "emea" => Ok(RegionId::Emea),
            other => Err(ScoutError::Configuration(format!(
                "Invalid region: {}. Use 'uk_na' or 'emea'",
                other
            ))),
        }
    }
}

/// Country/language pair used to parameterize provider calls
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    pub country: String,
    pub language: String,
}

impl Locale {
    pub fn new(country: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            language: language.into(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.country, self.language)
    }
}

/// Static per-region settings, immutable for the life of the process
#[derive(Debug, Clone)]
pub struct RegionConfig {
    pub region_id: RegionId,
    pub queries: Vec<String>,
    pub locales: Vec<Locale>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Backfill,
    Weekly,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Backfill => f.write_str("backfill"),
            RunMode::Weekly => f.write_str("weekly"),
        }
    }
}

/// A search result as returned by a provider, before any validation
#[derive(Debug, Clone, Default)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published: Option<NaiveDate>,
    pub language: String,
}

/// A validated article ready for filtering, dedup and storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub country_or_region: String,
    pub language: String,
    pub published_date: Option<NaiveDate>,
    pub collected_week: NaiveDate,
}

impl Article {
    /// Build an article from a provider result. Returns `None` when the
    /// result has no usable http(s) link.
    pub fn from_raw(raw: RawArticle, locale: &Locale, collected_week: NaiveDate) -> Option<Self> {
        let url = raw.url.trim();
        let parsed = Url::parse(url).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }

        let summary = raw.snippet.trim();
        let language = if raw.language.trim().is_empty() {
            locale.language.clone()
        } else {
            raw.language.trim().to_string()
        };

        Some(Self {
            title: raw.title.trim().to_string(),
            url: url.to_string(),
            summary: (!summary.is_empty()).then(|| summary.to_string()),
            country_or_region: locale.country.to_uppercase(),
            language,
            published_date: raw.published,
            collected_week,
        })
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str) -> RawArticle {
        RawArticle {
            title: "  New MRO Hangar Opens in Texas ".to_string(),
            url: url.to_string(),
            snippet: String::new(),
            published: NaiveDate::from_ymd_opt(2026, 10, 12),
            language: String::new(),
        }
    }

    #[test]
    fn test_region_round_trip_slug() {
        for region in RegionId::ALL {
            assert_eq!(region.slug().parse::<RegionId>().unwrap(), region);
        }
        assert_eq!("EMEA".parse::<RegionId>().unwrap(), RegionId::Emea);
        assert!("apac".parse::<RegionId>().is_err());
    }

    #[test]
    fn test_from_raw_fills_locale_fields() {
        let week = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let article =
            Article::from_raw(raw("https://example.com/a"), &Locale::new("us", "en"), week)
                .unwrap();

        assert_eq!(article.title, "New MRO Hangar Opens in Texas");
        assert_eq!(article.summary, None);
        assert_eq!(article.country_or_region, "US");
        assert_eq!(article.language, "en");
        assert_eq!(article.collected_week, week);
    }

    #[test]
    fn test_from_raw_rejects_missing_or_bad_url() {
        let week = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let locale = Locale::new("us", "en");
        assert!(Article::from_raw(raw(""), &locale, week).is_none());
        assert!(Article::from_raw(raw("not a url"), &locale, week).is_none());
        assert!(Article::from_raw(raw("ftp://example.com/a"), &locale, week).is_none());
    }

    #[test]
    fn test_week_start_is_monday() {
        // Sunday 18 Oct 2026 -> Monday 12 Oct 2026
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(week_start(monday), monday);
    }
}
