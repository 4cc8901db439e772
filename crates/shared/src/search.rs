//! News search through SerpAPI
//!
//! The orchestrator only sees the [`SearchProvider`] trait. [`SerpApiClient`]
//! implements it for the Google News and Bing News engines, and
//! [`ArticleFetcher`] fans a region's queries out over every locale and
//! provider, turning raw results into [`Article`]s.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ScoutError};
use crate::models::{Article, Locale, RawArticle, RegionConfig, RunMode};

const SERPAPI_BASE_URL: &str = "https://serpapi.com";
/// Upper bound on Bing pages per query, to protect the search quota
const MAX_PAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub locale: Locale,
    /// Oldest publication date of interest
    pub since: Option<NaiveDate>,
    pub mode: RunMode,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawArticle>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEngine {
    GoogleNews,
    BingNews,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::GoogleNews => "google_news",
            SearchEngine::BingNews => "bing_news",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngine {
    type Err = ScoutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google_news" | "google" => Ok(SearchEngine::GoogleNews),
            "bing_news" | "bing" => Ok(SearchEngine::BingNews),
            other => Err(ScoutError::Configuration(format!(
                "Unknown search engine: {}. Use 'google_news' or 'bing_news'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleNewsResponse {
    #[serde(default)]
    news_results: Vec<GoogleNewsResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleNewsResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    date: Option<String>,
    iso_date: Option<String>,
    /// Topic clusters carry their articles here instead of a link
    #[serde(default)]
    stories: Vec<GoogleNewsResult>,
}

#[derive(Debug, Deserialize)]
struct BingNewsResponse {
    #[serde(default)]
    organic_results: Vec<BingNewsResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BingNewsResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub account_email: Option<String>,
    pub plan_name: Option<String>,
    pub total_searches_left: Option<i64>,
}

pub struct SerpApiClient {
    client: Client,
    api_key: String,
    engine: SearchEngine,
    page_size: usize,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: String, engine: SearchEngine, page_size: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; HangarScout/1.0)")
            .build()
            .map_err(|e| ScoutError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            engine,
            page_size: page_size.max(1),
            base_url: SERPAPI_BASE_URL.to_string(),
        })
    }

    /// Verify the API key against the account endpoint, which does not
    /// consume search credits.
    pub async fn check_account(&self) -> Result<AccountInfo> {
        let url = format!(
            "{}/account.json?api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        let body = self.get_text(&url).await?;

        serde_json::from_str(&body)
            .map_err(|e| ScoutError::Fetch(format!("Failed to parse SerpAPI account response: {e}")))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoutError::Fetch(format!("SerpAPI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(ScoutError::SearchApi {
                status: status.as_u16(),
                message,
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScoutError::Fetch(format!("Failed to read SerpAPI response: {e}")))
    }

    async fn search_google(&self, request: &SearchRequest) -> Result<Vec<RawArticle>> {
        let url = format!(
            "{}/search.json?engine=google_news&q={}&gl={}&hl={}&api_key={}",
            self.base_url,
            urlencoding::encode(&request.query),
            urlencoding::encode(&request.locale.country),
            urlencoding::encode(&request.locale.language),
            urlencoding::encode(&self.api_key)
        );

        let body = self.get_text(&url).await?;
        parse_google_news(&body, &request.locale.language, Local::now().naive_local())
    }

    async fn search_bing(&self, request: &SearchRequest) -> Result<Vec<RawArticle>> {
        let now = Local::now().naive_local();
        let qft = bing_qft(request.mode, request.since, now.date());

        let mut articles = Vec::new();
        let mut first = 1;
        let mut page = 0;

        loop {
            let url = format!(
                "{}/search.json?engine=bing_news&q={}&cc={}&count={}&first={}&qft={}&api_key={}",
                self.base_url,
                urlencoding::encode(&request.query),
                urlencoding::encode(&request.locale.country),
                self.page_size,
                first,
                urlencoding::encode(qft),
                urlencoding::encode(&self.api_key)
            );

            let body = self.get_text(&url).await?;
            let page_results = parse_bing_news(&body, &request.locale.language, now)?;
            let page_len = page_results.len();
            let (kept, reached_window_end) = take_within_window(page_results, request.since);

            debug!(
                query = %request.query,
                page,
                page_len,
                kept = kept.len(),
                "Bing News page"
            );
            articles.extend(kept);

            match next_bing_page(page, first, page_len, self.page_size, reached_window_end) {
                Some(next_first) => {
                    first = next_first;
                    page += 1;
                    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                }
                None => break,
            }
        }

        Ok(articles)
    }
}

/// Bing's `qft` filter. The "past week" interval only helps when the window
/// fits inside it; an older window would be silently cut short.
fn bing_qft(mode: RunMode, since: Option<NaiveDate>, today: NaiveDate) -> &'static str {
    let within_week = since.is_some_and(|since| since >= today - Duration::days(7));
    match mode {
        RunMode::Weekly if within_week => "interval=\"8\"+sortbydate=\"1\"",
        _ => "sortbydate=\"1\"",
    }
}

/// The `first` offset of the next Bing page, or `None` once paging should
/// stop: a short or empty page, a result older than the window, or the
/// page cap.
fn next_bing_page(
    page: usize,
    first: usize,
    page_len: usize,
    page_size: usize,
    reached_window_end: bool,
) -> Option<usize> {
    if reached_window_end || page_len < page_size || page + 1 >= MAX_PAGES {
        return None;
    }
    Some(first + page_size)
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    fn name(&self) -> &str {
        self.engine.as_str()
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RawArticle>> {
        match self.engine {
            SearchEngine::GoogleNews => self.search_google(request).await,
            SearchEngine::BingNews => self.search_bing(request).await,
        }
    }
}

/// SerpAPI reports "no results" through the error field; that is not a failure
fn is_empty_result_error(message: &str) -> bool {
    message.contains("hasn't returned any results")
}

fn parse_google_news(body: &str, language: &str, now: NaiveDateTime) -> Result<Vec<RawArticle>> {
    let response: GoogleNewsResponse = serde_json::from_str(body)
        .map_err(|e| ScoutError::Fetch(format!("Failed to parse Google News response: {e}")))?;

    if let Some(error) = response.error {
        if is_empty_result_error(&error) {
            return Ok(Vec::new());
        }
        return Err(ScoutError::Fetch(format!("Google News error: {error}")));
    }

    let mut articles = Vec::new();
    for result in response.news_results {
        if result.link.is_none() && !result.stories.is_empty() {
            for story in result.stories {
                articles.push(google_to_raw(story, language, now));
            }
        } else {
            articles.push(google_to_raw(result, language, now));
        }
    }

    Ok(articles)
}

fn google_to_raw(result: GoogleNewsResult, language: &str, now: NaiveDateTime) -> RawArticle {
    let published = result
        .iso_date
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.date_naive())
        .or_else(|| result.date.as_deref().and_then(|d| parse_published(d, now)));

    RawArticle {
        title: result.title.unwrap_or_default(),
        url: result.link.unwrap_or_default(),
        snippet: result.snippet.unwrap_or_default(),
        published,
        language: language.to_string(),
    }
}

fn parse_bing_news(body: &str, language: &str, now: NaiveDateTime) -> Result<Vec<RawArticle>> {
    let response: BingNewsResponse = serde_json::from_str(body)
        .map_err(|e| ScoutError::Fetch(format!("Failed to parse Bing News response: {e}")))?;

    if let Some(error) = response.error {
        if is_empty_result_error(&error) {
            return Ok(Vec::new());
        }
        return Err(ScoutError::Fetch(format!("Bing News error: {error}")));
    }

    Ok(response
        .organic_results
        .into_iter()
        .map(|result| RawArticle {
            title: result.title.unwrap_or_default(),
            url: result.link.unwrap_or_default(),
            snippet: result.snippet.unwrap_or_default(),
            published: result.date.as_deref().and_then(|d| parse_published(d, now)),
            language: language.to_string(),
        })
        .collect())
}

/// Keep results up to the first one published before `since`. Results are
/// sorted newest first, so that one marks the end of the window; the flag
/// tells the caller to stop paging.
fn take_within_window(
    results: Vec<RawArticle>,
    since: Option<NaiveDate>,
) -> (Vec<RawArticle>, bool) {
    let Some(since) = since else {
        return (results, false);
    };

    let mut kept = Vec::new();
    for article in results {
        match article.published {
            Some(published) if published < since => return (kept, true),
            _ => kept.push(article),
        }
    }
    (kept, false)
}

/// Parse a provider date string. Handles Bing's relative ages (`5m`, `3h`,
/// `2d`, `1mon`, `1y`) and the absolute formats Google News uses. Returns
/// `None` when nothing matches.
pub fn parse_published(date: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    let digits_end = date
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(date.len());
    if digits_end > 0 {
        if let Ok(amount) = date[..digits_end].parse::<i64>() {
            let unit = date[digits_end..].trim();
            let age = match unit {
                "m" | "min" | "mins" => Duration::try_minutes(amount),
                "h" => Duration::try_hours(amount),
                "d" => Duration::try_days(amount),
                "w" => Duration::try_weeks(amount),
                "mon" => amount.checked_mul(30).and_then(Duration::try_days),
                "y" => amount.checked_mul(365).and_then(Duration::try_days),
                _ => None,
            };
            if let Some(age) = age {
                return now.checked_sub_signed(age).map(|dt| dt.date());
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.date_naive());
    }

    for fmt in ["%m/%d/%Y, %I:%M %p, +0000 UTC", "%m/%d/%Y, %I:%M %p"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, fmt) {
            return Some(dt.date());
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date, fmt) {
            return Some(d);
        }
    }

    None
}

/// Counts from one region's fetch pass
#[derive(Debug, Default)]
pub struct FetchReport {
    pub articles: Vec<Article>,
    pub raw_count: usize,
    pub failed_calls: usize,
    pub invalid: usize,
    pub outside_window: usize,
}

/// Runs every query against every locale and provider of a region
pub struct ArticleFetcher {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl ArticleFetcher {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fetch everything for `region` published on or after `since`. A failed
    /// call is logged and skipped; it never aborts the pass.
    pub async fn fetch_region(
        &self,
        region: &RegionConfig,
        mode: RunMode,
        since: NaiveDate,
        collected_week: NaiveDate,
    ) -> FetchReport {
        let mut report = FetchReport::default();

        for query in &region.queries {
            for locale in &region.locales {
                let request = SearchRequest {
                    query: query.clone(),
                    locale: locale.clone(),
                    since: Some(since),
                    mode,
                };

                for provider in &self.providers {
                    info!(
                        region = %region.region_id,
                        provider = provider.name(),
                        query = %query,
                        locale = %locale,
                        "Searching"
                    );

                    let results = match provider.search(&request).await {
                        Ok(results) => results,
                        Err(e) => {
                            warn!(
                                region = %region.region_id,
                                provider = provider.name(),
                                query = %query,
                                locale = %locale,
                                error = %e,
                                "Search failed; skipping"
                            );
                            report.failed_calls += 1;
                            continue;
                        }
                    };

                    report.raw_count += results.len();
                    for raw in results {
                        if raw.published.is_some_and(|published| published < since) {
                            report.outside_window += 1;
                            continue;
                        }
                        match Article::from_raw(raw, locale, collected_week) {
                            Some(article) => report.articles.push(article),
                            None => {
                                debug!(query = %query, locale = %locale, "Dropping result without a usable link");
                                report.invalid += 1;
                            }
                        }
                    }
                }
            }
        }

        report
    }
}
