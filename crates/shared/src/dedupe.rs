use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::Article;

/// Identifiers of every article already stored for a region. Loaded from the
/// report file at run start; only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredHistory {
    urls: HashSet<String>,
    last_collected_week: Option<NaiveDate>,
    row_count: usize,
}

impl StoredHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one stored row
    pub fn record(&mut self, url: &str, collected_week: Option<NaiveDate>) {
        if !url.is_empty() {
            self.urls.insert(url.to_string());
        }
        if collected_week > self.last_collected_week {
            self.last_collected_week = collected_week;
        }
        self.row_count += 1;
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Latest "Week Collected" value seen, used as the weekly window start
    pub fn last_collected_week(&self) -> Option<NaiveDate> {
        self.last_collected_week
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

impl<S: Into<String>> FromIterator<S> for StoredHistory {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut history = StoredHistory::new();
        for url in iter {
            history.record(&url.into(), None);
        }
        history
    }
}

pub struct Deduplicator;

impl Deduplicator {
    /// Drop every candidate whose URL is already in `history` or appeared
    /// earlier in the batch. Survivors keep their arrival order, and the
    /// returned history includes them.
    pub fn dedupe(
        candidates: Vec<Article>,
        mut history: StoredHistory,
    ) -> (Vec<Article>, StoredHistory) {
        let mut new_articles = Vec::new();

        for article in candidates {
            if history.contains(&article.url) {
                debug!(url = %article.url, "Dropping previously seen article");
                continue;
            }
            history.record(&article.url, Some(article.collected_week));
            new_articles.push(article);
        }

        (new_articles, history)
    }
}
