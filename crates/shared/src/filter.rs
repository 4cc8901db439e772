use crate::catalog::DEFAULT_EXCLUSIONS;
use crate::models::Article;

/// Keyword filter that removes false positives (museums, air shows and the
/// like) from search results. It never scores relevance; the search phrase
/// already did that.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    exclusions: Vec<String>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUSIONS.iter().copied())
    }
}

impl ContentFilter {
    /// Build a filter from any vocabulary. Entries are lowercased; blank
    /// entries are ignored since they would match every article.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exclusions = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Self { exclusions }
    }

    pub fn accept(&self, article: &Article) -> bool {
        self.matched_keyword(&article.title, article.summary.as_deref().unwrap_or(""))
            .is_none()
    }

    /// The first exclusion keyword found in the text, if any
    pub fn matched_keyword(&self, title: &str, summary: &str) -> Option<&str> {
        let title = title.to_lowercase();
        let summary = summary.to_lowercase();

        self.exclusions
            .iter()
            .find(|word| title.contains(word.as_str()) || summary.contains(word.as_str()))
            .map(|word| word.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article(title: &str, summary: Option<&str>) -> Article {
        Article {
            title: title.to_string(),
            url: "https://example.com/a".to_string(),
            summary: summary.map(|s| s.to_string()),
            country_or_region: "US".to_string(),
            language: "en".to_string(),
            published_date: None,
            collected_week: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
        }
    }

    #[test]
    fn test_every_keyword_rejects_in_title_and_summary() {
        let filter = ContentFilter::default();
        for word in DEFAULT_EXCLUSIONS {
            let upper = word.to_uppercase();
            assert!(
                !filter.accept(&article(&format!("Hangar {} news", upper), None)),
                "title with {word} should be rejected"
            );
            assert!(
                !filter.accept(&article("Hangar news", Some(&format!("about the {word}")))),
                "summary with {word} should be rejected"
            );
        }
    }

    #[test]
    fn test_substring_match() {
        let filter = ContentFilter::default();
        // "historical" contains "historic", "displayed" contains "display"
        assert!(!filter.accept(&article("A historical hangar", None)));
        assert!(!filter.accept(&article("Jets displayed in new hangar", None)));
    }

    #[test]
    fn test_clean_articles_pass() {
        let filter = ContentFilter::default();
        assert!(filter.accept(&article("New MRO Hangar Opens in Texas", None)));
        assert!(filter.accept(&article(
            "Hangar Retrofit Planned in Ontario",
            Some("Work on the maintenance facility starts in spring")
        )));
    }

    #[test]
    fn test_empty_text_passes() {
        let filter = ContentFilter::default();
        assert!(filter.accept(&article("", None)));
        assert!(filter.accept(&article("", Some(""))));
    }

    #[test]
    fn test_custom_vocabulary_ignores_blanks() {
        let filter = ContentFilter::new(["  Drone ", "", "   "]);
        assert_eq!(filter.matched_keyword("", "drone footage"), Some("drone"));
        assert!(!filter.accept(&article("DRONE hangar", None)));
        assert!(filter.accept(&article("Museum hangar", None)));
    }

    #[test]
    fn test_matched_keyword_reports_first_hit() {
        let filter = ContentFilter::default();
        assert_eq!(
            filter.matched_keyword("Historic WWII Hangar Museum Tour", ""),
            Some("museum")
        );
        assert_eq!(filter.matched_keyword("MRO expansion", "new bays"), None);
    }
}
