//! One collection run per region: fetch, filter, dedupe, store, notify.

use std::io;
use std::path::PathBuf;

use chrono::{Duration, Local, Months, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::dedupe::Deduplicator;
use crate::error::{Result, ScoutError};
use crate::filter::ContentFilter;
use crate::models::{week_start, Article, RegionConfig, RegionId, RunMode};
use crate::notify::{Notifier, ReportNotice};
use crate::report::ReportStore;
use crate::search::ArticleFetcher;

/// What one region's run did
#[derive(Debug, Clone)]
pub struct RegionRunSummary {
    pub region: RegionId,
    pub mode: RunMode,
    pub window_start: NaiveDate,
    pub collected_week: NaiveDate,
    pub fetched: usize,
    pub failed_calls: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub new_articles: usize,
    pub total_rows: usize,
    /// Set when rows were appended
    pub report_path: Option<PathBuf>,
    pub notified: bool,
}

pub struct RunOrchestrator {
    fetcher: ArticleFetcher,
    filter: ContentFilter,
    notifier: Box<dyn Notifier>,
    regions: Vec<RegionConfig>,
    backfill_months: u32,
    notify_on_empty: bool,
}

impl RunOrchestrator {
    pub fn new(
        fetcher: ArticleFetcher,
        filter: ContentFilter,
        notifier: Box<dyn Notifier>,
        regions: Vec<RegionConfig>,
    ) -> Self {
        Self {
            fetcher,
            filter,
            notifier,
            regions,
            backfill_months: 12,
            notify_on_empty: false,
        }
    }

    pub fn with_backfill_months(mut self, months: u32) -> Self {
        self.backfill_months = months;
        self
    }

    pub fn with_notify_on_empty(mut self, notify_on_empty: bool) -> Self {
        self.notify_on_empty = notify_on_empty;
        self
    }

    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    pub fn fetcher(&self) -> &ArticleFetcher {
        &self.fetcher
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub async fn run(&self, mode: RunMode, region: RegionId) -> Result<RegionRunSummary> {
        self.run_at(mode, region, Local::now().date_naive()).await
    }

    pub async fn run_all(&self, mode: RunMode) -> Vec<(RegionId, Result<RegionRunSummary>)> {
        self.run_all_at(mode, Local::now().date_naive()).await
    }

    /// Run every configured region in order. A failed region is logged and
    /// the next one still runs.
    pub async fn run_all_at(
        &self,
        mode: RunMode,
        today: NaiveDate,
    ) -> Vec<(RegionId, Result<RegionRunSummary>)> {
        let mut results = Vec::with_capacity(self.regions.len());

        for region in &self.regions {
            let result = self.run_region(mode, region, today).await;
            if let Err(e) = &result {
                error!(
                    region = %region.region_id,
                    mode = %mode,
                    kind = ?e.kind(),
                    error = %e,
                    "Region run failed"
                );
            }
            results.push((region.region_id, result));
        }

        results
    }

    pub async fn run_at(
        &self,
        mode: RunMode,
        region: RegionId,
        today: NaiveDate,
    ) -> Result<RegionRunSummary> {
        let config = self.region_config(region)?;
        self.run_region(mode, config, today).await
    }

    /// Mail the region's current report without collecting anything
    pub async fn send_test_report(&self, region: RegionId, today: NaiveDate) -> Result<PathBuf> {
        let config = self.region_config(region)?;
        let info = ReportStore::file_info(config)?;
        if !info.exists {
            return Err(ScoutError::storage(
                info.path,
                io::Error::new(io::ErrorKind::NotFound, "no report has been written yet"),
            ));
        }

        let notice = ReportNotice {
            region,
            new_count: 0,
            headlines: Vec::new(),
            total_rows: info.row_count,
            attachment: info.path.clone(),
            date: today,
            is_test: true,
        };
        self.notifier.send_report(&notice).await?;

        Ok(info.path)
    }

    fn region_config(&self, region: RegionId) -> Result<&RegionConfig> {
        self.regions
            .iter()
            .find(|r| r.region_id == region)
            .ok_or_else(|| ScoutError::Configuration(format!("Region {region} is not configured")))
    }

    fn window_start(&self, mode: RunMode, last_collected: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
        match mode {
            RunMode::Backfill => today
                .checked_sub_months(Months::new(self.backfill_months))
                .unwrap_or(NaiveDate::MIN),
            RunMode::Weekly => last_collected.unwrap_or(today - Duration::days(7)),
        }
    }

    async fn run_region(
        &self,
        mode: RunMode,
        region: &RegionConfig,
        today: NaiveDate,
    ) -> Result<RegionRunSummary> {
        let region_id = region.region_id;
        let history = ReportStore::load_history(region)?;

        let window_start = self.window_start(mode, history.last_collected_week(), today);
        let collected_week = week_start(today);
        info!(
            region = %region_id,
            mode = %mode,
            since = %window_start,
            stored = history.len(),
            "Starting region run"
        );

        let fetch = self
            .fetcher
            .fetch_region(region, mode, window_start, collected_week)
            .await;

        let fetched = fetch.articles.len();
        let candidates: Vec<Article> = fetch
            .articles
            .into_iter()
            .filter(|article| {
                let keep = self.filter.accept(article);
                if !keep {
                    let keyword = self
                        .filter
                        .matched_keyword(&article.title, article.summary.as_deref().unwrap_or(""));
                    debug!(title = %article.title, keyword = ?keyword, "Excluded by keyword");
                }
                keep
            })
            .collect();
        let excluded = fetched - candidates.len();
        let candidate_count = candidates.len();

        let (new_articles, history) = Deduplicator::dedupe(candidates, history);

        let mut summary = RegionRunSummary {
            region: region_id,
            mode,
            window_start,
            collected_week,
            fetched: fetch.raw_count,
            failed_calls: fetch.failed_calls,
            excluded,
            duplicates: candidate_count - new_articles.len(),
            new_articles: new_articles.len(),
            total_rows: history.row_count(),
            report_path: None,
            notified: false,
        };

        if fetch.failed_calls > 0 {
            warn!(
                region = %region_id,
                failed_calls = fetch.failed_calls,
                "Some searches failed during this run"
            );
        }

        if new_articles.is_empty() {
            info!(region = %region_id, "No new articles found");
            if self.notify_on_empty {
                self.notifier.send_no_updates(region_id, today).await?;
                summary.notified = true;
            }
            return Ok(summary);
        }

        let path = ReportStore::append(region, &new_articles)?;
        summary.report_path = Some(path.clone());

        let notice = ReportNotice {
            region: region_id,
            new_count: new_articles.len(),
            headlines: new_articles
                .iter()
                .map(|a| (a.title.clone(), a.url.clone()))
                .collect(),
            total_rows: summary.total_rows,
            attachment: path,
            date: today,
            is_test: false,
        };
        self.notifier.send_report(&notice).await?;
        summary.notified = true;

        info!(
            region = %region_id,
            new_articles = summary.new_articles,
            excluded = summary.excluded,
            duplicates = summary.duplicates,
            total_rows = summary.total_rows,
            notifier = self.notifier.name(),
            "Region run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Locale, RawArticle};
    use crate::search::{SearchProvider, SearchRequest};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        // Sunday; its collection week starts Monday 2026-10-12
        date(2026, 10, 18)
    }

    fn raw(title: &str, slug: &str) -> RawArticle {
        RawArticle {
            title: title.to_string(),
            url: format!("https://news.example.com/{slug}"),
            snippet: String::new(),
            published: Some(date(2026, 10, 16)),
            language: "en".to_string(),
        }
    }

    fn region(id: RegionId, dir: &Path) -> RegionConfig {
        RegionConfig {
            region_id: id,
            queries: vec!["aircraft MRO hangar construction".to_string()],
            locales: vec![Locale::new("us", "en")],
            output_path: dir.join(id.report_file_name()),
        }
    }

    /// Returns the same results for every call and records the windows asked for
    struct FakeProvider {
        results: Vec<RawArticle>,
        fail: bool,
        windows: Arc<Mutex<Vec<Option<NaiveDate>>>>,
    }

    impl FakeProvider {
        fn new(results: Vec<RawArticle>) -> Self {
            Self {
                results,
                fail: false,
                windows: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(&self, request: &SearchRequest) -> Result<Vec<RawArticle>> {
            self.windows.lock().unwrap().push(request.since);
            if self.fail {
                return Err(ScoutError::Fetch("timed out".to_string()));
            }
            Ok(self.results.clone())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        reports: Arc<Mutex<Vec<ReportNotice>>>,
        empties: Arc<Mutex<Vec<RegionId>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_report(&self, notice: &ReportNotice) -> Result<()> {
            if self.fail {
                return Err(ScoutError::Notification("smtp down".to_string()));
            }
            self.reports.lock().unwrap().push(notice.clone());
            Ok(())
        }

        async fn send_no_updates(&self, region: RegionId, _date: NaiveDate) -> Result<()> {
            self.empties.lock().unwrap().push(region);
            Ok(())
        }

        async fn check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn orchestrator(
        providers: Vec<Box<dyn SearchProvider>>,
        notifier: &RecordingNotifier,
        regions: Vec<RegionConfig>,
    ) -> RunOrchestrator {
        RunOrchestrator::new(
            ArticleFetcher::new(providers),
            ContentFilter::default(),
            Box::new(notifier.clone()),
            regions,
        )
    }

    #[tokio::test]
    async fn test_end_to_end_filters_and_dedupes() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let provider = FakeProvider::new(vec![
            raw("New MRO Hangar Opens in Texas", "u1"),
            raw("Historic WWII Hangar Museum Tour", "u2"),
            raw("Hangar Retrofit Planned in Ontario", "u1"),
        ]);
        let uk = region(RegionId::UkNa, dir.path());
        let orchestrator = orchestrator(vec![Box::new(provider)], &notifier, vec![uk.clone()]);

        let summary = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.new_articles, 1);
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.collected_week, date(2026, 10, 12));
        assert!(summary.notified);

        let history = ReportStore::load_history(&uk).unwrap();
        assert_eq!(history.row_count(), 1);
        assert!(history.contains("https://news.example.com/u1"));

        let reports = notifier.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].new_count, 1);
        assert_eq!(reports[0].headlines[0].0, "New MRO Hangar Opens in Texas");
        assert_eq!(reports[0].attachment, uk.output_path);
    }

    #[tokio::test]
    async fn test_second_run_stores_nothing_new() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let provider = FakeProvider::new(vec![raw("New MRO Hangar Opens in Texas", "u1")]);
        let orchestrator = orchestrator(
            vec![Box::new(provider)],
            &notifier,
            vec![region(RegionId::UkNa, dir.path())],
        );

        orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();
        let second = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();

        assert_eq!(second.new_articles, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(second.total_rows, 1);
        assert!(second.report_path.is_none());
        assert_eq!(notifier.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_passes_means_no_rows_and_no_notification() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let provider = FakeProvider::new(vec![raw("Vintage aircraft airshow", "u9")]);
        let uk = region(RegionId::UkNa, dir.path());
        let orchestrator = orchestrator(vec![Box::new(provider)], &notifier, vec![uk.clone()]);

        let summary = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();

        assert_eq!(summary.new_articles, 0);
        assert!(!summary.notified);
        assert!(!uk.output_path.exists());
        assert!(notifier.reports.lock().unwrap().is_empty());
        assert!(notifier.empties.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notify_on_empty_sends_no_updates_notice() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let orchestrator = orchestrator(
            vec![Box::new(FakeProvider::new(Vec::new()))],
            &notifier,
            vec![region(RegionId::Emea, dir.path())],
        )
        .with_notify_on_empty(true);

        let summary = orchestrator
            .run_at(RunMode::Weekly, RegionId::Emea, today())
            .await
            .unwrap();

        assert!(summary.notified);
        assert_eq!(*notifier.empties.lock().unwrap(), vec![RegionId::Emea]);
    }

    #[tokio::test]
    async fn test_failing_provider_is_skipped() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let mut broken = FakeProvider::new(Vec::new());
        broken.fail = true;
        let working = FakeProvider::new(vec![raw("MRO facility expansion in Leeds", "u7")]);
        let orchestrator = orchestrator(
            vec![Box::new(broken), Box::new(working)],
            &notifier,
            vec![region(RegionId::UkNa, dir.path())],
        );

        let summary = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();

        assert_eq!(summary.failed_calls, 1);
        assert_eq!(summary.new_articles, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_stop_other_region() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let uk = region(RegionId::UkNa, dir.path());
        let emea = region(RegionId::Emea, dir.path());
        std::fs::write(&uk.output_path, "Something,Else\n").unwrap();

        let provider = FakeProvider::new(vec![raw("Hangar retrofit in Dubai", "u3")]);
        let orchestrator = orchestrator(vec![Box::new(provider)], &notifier, vec![uk, emea.clone()]);

        let results = orchestrator.run_all_at(RunMode::Weekly, today()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, RegionId::UkNa);
        assert_eq!(
            results[0].1.as_ref().unwrap_err().kind(),
            ErrorKind::Storage
        );
        assert_eq!(results[1].1.as_ref().unwrap().new_articles, 1);
        assert!(emea.output_path.exists());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_report() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let uk = region(RegionId::UkNa, dir.path());
        let provider = FakeProvider::new(vec![raw("Hangar construction begins", "u4")]);
        let orchestrator = orchestrator(vec![Box::new(provider)], &notifier, vec![uk.clone()]);

        let err = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Notification);
        assert!(ReportStore::load_history(&uk)
            .unwrap()
            .contains("https://news.example.com/u4"));
    }

    #[tokio::test]
    async fn test_weekly_window_starts_at_last_collected_week() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let uk = region(RegionId::UkNa, dir.path());

        let stored = Article::from_raw(
            raw("Earlier hangar story", "old"),
            &Locale::new("us", "en"),
            date(2026, 10, 5),
        )
        .unwrap();
        ReportStore::append(&uk, &[stored]).unwrap();

        let provider = FakeProvider::new(Vec::new());
        let windows = provider.windows.clone();
        let orchestrator = orchestrator(vec![Box::new(provider)], &notifier, vec![uk]);

        let summary = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();

        assert_eq!(summary.window_start, date(2026, 10, 5));
        assert_eq!(*windows.lock().unwrap(), vec![Some(date(2026, 10, 5))]);
    }

    #[tokio::test]
    async fn test_window_fallbacks() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let orchestrator = orchestrator(
            vec![Box::new(FakeProvider::new(Vec::new()))],
            &notifier,
            vec![region(RegionId::UkNa, dir.path())],
        )
        .with_backfill_months(6);

        let weekly = orchestrator
            .run_at(RunMode::Weekly, RegionId::UkNa, today())
            .await
            .unwrap();
        assert_eq!(weekly.window_start, date(2026, 10, 11));

        let backfill = orchestrator
            .run_at(RunMode::Backfill, RegionId::UkNa, today())
            .await
            .unwrap();
        assert_eq!(backfill.window_start, date(2026, 4, 18));
    }

    #[tokio::test]
    async fn test_unconfigured_region() {
        let notifier = RecordingNotifier::default();
        let orchestrator = orchestrator(Vec::new(), &notifier, Vec::new());

        let err = orchestrator
            .run_at(RunMode::Weekly, RegionId::Emea, today())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_send_test_report() {
        let dir = tempdir().unwrap();
        let notifier = RecordingNotifier::default();
        let uk = region(RegionId::UkNa, dir.path());
        let orchestrator = orchestrator(Vec::new(), &notifier, vec![uk.clone()]);

        let err = orchestrator
            .send_test_report(RegionId::UkNa, today())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        let article =
            Article::from_raw(raw("Hangar", "t1"), &Locale::new("us", "en"), today()).unwrap();
        ReportStore::append(&uk, &[article]).unwrap();

        orchestrator
            .send_test_report(RegionId::UkNa, today())
            .await
            .unwrap();

        let reports = notifier.reports.lock().unwrap();
        assert!(reports[0].is_test);
        assert_eq!(reports[0].total_rows, 1);
    }
}
