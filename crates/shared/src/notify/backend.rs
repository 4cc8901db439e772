use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::RegionId;

/// Everything a summary message needs to say about one region's run
#[derive(Debug, Clone)]
pub struct ReportNotice {
    pub region: RegionId,
    pub new_count: usize,
    /// (title, url) of each new article, in report order
    pub headlines: Vec<(String, String)>,
    pub total_rows: usize,
    pub attachment: PathBuf,
    pub date: NaiveDate,
    /// Sent by the `email` command rather than a real run
    pub is_test: bool,
}

/// Pluggable delivery channel for run summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Send the summary for a run that stored new articles.
    async fn send_report(&self, notice: &ReportNotice) -> Result<()>;

    /// Send the notice for a run that found nothing new.
    async fn send_no_updates(&self, region: RegionId, date: NaiveDate) -> Result<()>;

    /// Verify credentials without sending anything.
    async fn check(&self) -> Result<()>;
}
