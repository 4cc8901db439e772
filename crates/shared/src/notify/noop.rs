use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use super::backend::{Notifier, ReportNotice};
use crate::error::Result;
use crate::models::RegionId;

/// Used when no mail configuration is present.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send_report(&self, notice: &ReportNotice) -> Result<()> {
        info!(
            region = %notice.region,
            new_count = notice.new_count,
            attachment = %notice.attachment.display(),
            "Notifications disabled; not sending report"
        );
        Ok(())
    }

    async fn send_no_updates(&self, region: RegionId, _date: NaiveDate) -> Result<()> {
        info!(region = %region, "Notifications disabled; not sending no-updates notice");
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}
