use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::backend::{Notifier, ReportNotice};
use super::message;
use crate::config::MailConfig;
use crate::error::{Result, ScoutError};
use crate::models::RegionId;

const MAILJET_BASE_URL: &str = "https://api.mailjet.com";

/// Sends summaries through the Mailjet v3.1 send API.
pub struct MailjetNotifier {
    client: Client,
    config: MailConfig,
    base_url: String,
}

impl MailjetNotifier {
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ScoutError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            base_url: MAILJET_BASE_URL.to_string(),
        })
    }

    fn message(&self, subject: String, html: String, attachments: Vec<Value>) -> Value {
        let to: Vec<Value> = self
            .config
            .recipients
            .iter()
            .map(|email| json!({ "Email": email }))
            .collect();

        let mut message = json!({
            "From": {
                "Email": self.config.sender_email,
                "Name": self.config.sender_name,
            },
            "To": to,
            "Subject": subject,
            "HTMLPart": html,
        });
        if !attachments.is_empty() {
            message["Attachments"] = Value::Array(attachments);
        }

        json!({ "Messages": [message] })
    }

    async fn post(&self, payload: Value) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/v3.1/send", self.base_url))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScoutError::Notification(format!("Mailjet request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mailjet returned non-success");
            return Err(ScoutError::Notification(format!(
                "Mailjet returned {status}: {body}"
            )));
        }

        Ok(())
    }
}

fn attachment(notice: &ReportNotice) -> Result<Value> {
    let bytes = std::fs::read(&notice.attachment).map_err(|e| {
        ScoutError::Notification(format!(
            "Attachment {} unreadable: {e}",
            notice.attachment.display()
        ))
    })?;

    let filename = notice
        .attachment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| notice.region.report_file_name().to_string());

    Ok(json!({
        "ContentType": "text/csv",
        "Filename": filename,
        "Base64Content": STANDARD.encode(bytes),
    }))
}

#[async_trait]
impl Notifier for MailjetNotifier {
    fn name(&self) -> &str {
        "mailjet"
    }

    async fn send_report(&self, notice: &ReportNotice) -> Result<()> {
        let payload = self.message(
            message::subject(notice.region, notice.is_test),
            message::report_body(notice),
            vec![attachment(notice)?],
        );

        self.post(payload).await?;
        info!(
            region = %notice.region,
            recipients = self.config.recipients.len(),
            "Report email sent"
        );
        Ok(())
    }

    async fn send_no_updates(&self, region: RegionId, date: NaiveDate) -> Result<()> {
        let payload = self.message(
            message::subject(region, false),
            message::no_updates_body(region, date),
            Vec::new(),
        );

        self.post(payload).await?;
        info!(region = %region, "No-updates email sent");
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        let resp = self
            .client
            .get(format!("{}/v3/REST/user", self.base_url))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await
            .map_err(|e| ScoutError::Notification(format!("Mailjet request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(ScoutError::Notification(format!(
                "Mailjet credentials rejected ({})",
                resp.status()
            )));
        }
        Ok(())
    }
}
