use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::catalog::DEFAULT_EXCLUSIONS;
use crate::error::{Result, ScoutError};
use crate::schedule::WeeklySchedule;
use crate::search::SearchEngine;

const DEFAULT_MAX_RESULTS: usize = 10;
const DEFAULT_BACKFILL_MONTHS: u32 = 12;
const DEFAULT_REPORTS_DIR: &str = "reports";
const DEFAULT_SENDER_NAME: &str = "Hangar Scout Reports";

/// Mailjet credentials and addressing. Only present when every required
/// variable is set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub api_secret: String,
    pub sender_email: String,
    pub sender_name: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub serpapi_key: String,
    pub engines: Vec<SearchEngine>,
    pub max_results_per_query: usize,
    pub backfill_months: u32,
    pub reports_dir: PathBuf,
    pub exclusions: Vec<String>,
    pub mail: Option<MailConfig>,
    pub notify_on_empty: bool,
    pub schedule: WeeklySchedule,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let serpapi_key = var("SERPAPI_KEY").ok_or_else(|| {
            ScoutError::Configuration(
                "SERPAPI_KEY not found.\n\n\
                To fix this, create ~/.config/hangar-scout/.env with:\n  \
                SERPAPI_KEY=your_key_here\n\n\
                Get your SerpAPI key from: https://serpapi.com/manage-api-key"
                    .to_string(),
            )
        })?;

        let engines = match var("SEARCH_ENGINES") {
            Some(list) => parse_engines(&list)?,
            None => vec![SearchEngine::GoogleNews, SearchEngine::BingNews],
        };

        let max_results_per_query =
            parse_number("MAX_RESULTS_PER_QUERY", var("MAX_RESULTS_PER_QUERY"), DEFAULT_MAX_RESULTS)?;
        if max_results_per_query == 0 {
            return Err(ScoutError::Configuration(
                "MAX_RESULTS_PER_QUERY must be at least 1".to_string(),
            ));
        }
        let backfill_months =
            parse_number("BACKFILL_MONTHS", var("BACKFILL_MONTHS"), DEFAULT_BACKFILL_MONTHS)?;

        let reports_dir = PathBuf::from(
            var("REPORTS_DIR").unwrap_or_else(|| DEFAULT_REPORTS_DIR.to_string()),
        );

        let exclusions = match var("EXCLUDE_KEYWORDS") {
            Some(list) => split_list(&list),
            None => DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        };

        let mail = match (
            var("MJ_APIKEY_PUBLIC"),
            var("MJ_APIKEY_PRIVATE"),
            var("SENDER_EMAIL"),
            var("RECIPIENT_EMAILS").map(|r| split_list(&r)),
        ) {
            (Some(api_key), Some(api_secret), Some(sender_email), Some(recipients))
                if !recipients.is_empty() =>
            {
                Some(MailConfig {
                    api_key,
                    api_secret,
                    sender_email,
                    sender_name: var("SENDER_NAME")
                        .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
                    recipients,
                })
            }
            _ => None,
        };

        let notify_on_empty = match var("NOTIFY_ON_EMPTY") {
            Some(value) => parse_bool("NOTIFY_ON_EMPTY", &value)?,
            None => false,
        };

        let schedule = WeeklySchedule::parse(
            &var("SCHEDULE_DAY").unwrap_or_else(|| "monday".to_string()),
            &var("SCHEDULE_TIME").unwrap_or_else(|| "08:00".to_string()),
        )?;

        Ok(Self {
            serpapi_key,
            engines,
            max_results_per_query,
            backfill_months,
            reports_dir,
            exclusions,
            mail,
            notify_on_empty,
            schedule,
        })
    }

    /// Log every setting except secrets
    pub fn log_redacted(&self) {
        let engines: Vec<&str> = self.engines.iter().map(|e| e.as_str()).collect();
        info!(
            engines = ?engines,
            max_results_per_query = self.max_results_per_query,
            backfill_months = self.backfill_months,
            reports_dir = %self.reports_dir.display(),
            exclusions = self.exclusions.len(),
            notify_on_empty = self.notify_on_empty,
            schedule = %self.schedule,
            "Configuration loaded"
        );
        match &self.mail {
            Some(mail) => info!(
                sender = %mail.sender_email,
                recipients = mail.recipients.len(),
                "Email notifications enabled"
            ),
            None => info!("Email notifications disabled (Mailjet settings incomplete)"),
        }
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/hangar-scout/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("hangar-scout").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() && dotenvy::from_path(&home_path).is_ok() {
                return;
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_engines(value: &str) -> Result<Vec<SearchEngine>> {
    let mut engines = Vec::new();
    for name in split_list(value) {
        let engine: SearchEngine = name.parse()?;
        if !engines.contains(&engine) {
            engines.push(engine);
        }
    }
    if engines.is_empty() {
        return Err(ScoutError::Configuration(
            "SEARCH_ENGINES names no engine".to_string(),
        ));
    }
    Ok(engines)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.parse().map_err(|_| {
            ScoutError::Configuration(format!("{key} must be a non-negative integer, got {raw:?}"))
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScoutError::Configuration(format!(
            "{key} must be true or false, got {value:?}"
        ))),
    }
}
