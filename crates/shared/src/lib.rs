// Public modules
pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod schedule;
pub mod search;

// Re-export commonly used types
pub use config::{Config, MailConfig};
pub use dedupe::{Deduplicator, StoredHistory};
pub use error::{ErrorKind, Result, ScoutError};
pub use filter::ContentFilter;
pub use models::{Article, Locale, RawArticle, RegionConfig, RegionId, RunMode};
pub use notify::{MailjetNotifier, NoopNotifier, Notifier, ReportNotice};
pub use orchestrator::{RegionRunSummary, RunOrchestrator};
pub use report::{ReportFileInfo, ReportStore};
pub use schedule::WeeklySchedule;
pub use search::{ArticleFetcher, SearchEngine, SearchProvider, SearchRequest, SerpApiClient};
