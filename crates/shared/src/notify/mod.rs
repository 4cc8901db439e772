//! Run summary delivery
//!
//! - [`backend`]: the [`Notifier`] trait and the notice it sends
//! - [`mailjet`]: email through the Mailjet HTTP API
//! - [`noop`]: stand-in when mail is not configured
//! - [`message`]: subject and HTML body composition

pub mod backend;
pub mod mailjet;
pub mod message;
pub mod noop;

pub use backend::{Notifier, ReportNotice};
pub use mailjet::MailjetNotifier;
pub use noop::NoopNotifier;
