//! Invigilation Duty Notification Service - Library
//!
//! Backend for notifying people of exam-invigilation duties inside a
//! requested date window. It includes:
//! - The duty aggregation & notification dispatch pipeline
//! - Storage layer (SQLite, JSON config)
//! - Outbound mail transport
//! - Data models and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use models::{BulkRunOutcome, DateRange, DutyAssignment, SingleSendOutcome};
pub use services::mailer::{HttpMailGateway, MailError, MailTransport, OutboundEmail};
pub use services::pipeline::{DutyNotifier, DutyStore, SenderIdentity};
pub use storage::{AppConfig, ConfigService, Database, MailerConfig};
pub use utils::error::{AppError, AppResult};
