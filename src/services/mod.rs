//! Services
//!
//! Business logic for the notification pipeline and outbound mail.

pub mod mailer;
pub mod pipeline;

pub use mailer::{HttpMailGateway, MailError, MailTransport, OutboundEmail};
pub use pipeline::{DutyNotifier, DutyStore, SenderIdentity};
