//! Notifications sent to users outside the web UI.

pub mod email;

pub use email::{Mailer, MemoryMailer, SentEmail, SmtpMailer};
