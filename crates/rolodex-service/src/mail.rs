//! Outgoing mail.
//!
//! Delivery transport is not part of this service. The binary logs every
//! message through [`LogMailer`]; tests capture them with [`RecordingMailer`].

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use rolodex_core::config::MailConfig;

use crate::error::ServiceResult;

/// A rendered message carrying one action link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

pub trait Mailer: Send + Sync {
    fn send<'a>(
        &'a self,
        message: MailMessage,
    ) -> Pin<Box<dyn Future<Output = ServiceResult<()>> + Send + 'a>>;
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    #[must_use]
    pub fn new(config: &MailConfig) -> Self {
        Self {
            from: format!("{} <{}>", config.from_name, config.from_address),
        }
    }
}

impl Mailer for LogMailer {
    fn send<'a>(
        &'a self,
        message: MailMessage,
    ) -> Pin<Box<dyn Future<Output = ServiceResult<()>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                from = %self.from,
                to = %message.to,
                subject = %message.subject,
                "Outgoing mail (not delivered)"
            );
            // Links carry one-shot tokens.
            tracing::debug!(link = %message.link, "Outgoing mail link");
            Ok(())
        })
    }
}

/// Keeps every sent message in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the most recent message addressed to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|message| message.to == to)
            .cloned()
    }
}

impl Mailer for RecordingMailer {
    fn send<'a>(
        &'a self,
        message: MailMessage,
    ) -> Pin<Box<dyn Future<Output = ServiceResult<()>> + Send + 'a>> {
        Box::pin(async move {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message);
            Ok(())
        })
    }
}
