//! Notification dispatch — formatted messages delivered via a third-party
//! email provider.
//!
//! Ordinary delivery failures are reported in [`DispatchResult`], never as
//! `Err`: callers persist the outcome and move on. Delivery is attempted
//! exactly once; there is no retry policy.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifyConfig;

pub mod graph;
pub mod mailchimp;
pub mod templates;

pub use graph::GraphNotifier;
pub use mailchimp::MailchimpNotifier;

/// A formatted message ready for delivery.
#[derive(Debug, Clone)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pub success: bool,
    /// Provider-side reference (Mailchimp campaign id, Graph request id).
    pub provider_message_id: Option<String>,
}

impl DispatchResult {
    pub fn sent(provider_message_id: Option<String>) -> Self {
        Self {
            success: true,
            provider_message_id,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// A backend that can deliver a [`Notification`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery once. Delivery failures come back as
    /// `DispatchResult { success: false, .. }`, not as a panic or error.
    async fn send(&self, notification: &Notification) -> DispatchResult;

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

/// Notifier used when no backend is configured. Every dispatch reports
/// failure so the outcome is persisted truthfully.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, notification: &Notification) -> DispatchResult {
        tracing::warn!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "No notification backend configured; dropping message"
        );
        DispatchResult::failed()
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Pick the active backend from configuration. Mailchimp wins when both
/// backends have credentials.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if config.mailchimp_ready() {
        tracing::info!("Notification backend: mailchimp");
        Arc::new(MailchimpNotifier::new(config))
    } else if config.graph_ready() {
        tracing::info!("Notification backend: microsoft-graph");
        Arc::new(GraphNotifier::new(config))
    } else {
        tracing::warn!("Notification backend: none configured");
        Arc::new(DisabledNotifier)
    }
}
