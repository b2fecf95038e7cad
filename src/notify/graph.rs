//! Microsoft Graph delivery backend.
//!
//! Fetches an app-only token via the client-credentials grant, then calls
//! `sendMail` on the configured sender mailbox. Graph accepts sendMail with
//! 202 and no message id, so a successful dispatch carries no provider
//! reference.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::config::NotifyConfig;

use super::{DispatchResult, Notification, Notifier};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

pub struct GraphNotifier {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    sender: String,
}

impl GraphNotifier {
    /// Build from configuration.
    ///
    /// # Panics
    ///
    /// Panics if called without `NotifyConfig::graph_ready()`; the backend
    /// selector checks readiness first.
    pub fn new(config: &NotifyConfig) -> Self {
        assert!(config.graph_ready(), "graph credentials missing");
        Self {
            http: reqwest::Client::new(),
            tenant_id: config.graph_tenant_id.clone().unwrap_or_default(),
            client_id: config.graph_client_id.clone().unwrap_or_default(),
            client_secret: config
                .graph_client_secret
                .clone()
                .unwrap_or_else(|| SecretString::from("")),
            sender: config.graph_sender.clone().unwrap_or_default(),
        }
    }

    async fn acquire_token(&self) -> Result<String, String> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );
        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("token endpoint returned {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("token body unreadable: {e}"))?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "token response had no access_token".to_string())
    }

    async fn send_mail(&self, token: &str, notification: &Notification) -> Result<(), String> {
        let url = format!(
            "https://graph.microsoft.com/v1.0/users/{}/sendMail",
            self.sender
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "message": {
                    "subject": notification.subject,
                    "body": {
                        "contentType": "HTML",
                        "content": notification.html_body,
                    },
                    "toRecipients": [{
                        "emailAddress": { "address": notification.recipient },
                    }],
                },
                "saveToSentItems": true,
            }))
            .send()
            .await
            .map_err(|e| format!("sendMail request failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("sendMail returned {}", response.status()))
        }
    }
}

#[async_trait]
impl Notifier for GraphNotifier {
    async fn send(&self, notification: &Notification) -> DispatchResult {
        let token = match self.acquire_token().await {
            Ok(token) => token,
            Err(reason) => {
                tracing::warn!(%reason, "Graph token acquisition failed");
                return DispatchResult::failed();
            }
        };

        match self.send_mail(&token, notification).await {
            Ok(()) => {
                tracing::info!(recipient = %notification.recipient, "Graph mail sent");
                DispatchResult::sent(None)
            }
            Err(reason) => {
                tracing::warn!(
                    recipient = %notification.recipient,
                    %reason,
                    "Graph dispatch failed"
                );
                DispatchResult::failed()
            }
        }
    }

    fn name(&self) -> &'static str {
        "microsoft-graph"
    }
}
