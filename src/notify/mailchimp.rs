//! Mailchimp delivery backend.
//!
//! Mailchimp has no plain transactional-send endpoint on the marketing API,
//! so delivery is a four-step dance: make sure the recipient is an audience
//! member, create a one-off campaign segmented to that single member, set the
//! campaign content, send the campaign. Any step failing downgrades the whole
//! dispatch to `success: false`.

use async_trait::async_trait;
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::config::NotifyConfig;

use super::{DispatchResult, Notification, Notifier};

pub struct MailchimpNotifier {
    http: reqwest::Client,
    api_key: SecretString,
    server_prefix: String,
    audience_id: String,
}

impl MailchimpNotifier {
    /// Build from configuration.
    ///
    /// # Panics
    ///
    /// Panics if called without `NotifyConfig::mailchimp_ready()`; the
    /// backend selector checks readiness first.
    pub fn new(config: &NotifyConfig) -> Self {
        assert!(config.mailchimp_ready(), "mailchimp credentials missing");
        Self {
            http: reqwest::Client::new(),
            api_key: config
                .mailchimp_api_key
                .clone()
                .unwrap_or_else(|| SecretString::from("")),
            server_prefix: config.mailchimp_server_prefix.clone().unwrap_or_default(),
            audience_id: config.mailchimp_audience_id.clone().unwrap_or_default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "https://{}.api.mailchimp.com/3.0{path}",
            self.server_prefix
        )
    }

    /// Mailchimp addresses audience members by the MD5 of the lowercased
    /// email.
    fn member_hash(email: &str) -> String {
        let digest = Md5::digest(email.to_lowercase().as_bytes());
        format!("{digest:x}")
    }

    /// Add the recipient to the audience if not already a member.
    async fn ensure_member(&self, email: &str) -> Result<(), String> {
        let hash = Self::member_hash(email);
        let url = self.url(&format!("/lists/{}/members/{hash}", self.audience_id));

        let response = self
            .http
            .get(&url)
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
            .send()
            .await
            .map_err(|e| format!("member lookup failed: {e}"))?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(format!("member lookup returned {}", response.status()));
        }

        let add_url = self.url(&format!("/lists/{}/members", self.audience_id));
        let response = self
            .http
            .post(&add_url)
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
            .json(&json!({
                "email_address": email,
                "status": "transactional",
            }))
            .send()
            .await
            .map_err(|e| format!("member add failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("member add returned {}", response.status()))
        }
    }

    /// Create a campaign targeting exactly the recipient.
    async fn create_campaign(&self, notification: &Notification) -> Result<String, String> {
        let response = self
            .http
            .post(self.url("/campaigns"))
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
            .json(&json!({
                "type": "regular",
                "recipients": {
                    "list_id": self.audience_id,
                    "segment_opts": {
                        "match": "all",
                        "conditions": [{
                            "condition_type": "EmailAddress",
                            "field": "EMAIL",
                            "op": "is",
                            "value": notification.recipient,
                        }],
                    },
                },
                "settings": {
                    "subject_line": notification.subject,
                    "title": notification.subject,
                    "from_name": "SherpaPrompt",
                    "reply_to": "noreply@sherpaprompt.com",
                },
            }))
            .send()
            .await
            .map_err(|e| format!("campaign create failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("campaign create returned {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("campaign create body unreadable: {e}"))?;
        body.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "campaign create response had no id".to_string())
    }

    async fn set_content(&self, campaign_id: &str, notification: &Notification) -> Result<(), String> {
        let response = self
            .http
            .put(self.url(&format!("/campaigns/{campaign_id}/content")))
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
            .json(&json!({
                "html": notification.html_body,
                "plain_text": notification.text_body,
            }))
            .send()
            .await
            .map_err(|e| format!("content set failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("content set returned {}", response.status()))
        }
    }

    async fn send_campaign(&self, campaign_id: &str) -> Result<(), String> {
        let response = self
            .http
            .post(self.url(&format!("/campaigns/{campaign_id}/actions/send")))
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
            .send()
            .await
            .map_err(|e| format!("campaign send failed: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("campaign send returned {}", response.status()))
        }
    }

    async fn dispatch(&self, notification: &Notification) -> Result<String, String> {
        self.ensure_member(&notification.recipient).await?;
        let campaign_id = self.create_campaign(notification).await?;
        self.set_content(&campaign_id, notification).await?;
        self.send_campaign(&campaign_id).await?;
        Ok(campaign_id)
    }
}

#[async_trait]
impl Notifier for MailchimpNotifier {
    async fn send(&self, notification: &Notification) -> DispatchResult {
        match self.dispatch(notification).await {
            Ok(campaign_id) => {
                tracing::info!(
                    recipient = %notification.recipient,
                    campaign_id = %campaign_id,
                    "Mailchimp campaign sent"
                );
                DispatchResult::sent(Some(campaign_id))
            }
            Err(reason) => {
                tracing::warn!(
                    recipient = %notification.recipient,
                    %reason,
                    "Mailchimp dispatch failed"
                );
                DispatchResult::failed()
            }
        }
    }

    fn name(&self) -> &'static str {
        "mailchimp"
    }
}
