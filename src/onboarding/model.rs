//! Onboarding submission data model and request DTOs.
//!
//! Wizard sections are typed structs with optional fields; the wire format is
//! camelCase to match the frontend contract. Sections live in JSON columns.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The wizard's final step number, forced on submit.
pub const FINAL_STEP: i64 = 6;

/// Lifecycle status of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "submitted" => Self::Submitted,
            _ => Self::Draft,
        }
    }
}

// ── Wizard sections ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday_friday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<String>,
}

/// The business the voice agent answers for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<BusinessHours>,
}

/// A caller question the business wants asked verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub question: String,
    #[serde(default)]
    pub required: bool,
}

/// Which caller details the agent collects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFields {
    #[serde(default = "default_true")]
    pub name: bool,
    #[serde(default = "default_true")]
    pub phone: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default = "default_true")]
    pub reason: bool,
    #[serde(default)]
    pub urgency: bool,
    #[serde(default)]
    pub property_address: bool,
    #[serde(default)]
    pub best_time_to_callback: bool,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

fn default_true() -> bool {
    true
}

impl Default for CollectionFields {
    fn default() -> Self {
        Self {
            name: true,
            phone: true,
            email: false,
            reason: true,
            urgency: false,
            property_address: false,
            best_time_to_callback: false,
            custom_fields: Vec::new(),
        }
    }
}

/// What the agent does when a caller reports an emergency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyHandling {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_to_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_method: Option<String>,
}

fn default_voice() -> String {
    "ash".to_string()
}

/// Voice-agent persona and behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_personality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_fields: Option<CollectionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_handling: Option<EmergencyHandling>,
}

impl Default for VoiceAgentConfig {
    fn default() -> Self {
        Self {
            agent_name: None,
            agent_personality: None,
            greeting: None,
            voice: default_voice(),
            collection_fields: None,
            emergency_handling: None,
        }
    }
}

/// Where call summaries go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(default = "default_true")]
    pub summary_enabled: bool,
}

impl Default for EmailPreferences {
    fn default() -> Self {
        Self {
            recipient_email: None,
            summary_enabled: true,
        }
    }
}

// ── Audit blocks ────────────────────────────────────────────────────

/// Outcome of the post-submit admin notification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminNotification {
    pub email_sent: bool,
    pub sent_at: DateTime<Utc>,
    pub sent_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// One wizard navigation event. The event log is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub step: i64,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<i64>,
}

/// Wizard behavior audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorTracking {
    pub submission_started: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_events: Vec<StepEvent>,
    #[serde(default)]
    pub total_time_spent_seconds: i64,
    #[serde(default = "default_one")]
    pub number_of_sessions: i64,
    pub last_active_at: DateTime<Utc>,
}

fn default_one() -> i64 {
    1
}

impl BehaviorTracking {
    /// Fresh tracking block. When `entry_step` is given, the first event
    /// records the wizard step the user entered on.
    pub fn started(now: DateTime<Utc>, entry_step: Option<i64>) -> Self {
        let step_events = match entry_step {
            Some(step) => vec![StepEvent {
                step,
                action: "entered".to_string(),
                timestamp: now,
                time_spent_seconds: None,
            }],
            None => Vec::new(),
        };
        Self {
            submission_started: now,
            submission_completed: None,
            step_events,
            total_time_spent_seconds: 0,
            number_of_sessions: 1,
            last_active_at: now,
        }
    }
}

// ── Submission record ───────────────────────────────────────────────

/// A persisted wizard state: one draft per user until it is submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Human-readable, globally unique identifier, e.g. `4t-K3X-2026-08-29`.
    pub submission_id: String,
    pub status: SubmissionStatus,
    pub is_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub current_step: i64,
    pub last_saved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_profile: Option<BusinessProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_agent_config: Option<VoiceAgentConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_config: Option<EmailPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notification: Option<AdminNotification>,
    pub behavior_tracking: BehaviorTracking,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate a submission identifier: `4t-` + 3 random uppercase
/// alphanumerics + the current date.
pub fn generate_submission_id(now: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..3)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("4t-{}-{}", suffix, now.format("%Y-%m-%d"))
}

impl OnboardingSubmission {
    /// Start a draft on the user's first autosave.
    pub fn new_draft(user_id: Uuid, current_step: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            submission_id: generate_submission_id(now),
            status: SubmissionStatus::Draft,
            is_submitted: false,
            submitted_at: None,
            current_step,
            last_saved_at: now,
            business_profile: None,
            voice_agent_config: None,
            email_config: None,
            admin_notification: None,
            behavior_tracking: BehaviorTracking::started(now, Some(current_step)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Skeletal record for a submit that arrives with no prior draft.
    /// No entry event is recorded since the wizard was never autosaved.
    pub fn new_skeleton(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            current_step: 1,
            behavior_tracking: BehaviorTracking::started(now, None),
            ..Self::new_draft(user_id, 1, now)
        }
    }
}

// ── Request / response DTOs ─────────────────────────────────────────

/// Discrete navigation event carried by an autosave call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEventInput {
    pub step: i64,
    pub action: String,
    #[serde(default)]
    pub time_spent_seconds: Option<i64>,
}

/// Body of `POST /onboarding/save`. All sections optional (sparse merge).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub current_step: i64,
    #[serde(default)]
    pub business_profile: Option<BusinessProfile>,
    #[serde(default)]
    pub voice_agent_config: Option<VoiceAgentConfig>,
    #[serde(default)]
    pub collection_fields: Option<CollectionFields>,
    #[serde(default)]
    pub emergency_handling: Option<EmergencyHandling>,
    #[serde(default)]
    pub email_config: Option<EmailPreferences>,
    #[serde(default)]
    pub step_event: Option<StepEventInput>,
}

/// Body of `POST /onboarding/submit`. All sections required (full replace).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub business_profile: BusinessProfile,
    pub voice_agent_config: VoiceAgentConfig,
    pub email_config: EmailPreferences,
}

/// Ack returned by `POST /onboarding/save`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub success: bool,
    pub current_step: i64,
    pub last_saved_at: DateTime<Utc>,
    pub submission_id: String,
}

/// Ack returned by `POST /onboarding/submit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    pub success: bool,
    pub submission_id: String,
    pub message: String,
}

/// Wrapper returned by `GET /onboarding/my-submission` when a record exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub submission: OnboardingSubmission,
    pub status: SubmissionStatus,
    pub current_step: i64,
    pub is_submitted: bool,
    pub last_saved_at: DateTime<Utc>,
}

impl SubmissionView {
    pub fn of(submission: OnboardingSubmission) -> Self {
        Self {
            status: submission.status,
            current_step: submission.current_step,
            is_submitted: submission.is_submitted,
            last_saved_at: submission.last_saved_at,
            submission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_id_shape() {
        let now = Utc::now();
        let id = generate_submission_id(now);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "4t");
        assert_eq!(parts[1].len(), 3);
        assert!(parts[1].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(parts[2], now.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn new_draft_records_entry_event() {
        let now = Utc::now();
        let draft = OnboardingSubmission::new_draft(Uuid::new_v4(), 2, now);
        assert_eq!(draft.status, SubmissionStatus::Draft);
        assert!(!draft.is_submitted);
        assert_eq!(draft.current_step, 2);
        assert_eq!(draft.behavior_tracking.step_events.len(), 1);
        let event = &draft.behavior_tracking.step_events[0];
        assert_eq!(event.step, 2);
        assert_eq!(event.action, "entered");
        assert!(event.time_spent_seconds.is_none());
        assert_eq!(draft.behavior_tracking.number_of_sessions, 1);
    }

    #[test]
    fn skeleton_has_no_events() {
        let skeleton = OnboardingSubmission::new_skeleton(Uuid::new_v4(), Utc::now());
        assert!(skeleton.behavior_tracking.step_events.is_empty());
        assert_eq!(skeleton.current_step, 1);
    }

    #[test]
    fn collection_fields_defaults() {
        let fields: CollectionFields = serde_json::from_str("{}").unwrap();
        assert!(fields.name);
        assert!(fields.phone);
        assert!(!fields.email);
        assert!(fields.reason);
        assert!(!fields.urgency);
        assert!(fields.custom_fields.is_empty());
    }

    #[test]
    fn voice_defaults_to_ash() {
        let config: VoiceAgentConfig =
            serde_json::from_str(r#"{"agentName":"Bob"}"#).unwrap();
        assert_eq!(config.agent_name.as_deref(), Some("Bob"));
        assert_eq!(config.voice, "ash");
    }

    #[test]
    fn save_request_sparse_sections() {
        let request: SaveProgressRequest =
            serde_json::from_str(r#"{"currentStep":3}"#).unwrap();
        assert_eq!(request.current_step, 3);
        assert!(request.business_profile.is_none());
        assert!(request.voice_agent_config.is_none());
        assert!(request.step_event.is_none());
    }

    #[test]
    fn behavior_tracking_roundtrip() {
        let tracking = BehaviorTracking::started(Utc::now(), Some(1));
        let json = serde_json::to_string(&tracking).unwrap();
        assert!(json.contains("submissionStarted"));
        assert!(json.contains("stepEvents"));
        let parsed: BehaviorTracking = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tracking);
    }
}
