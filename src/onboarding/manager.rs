//! Onboarding lifecycle: autosave merging, retrieval, and submission.
//!
//! A user has at most one draft at a time; the store enforces this with a
//! uniqueness constraint on open drafts. Concurrent first saves are resolved
//! by retrying the losing insert as an update against the winner's row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DatabaseError, OnboardingError};
use crate::notify::{Notifier, templates};
use crate::store::Database;

use super::model::{
    AdminNotification, FINAL_STEP, OnboardingSubmission, SaveAck, SaveProgressRequest, StepEvent,
    SubmissionStatus, SubmissionView, SubmitAck, SubmitRequest,
};

const SUBMIT_MESSAGE: &str =
    "Your info has been successfully submitted. Admin will review and contact you soon.";

pub struct OnboardingManager {
    db: Arc<dyn Database>,
    notifier: Arc<dyn Notifier>,
    admin_email: String,
}

impl OnboardingManager {
    pub fn new(db: Arc<dyn Database>, notifier: Arc<dyn Notifier>, admin_email: String) -> Self {
        Self {
            db,
            notifier,
            admin_email,
        }
    }

    /// Merge an autosave into the user's draft, creating one if needed.
    ///
    /// When two first saves race, the losing insert hits the open-draft
    /// uniqueness constraint; the merge is then re-applied, once, as an
    /// update of the winning row.
    pub async fn save_progress(
        &self,
        user_id: Uuid,
        request: &SaveProgressRequest,
    ) -> Result<SaveAck, OnboardingError> {
        let now = Utc::now();

        if let Some(mut draft) = self.db.get_draft(user_id).await? {
            apply_progress(&mut draft, request, now);
            self.db.update_submission(&draft).await?;
            return Ok(ack(&draft));
        }

        let mut draft = OnboardingSubmission::new_draft(user_id, request.current_step, now);
        apply_progress(&mut draft, request, now);

        match self.db.insert_submission(&draft).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, submission_id = %draft.submission_id, "Draft created");
                Ok(ack(&draft))
            }
            Err(DatabaseError::Constraint(_)) => {
                // Lost the race; merge into the winner's draft instead.
                let mut winner = self.db.get_draft(user_id).await?.ok_or_else(|| {
                    DatabaseError::NotFound {
                        entity: "draft".to_string(),
                        id: user_id.to_string(),
                    }
                })?;
                apply_progress(&mut winner, request, now);
                self.db.update_submission(&winner).await?;
                Ok(ack(&winner))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The submission the frontend should resume from: the open draft if one
    /// exists, otherwise the most recently submitted record.
    pub async fn get_user_submission(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubmissionView>, OnboardingError> {
        if let Some(draft) = self.db.get_draft(user_id).await? {
            return Ok(Some(SubmissionView::of(draft)));
        }
        Ok(self
            .db
            .get_latest_submitted(user_id)
            .await?
            .map(SubmissionView::of))
    }

    /// Finalize the wizard. The submitted sections replace whatever the
    /// draft held; the admin notification is attempted once and its outcome
    /// is recorded on the submission either way.
    pub async fn submit_onboarding(
        &self,
        user_id: Uuid,
        request: SubmitRequest,
    ) -> Result<SubmitAck, OnboardingError> {
        let now = Utc::now();

        let (mut submission, is_new) = match self.db.get_draft(user_id).await? {
            Some(draft) => (draft, false),
            None => (OnboardingSubmission::new_skeleton(user_id, now), true),
        };

        submission.business_profile = Some(request.business_profile);
        submission.voice_agent_config = Some(request.voice_agent_config);
        submission.email_config = Some(request.email_config);
        submission.status = SubmissionStatus::Submitted;
        submission.is_submitted = true;
        submission.submitted_at = Some(now);
        submission.current_step = FINAL_STEP;
        submission.behavior_tracking.submission_completed = Some(now);
        submission.behavior_tracking.total_time_spent_seconds =
            (now - submission.behavior_tracking.submission_started)
                .num_seconds()
                .max(0);
        submission.behavior_tracking.last_active_at = now;

        // Persist the finalized record before touching the notifier, so a
        // delivery failure can never lose the submission.
        if is_new {
            self.db.insert_submission(&submission).await?;
        } else {
            self.db.update_submission(&submission).await?;
        }
        tracing::info!(
            user_id = %user_id,
            submission_id = %submission.submission_id,
            "Onboarding submitted"
        );

        let outcome = self.notify_admin(&submission).await;
        if !outcome.email_sent {
            tracing::warn!(
                submission_id = %submission.submission_id,
                "Admin notification was not delivered"
            );
        }
        submission.admin_notification = Some(outcome);
        self.db.update_submission(&submission).await?;

        Ok(SubmitAck {
            success: true,
            submission_id: submission.submission_id,
            message: SUBMIT_MESSAGE.to_string(),
        })
    }

    async fn notify_admin(&self, submission: &OnboardingSubmission) -> AdminNotification {
        let profile = submission.business_profile.as_ref();
        let business_name = profile
            .and_then(|p| p.business_name.as_deref())
            .unwrap_or("(unnamed business)");
        let contact_email = profile
            .and_then(|p| p.email.as_deref())
            .unwrap_or("(no contact email)");

        let message = templates::admin_submission_notification(
            &self.admin_email,
            business_name,
            contact_email,
            &submission.submission_id,
        );
        let result = self.notifier.send(&message).await;

        AdminNotification {
            email_sent: result.success,
            sent_at: Utc::now(),
            sent_to: self.admin_email.clone(),
            campaign_id: result.provider_message_id,
        }
    }
}

/// Apply a sparse autosave onto a draft. Present sections replace wholesale,
/// except `collection_fields` and `emergency_handling`, which slot into the
/// voice-agent section so a save carrying only them cannot erase it.
fn apply_progress(
    submission: &mut OnboardingSubmission,
    request: &SaveProgressRequest,
    now: DateTime<Utc>,
) {
    if let Some(profile) = &request.business_profile {
        submission.business_profile = Some(profile.clone());
    }
    if let Some(config) = &request.voice_agent_config {
        submission.voice_agent_config = Some(config.clone());
    }
    if let Some(fields) = &request.collection_fields {
        submission
            .voice_agent_config
            .get_or_insert_with(Default::default)
            .collection_fields = Some(fields.clone());
    }
    if let Some(handling) = &request.emergency_handling {
        submission
            .voice_agent_config
            .get_or_insert_with(Default::default)
            .emergency_handling = Some(handling.clone());
    }
    if let Some(preferences) = &request.email_config {
        submission.email_config = Some(preferences.clone());
    }

    submission.current_step = request.current_step;
    submission.last_saved_at = now;
    submission.behavior_tracking.last_active_at = now;

    if let Some(event) = &request.step_event {
        submission.behavior_tracking.step_events.push(StepEvent {
            step: event.step,
            action: event.action.clone(),
            timestamp: now,
            time_spent_seconds: event.time_spent_seconds,
        });
    }
}

fn ack(submission: &OnboardingSubmission) -> SaveAck {
    SaveAck {
        success: true,
        current_step: submission.current_step,
        last_saved_at: submission.last_saved_at,
        submission_id: submission.submission_id.clone(),
    }
}
