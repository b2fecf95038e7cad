//! Unified `Database` trait — single async interface for all persistence.
//!
//! All mutation in the service goes through this trait; there are no other
//! shared mutable resources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::model::{ResetCode, User};
use crate::error::DatabaseError;
use crate::onboarding::model::OnboardingSubmission;

/// Backend-agnostic database trait covering users, reset codes, and
/// onboarding submissions.
#[async_trait]
pub trait Database: Send + Sync {
    // ── Users ───────────────────────────────────────────────────────

    /// Insert a new user. A duplicate email (case-insensitive) surfaces as
    /// [`DatabaseError::Constraint`].
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Look up a user by email, matched case-insensitively.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn update_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), DatabaseError>;

    // ── Reset codes ─────────────────────────────────────────────────

    async fn insert_reset_code(&self, code: &ResetCode) -> Result<(), DatabaseError>;

    /// Find an unused code matching (email, code, purpose). Expiry is NOT
    /// checked here; the caller decides how to report an expired match.
    async fn find_unused_reset_code(
        &self,
        email: &str,
        code: &str,
        purpose: &str,
    ) -> Result<Option<ResetCode>, DatabaseError>;

    async fn mark_reset_code_used(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Delete every code for (email, purpose). Returns the number deleted.
    async fn delete_reset_codes(&self, email: &str, purpose: &str)
    -> Result<usize, DatabaseError>;

    /// Delete codes past their expiry. Returns the number deleted.
    async fn delete_expired_reset_codes(&self) -> Result<usize, DatabaseError>;

    // ── Onboarding submissions ──────────────────────────────────────

    /// Insert a submission. A second draft for the same user violates the
    /// `one_draft_per_user` partial index and surfaces as
    /// [`DatabaseError::Constraint`].
    async fn insert_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError>;

    /// Persist the full current state of an existing submission row.
    async fn update_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError>;

    /// The user's active draft, if any.
    async fn get_draft(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError>;

    /// The user's most recent submitted record, if any.
    async fn get_latest_submitted(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError>;
}
