//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Timestamps are stored as
//! RFC 3339 text; wizard sections are stored as JSON text columns.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::model::{ResetCode, User};
use crate::error::DatabaseError;
use crate::onboarding::model::{
    AdminNotification, BehaviorTracking, BusinessProfile, EmailPreferences, OnboardingSubmission,
    SubmissionStatus, VoiceAgentConfig,
};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

/// Classify a libsql execution error: uniqueness violations become
/// `Constraint` so callers can recover; everything else is a plain `Query`.
fn classify(op: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        DatabaseError::Constraint(format!("{op}: {msg}"))
    } else {
        DatabaseError::Query(format!("{op}: {msg}"))
    }
}

fn parse_uuid(op: &str, s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("{op}: bad uuid {s}: {e}")))
}

fn serialize_json<T: serde::Serialize>(
    op: &str,
    value: &Option<T>,
) -> Result<Option<String>, DatabaseError> {
    match value {
        Some(v) => serde_json::to_string(v)
            .map(Some)
            .map_err(|e| DatabaseError::Serialization(format!("{op}: {e}"))),
        None => Ok(None),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    op: &str,
    value: Option<String>,
) -> Result<Option<T>, DatabaseError> {
    match value {
        Some(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| DatabaseError::Serialization(format!("{op}: {e}"))),
        None => Ok(None),
    }
}

// ── Row mappers ─────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, role, email_verified, \
     last_login_at, created_at, updated_at";

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    let op = "row_to_user";
    let id: String = row.get(0).map_err(|e| classify(op, e))?;
    let email: String = row.get(1).map_err(|e| classify(op, e))?;
    let password_hash: String = row.get(2).map_err(|e| classify(op, e))?;
    let name: String = row.get(3).map_err(|e| classify(op, e))?;
    let phone: String = row.get(4).map_err(|e| classify(op, e))?;
    let role: String = row.get(5).map_err(|e| classify(op, e))?;
    let email_verified: i64 = row.get(6).map_err(|e| classify(op, e))?;
    let last_login_at: Option<String> = row.get::<String>(7).ok();
    let created_at: String = row.get(8).map_err(|e| classify(op, e))?;
    let updated_at: String = row.get(9).map_err(|e| classify(op, e))?;

    Ok(User {
        id: parse_uuid(op, &id)?,
        email,
        password_hash,
        name,
        phone,
        role,
        email_verified: email_verified != 0,
        last_login_at: last_login_at.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

const CODE_COLUMNS: &str = "id, email, code, purpose, expires_at, used, created_at";

fn row_to_reset_code(row: &libsql::Row) -> Result<ResetCode, DatabaseError> {
    let op = "row_to_reset_code";
    let id: String = row.get(0).map_err(|e| classify(op, e))?;
    let email: String = row.get(1).map_err(|e| classify(op, e))?;
    let code: String = row.get(2).map_err(|e| classify(op, e))?;
    let purpose: String = row.get(3).map_err(|e| classify(op, e))?;
    let expires_at: String = row.get(4).map_err(|e| classify(op, e))?;
    let used: i64 = row.get(5).map_err(|e| classify(op, e))?;
    let created_at: String = row.get(6).map_err(|e| classify(op, e))?;

    Ok(ResetCode {
        id: parse_uuid(op, &id)?,
        email,
        code,
        purpose,
        expires_at: parse_datetime(&expires_at),
        used: used != 0,
        created_at: parse_datetime(&created_at),
    })
}

const SUBMISSION_COLUMNS: &str = "id, user_id, submission_id, status, is_submitted, submitted_at, \
     current_step, last_saved_at, business_profile, voice_agent_config, email_config, \
     admin_notification, behavior_tracking, created_at, updated_at";

fn row_to_submission(row: &libsql::Row) -> Result<OnboardingSubmission, DatabaseError> {
    let op = "row_to_submission";
    let id: String = row.get(0).map_err(|e| classify(op, e))?;
    let user_id: String = row.get(1).map_err(|e| classify(op, e))?;
    let submission_id: String = row.get(2).map_err(|e| classify(op, e))?;
    let status: String = row.get(3).map_err(|e| classify(op, e))?;
    let is_submitted: i64 = row.get(4).map_err(|e| classify(op, e))?;
    let submitted_at: Option<String> = row.get::<String>(5).ok();
    let current_step: i64 = row.get(6).map_err(|e| classify(op, e))?;
    let last_saved_at: String = row.get(7).map_err(|e| classify(op, e))?;
    let business_profile: Option<String> = row.get::<String>(8).ok();
    let voice_agent_config: Option<String> = row.get::<String>(9).ok();
    let email_config: Option<String> = row.get::<String>(10).ok();
    let admin_notification: Option<String> = row.get::<String>(11).ok();
    let behavior_tracking: String = row.get(12).map_err(|e| classify(op, e))?;
    let created_at: String = row.get(13).map_err(|e| classify(op, e))?;
    let updated_at: String = row.get(14).map_err(|e| classify(op, e))?;

    let behavior_tracking: BehaviorTracking = serde_json::from_str(&behavior_tracking)
        .map_err(|e| DatabaseError::Serialization(format!("{op}: behavior_tracking: {e}")))?;

    Ok(OnboardingSubmission {
        id: parse_uuid(op, &id)?,
        user_id: parse_uuid(op, &user_id)?,
        submission_id,
        status: SubmissionStatus::from_str(&status),
        is_submitted: is_submitted != 0,
        submitted_at: submitted_at.as_deref().map(parse_datetime),
        current_step,
        last_saved_at: parse_datetime(&last_saved_at),
        business_profile: parse_json::<BusinessProfile>(op, business_profile)?,
        voice_agent_config: parse_json::<VoiceAgentConfig>(op, voice_agent_config)?,
        email_config: parse_json::<EmailPreferences>(op, email_config)?,
        admin_notification: parse_json::<AdminNotification>(op, admin_notification)?,
        behavior_tracking,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    // ── Users ───────────────────────────────────────────────────────

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, password_hash, name, phone, role, email_verified, \
                 last_login_at, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id.to_string(),
                    user.email.clone(),
                    user.password_hash.clone(),
                    user.name.clone(),
                    user.phone.clone(),
                    user.role.clone(),
                    user.email_verified as i64,
                    opt_text_owned(user.last_login_at.map(|t| t.to_rfc3339())),
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| classify("insert_user", e))?;

        debug!(user_id = %user.id, "User inserted into DB");
        Ok(())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| classify("get_user_by_id", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(classify("get_user_by_id", e)),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
                params![email],
            )
            .await
            .map_err(|e| classify("get_user_by_email", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(classify("get_user_by_email", e)),
        }
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE users SET last_login_at = ?1, updated_at = ?1 WHERE id = ?2",
                params![at.to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| classify("update_last_login", e))?;
        Ok(())
    }

    async fn update_password_hash(&self, id: Uuid, hash: &str) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![hash, Utc::now().to_rfc3339(), id.to_string()],
            )
            .await
            .map_err(|e| classify("update_password_hash", e))?;
        Ok(())
    }

    // ── Reset codes ─────────────────────────────────────────────────

    async fn insert_reset_code(&self, code: &ResetCode) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO reset_codes (id, email, code, purpose, expires_at, used, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code.id.to_string(),
                    code.email.clone(),
                    code.code.clone(),
                    code.purpose.clone(),
                    code.expires_at.to_rfc3339(),
                    code.used as i64,
                    code.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| classify("insert_reset_code", e))?;
        Ok(())
    }

    async fn find_unused_reset_code(
        &self,
        email: &str,
        code: &str,
        purpose: &str,
    ) -> Result<Option<ResetCode>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {CODE_COLUMNS} FROM reset_codes \
                     WHERE email = ?1 AND code = ?2 AND purpose = ?3 AND used = 0"
                ),
                params![email, code, purpose],
            )
            .await
            .map_err(|e| classify("find_unused_reset_code", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_reset_code(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(classify("find_unused_reset_code", e)),
        }
    }

    async fn mark_reset_code_used(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE reset_codes SET used = 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| classify("mark_reset_code_used", e))?;
        Ok(())
    }

    async fn delete_reset_codes(
        &self,
        email: &str,
        purpose: &str,
    ) -> Result<usize, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM reset_codes WHERE email = ?1 AND purpose = ?2",
                params![email, purpose],
            )
            .await
            .map_err(|e| classify("delete_reset_codes", e))?;
        Ok(count as usize)
    }

    async fn delete_expired_reset_codes(&self) -> Result<usize, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM reset_codes WHERE expires_at < ?1",
                params![Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| classify("delete_expired_reset_codes", e))?;

        if count > 0 {
            info!(count, "Purged expired reset codes");
        }
        Ok(count as usize)
    }

    // ── Onboarding submissions ──────────────────────────────────────

    async fn insert_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError> {
        let op = "insert_submission";
        let behavior = serde_json::to_string(&submission.behavior_tracking)
            .map_err(|e| DatabaseError::Serialization(format!("{op}: {e}")))?;

        self.conn()
            .execute(
                "INSERT INTO onboarding_submissions \
                 (id, user_id, submission_id, status, is_submitted, submitted_at, current_step, \
                  last_saved_at, business_profile, voice_agent_config, email_config, \
                  admin_notification, behavior_tracking, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    submission.id.to_string(),
                    submission.user_id.to_string(),
                    submission.submission_id.clone(),
                    submission.status.as_str(),
                    submission.is_submitted as i64,
                    opt_text_owned(submission.submitted_at.map(|t| t.to_rfc3339())),
                    submission.current_step,
                    submission.last_saved_at.to_rfc3339(),
                    opt_text_owned(serialize_json(op, &submission.business_profile)?),
                    opt_text_owned(serialize_json(op, &submission.voice_agent_config)?),
                    opt_text_owned(serialize_json(op, &submission.email_config)?),
                    opt_text_owned(serialize_json(op, &submission.admin_notification)?),
                    behavior,
                    submission.created_at.to_rfc3339(),
                    submission.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| classify(op, e))?;

        debug!(submission_id = %submission.submission_id, "Submission inserted into DB");
        Ok(())
    }

    async fn update_submission(
        &self,
        submission: &OnboardingSubmission,
    ) -> Result<(), DatabaseError> {
        let op = "update_submission";
        let behavior = serde_json::to_string(&submission.behavior_tracking)
            .map_err(|e| DatabaseError::Serialization(format!("{op}: {e}")))?;

        self.conn()
            .execute(
                "UPDATE onboarding_submissions SET \
                  status = ?1, is_submitted = ?2, submitted_at = ?3, current_step = ?4, \
                  last_saved_at = ?5, business_profile = ?6, voice_agent_config = ?7, \
                  email_config = ?8, admin_notification = ?9, behavior_tracking = ?10, \
                  updated_at = ?11 \
                 WHERE id = ?12",
                params![
                    submission.status.as_str(),
                    submission.is_submitted as i64,
                    opt_text_owned(submission.submitted_at.map(|t| t.to_rfc3339())),
                    submission.current_step,
                    submission.last_saved_at.to_rfc3339(),
                    opt_text_owned(serialize_json(op, &submission.business_profile)?),
                    opt_text_owned(serialize_json(op, &submission.voice_agent_config)?),
                    opt_text_owned(serialize_json(op, &submission.email_config)?),
                    opt_text_owned(serialize_json(op, &submission.admin_notification)?),
                    behavior,
                    Utc::now().to_rfc3339(),
                    submission.id.to_string(),
                ],
            )
            .await
            .map_err(|e| classify(op, e))?;
        Ok(())
    }

    async fn get_draft(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions \
                     WHERE user_id = ?1 AND is_submitted = 0"
                ),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| classify("get_draft", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_submission(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(classify("get_draft", e)),
        }
    }

    async fn get_latest_submitted(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OnboardingSubmission>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM onboarding_submissions \
                     WHERE user_id = ?1 AND is_submitted = 1 \
                     ORDER BY submitted_at DESC LIMIT 1"
                ),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| classify("get_latest_submitted", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_submission(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(classify("get_latest_submitted", e)),
        }
    }
}
