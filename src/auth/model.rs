//! Identity and password-recovery data models.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Role assigned to every self-service signup.
pub const DEFAULT_ROLE: &str = "business_owner";

/// Purpose tag for password-reset codes.
pub const PASSWORD_RESET: &str = "password_reset";

/// Reset codes stay valid for this long.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

/// A persisted user account. The password hash never leaves the auth module.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new account record for signup.
    pub fn new(name: &str, email: &str, password_hash: String, phone: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
            phone: phone.to_string(),
            role: DEFAULT_ROLE.to_string(),
            email_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The short user block returned alongside a token.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// The profile view. Never includes the password hash.
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// User block embedded in signup/login responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Profile returned by `GET /auth/profile`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A short-lived, single-use password-reset code.
#[derive(Debug, Clone)]
pub struct ResetCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ResetCode {
    /// Build a fresh password-reset code expiring in 15 minutes.
    pub fn new(email: &str, code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            code,
            purpose: PASSWORD_RESET.to_string(),
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            used: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
