//! Account signup, login, profile, and password recovery.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::notify::{Notifier, templates};
use crate::store::Database;

use super::jwt;
use super::model::{PASSWORD_RESET, Profile, ResetCode, User, UserSummary};
use super::password;
use crate::config::JwtConfig;

/// Response for the recovery endpoints. `forgot-password` returns the same
/// body whether or not the account exists.
#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub success: bool,
    pub message: String,
}

/// Token plus the signed-in user, returned by signup and login.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserSummary,
}

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists with this email, you will receive a password reset code.";
const RESET_SUCCESS_MESSAGE: &str =
    "Your password has been reset successfully. You can now log in with your new password.";

pub struct AuthService {
    db: Arc<dyn Database>,
    notifier: Arc<dyn Notifier>,
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(db: Arc<dyn Database>, notifier: Arc<dyn Notifier>, jwt: JwtConfig) -> Self {
        Self { db, notifier, jwt }
    }

    /// Register a new account and sign the user in.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<AuthPayload, AuthError> {
        password::validate_password_strength(password).map_err(AuthError::WeakPassword)?;

        if self.db.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let hash =
            password::hash_password(password).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let user = User::new(name, email, hash, phone);

        // The email column is unique; a concurrent signup losing the race
        // still gets the same conflict answer.
        match self.db.insert_user(&user).await {
            Ok(()) => {}
            Err(crate::error::DatabaseError::Constraint(_)) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, "New account registered");
        self.issue_payload(&user)
    }

    /// Sign an existing user in. Unknown email and wrong password produce
    /// the same error so accounts cannot be enumerated.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        let Some(user) = self.db.get_user_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let ok = password::verify_password(password, &user.password_hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        self.db.update_last_login(user.id, Utc::now()).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        self.issue_payload(&user)
    }

    /// Resolve the account behind a validated token. Fails as an auth error
    /// when the account has since been deleted.
    pub async fn validate_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.db
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AuthError> {
        Ok(self.validate_user(user_id).await?.profile())
    }

    /// Validate a bearer token and resolve its account in one step.
    pub async fn authorize(&self, token: &str) -> Result<User, AuthError> {
        let claims = jwt::validate_token(token, &self.jwt).map_err(|_| AuthError::InvalidToken)?;
        self.validate_user(claims.sub).await
    }

    /// Start password recovery. The response body is identical whether or
    /// not the account exists; only an existing account gets a code.
    pub async fn forgot_password(&self, email: &str) -> Result<GenericResponse, AuthError> {
        if let Some(user) = self.db.get_user_by_email(email).await? {
            let code = generate_reset_code();

            // One active code per account: clear earlier ones first.
            self.db.delete_reset_codes(&user.email, PASSWORD_RESET).await?;
            let reset = ResetCode::new(&user.email, code.clone());
            self.db.insert_reset_code(&reset).await?;

            let message = templates::password_reset_code(&user.email, &user.name, &code);
            let result = self.notifier.send(&message).await;
            if !result.success {
                tracing::warn!(user_id = %user.id, "Password reset email was not delivered");
            }
        }

        Ok(GenericResponse {
            success: true,
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
        })
    }

    /// Finish password recovery with a code from the reset email.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<GenericResponse, AuthError> {
        password::validate_password_strength(new_password).map_err(AuthError::WeakPassword)?;

        let Some(reset) = self
            .db
            .find_unused_reset_code(email, code, PASSWORD_RESET)
            .await?
        else {
            return Err(AuthError::InvalidResetCode);
        };

        if reset.is_expired(Utc::now()) {
            return Err(AuthError::ResetCodeExpired);
        }

        let Some(user) = self.db.get_user_by_email(email).await? else {
            return Err(AuthError::UserNotFound);
        };

        let same = password::verify_password(new_password, &user.password_hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if same {
            return Err(AuthError::PasswordReused);
        }

        let hash =
            password::hash_password(new_password).map_err(|e| AuthError::Hashing(e.to_string()))?;
        self.db.update_password_hash(user.id, &hash).await?;

        self.db.mark_reset_code_used(reset.id).await?;
        self.db.delete_reset_codes(email, PASSWORD_RESET).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(GenericResponse {
            success: true,
            message: RESET_SUCCESS_MESSAGE.to_string(),
        })
    }

    fn issue_payload(&self, user: &User) -> Result<AuthPayload, AuthError> {
        let token = jwt::generate_token(user.id, &user.email, &self.jwt)
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthPayload {
            token,
            user: user.summary(),
        })
    }
}

/// Six-digit numeric recovery code.
fn generate_reset_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DispatchResult, Notification};
    use crate::store::LibSqlBackend;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::sync::Mutex;

    /// Records every message instead of delivering it.
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        deliver: bool,
    }

    impl RecordingNotifier {
        fn new(deliver: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                deliver,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> DispatchResult {
            self.sent.lock().unwrap().push(notification.clone());
            if self.deliver {
                DispatchResult::sent(None)
            } else {
                DispatchResult::failed()
            }
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    async fn service() -> (AuthService, Arc<LibSqlBackend>, Arc<RecordingNotifier>) {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let notifier = Arc::new(RecordingNotifier::new(true));
        let jwt = JwtConfig {
            secret: SecretString::from("unit-test-secret"),
            expiry_days: 7,
        };
        (
            AuthService::new(db.clone(), notifier.clone(), jwt),
            db,
            notifier,
        )
    }

    #[tokio::test]
    async fn signup_then_login() {
        let (auth, _db, _n) = service().await;
        let payload = auth
            .signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();
        assert_eq!(payload.user.email, "alice@example.com");
        assert!(!payload.token.is_empty());

        let login = auth.login("alice@example.com", "secret1").await.unwrap();
        assert_eq!(login.user.id, payload.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let (auth, _db, _n) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();
        let err = auth
            .signup("Other", "ALICE@example.com", "secret2", "555-0101")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn login_errors_are_uniform() {
        let (auth, _db, _n) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();

        let unknown = auth.login("nobody@example.com", "secret1").await.unwrap_err();
        let wrong = auth.login("alice@example.com", "wrong-pw").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn login_updates_last_login() {
        let (auth, db, _n) = service().await;
        let payload = auth
            .signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();

        let before = db.get_user_by_id(payload.user.id).await.unwrap().unwrap();
        assert!(before.last_login_at.is_none());

        auth.login("alice@example.com", "secret1").await.unwrap();

        let after = db.get_user_by_id(payload.user.id).await.unwrap().unwrap();
        let logged_in_at = after.last_login_at.expect("last_login_at should be set");
        assert!((Utc::now() - logged_in_at).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn weak_password_rejected_at_signup() {
        let (auth, _db, _n) = service().await;
        let err = auth
            .signup("Alice", "alice@example.com", "short", "555-0100")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn forgot_password_body_is_identical_for_unknown_accounts() {
        let (auth, _db, notifier) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();

        let known = auth.forgot_password("alice@example.com").await.unwrap();
        let unknown = auth.forgot_password("nobody@example.com").await.unwrap();
        assert_eq!(known.message, unknown.message);
        assert_eq!(known.success, unknown.success);

        // Only the real account got an email.
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn full_reset_flow() {
        let (auth, db, notifier) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();
        auth.forgot_password("alice@example.com").await.unwrap();

        // Pull the code out of the recorded email.
        let code = {
            let sent = notifier.sent.lock().unwrap();
            let body = &sent[0].text_body;
            body.split_whitespace()
                .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
                .unwrap()
                .to_string()
        };

        // Same password is rejected.
        let err = auth
            .reset_password("alice@example.com", &code, "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordReused));

        let ok = auth
            .reset_password("alice@example.com", &code, "secret2")
            .await
            .unwrap();
        assert!(ok.success);

        // The code is single-use: it was deleted after the reset.
        let err = auth
            .reset_password("alice@example.com", &code, "secret3")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetCode));

        // Old password is out, new one is in.
        assert!(auth.login("alice@example.com", "secret1").await.is_err());
        auth.login("alice@example.com", "secret2").await.unwrap();

        drop(db);
    }

    #[tokio::test]
    async fn expired_code_is_reported_as_expired() {
        let (auth, db, _n) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();

        let mut reset = ResetCode::new("alice@example.com", "654321".into());
        reset.expires_at = Utc::now() - chrono::Duration::minutes(1);
        db.insert_reset_code(&reset).await.unwrap();

        let err = auth
            .reset_password("alice@example.com", "654321", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ResetCodeExpired));
    }

    #[tokio::test]
    async fn new_request_invalidates_previous_code() {
        let (auth, db, _n) = service().await;
        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();

        let first = ResetCode::new("alice@example.com", "111111".into());
        db.insert_reset_code(&first).await.unwrap();

        auth.forgot_password("alice@example.com").await.unwrap();

        let err = auth
            .reset_password("alice@example.com", "111111", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetCode));
    }

    #[tokio::test]
    async fn reset_delivery_failure_still_returns_generic_body() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let notifier = Arc::new(RecordingNotifier::new(false));
        let jwt = JwtConfig {
            secret: SecretString::from("unit-test-secret"),
            expiry_days: 7,
        };
        let auth = AuthService::new(db, notifier, jwt);

        auth.signup("Alice", "alice@example.com", "secret1", "555-0100")
            .await
            .unwrap();
        let response = auth.forgot_password("alice@example.com").await.unwrap();
        assert!(response.success);
        assert_eq!(response.message, FORGOT_PASSWORD_MESSAGE);
    }

    #[test]
    fn reset_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
