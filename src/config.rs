//! Process-wide configuration, built once from the environment at startup.
//!
//! Provider clients (notifier, speech) receive their credentials from here —
//! nothing outside this module reads environment variables.

use secrecy::SecretString;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Allowed CORS origin (the frontend), trailing slash stripped.
    pub frontend_origin: String,
    pub jwt: JwtConfig,
    pub notify: NotifyConfig,
    pub speech: SpeechConfig,
}

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 signing secret.
    pub secret: SecretString,
    /// Token lifetime in days.
    pub expiry_days: i64,
}

/// Notification backend credentials. Which backend is active is decided by
/// which set of credentials is present (Mailchimp wins when both are set).
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub mailchimp_api_key: Option<SecretString>,
    pub mailchimp_server_prefix: Option<String>,
    pub mailchimp_audience_id: Option<String>,
    pub graph_tenant_id: Option<String>,
    pub graph_client_id: Option<String>,
    pub graph_client_secret: Option<SecretString>,
    /// Mailbox Graph sends from.
    pub graph_sender: Option<String>,
    /// Recipient for admin submission notifications.
    pub admin_email: String,
}

/// Speech synthesis + moderation provider keys.
#[derive(Debug, Clone, Default)]
pub struct SpeechConfig {
    pub openai_api_key: Option<SecretString>,
    pub profanity_api_key: Option<SecretString>,
}

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_PATH: &str = "./data/vasop.db";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_ADMIN_EMAIL: &str = "admin@sherpaprompt.com";
const DEFAULT_JWT_EXPIRY_DAYS: i64 = 7;

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_secret(key: &str) -> Option<SecretString> {
    env_opt(key).map(SecretString::from)
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty. Everything else has a
    /// default or makes the corresponding integration report itself disabled.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let port: u16 = env_opt("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = env_opt("VASOP_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let frontend_origin = env_opt("FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let expiry_days: i64 = env_opt("JWT_EXPIRY_DAYS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRY_DAYS);

        Self {
            port,
            db_path,
            frontend_origin,
            jwt: JwtConfig {
                secret: SecretString::from(secret),
                expiry_days,
            },
            notify: NotifyConfig {
                mailchimp_api_key: env_secret("MAILCHIMP_API_KEY"),
                mailchimp_server_prefix: env_opt("MAILCHIMP_SERVER_PREFIX"),
                mailchimp_audience_id: env_opt("MAILCHIMP_AUDIENCE_ID"),
                graph_tenant_id: env_opt("GRAPH_TENANT_ID"),
                graph_client_id: env_opt("GRAPH_CLIENT_ID"),
                graph_client_secret: env_secret("GRAPH_CLIENT_SECRET"),
                graph_sender: env_opt("GRAPH_SENDER"),
                admin_email: env_opt("ADMIN_EMAIL")
                    .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            },
            speech: SpeechConfig {
                openai_api_key: env_secret("OPENAI_API_KEY"),
                profanity_api_key: env_secret("PROFANITY_API_KEY"),
            },
        }
    }
}

impl NotifyConfig {
    /// Whether the Mailchimp backend has everything it needs.
    pub fn mailchimp_ready(&self) -> bool {
        self.mailchimp_api_key.is_some()
            && self.mailchimp_server_prefix.is_some()
            && self.mailchimp_audience_id.is_some()
    }

    /// Whether the Microsoft Graph backend has everything it needs.
    pub fn graph_ready(&self) -> bool {
        self.graph_tenant_id.is_some()
            && self.graph_client_id.is_some()
            && self.graph_client_secret.is_some()
            && self.graph_sender.is_some()
    }
}
