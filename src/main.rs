use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use vasop::app::{self, AppState};
use vasop::auth::AuthService;
use vasop::config::AppConfig;
use vasop::notify;
use vasop::onboarding::OnboardingManager;
use vasop::speech::SpeechService;
use vasop::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    let db: Arc<dyn Database> = match LibSqlBackend::new_local(&config.db_path).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::error!(error = %e, path = %config.db_path, "Failed to open database");
            std::process::exit(1);
        }
    };

    let notifier = notify::from_config(&config.notify);
    let auth = Arc::new(AuthService::new(
        db.clone(),
        notifier.clone(),
        config.jwt.clone(),
    ));
    let onboarding = Arc::new(OnboardingManager::new(
        db.clone(),
        notifier,
        config.notify.admin_email.clone(),
    ));
    let speech = Arc::new(SpeechService::new(config.speech.clone()));

    // Background sweep keeps the reset-code table from accumulating
    // expired rows.
    let sweep_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match sweep_db.delete_expired_reset_codes().await {
                Ok(0) => {}
                Ok(count) => tracing::debug!(count, "Purged expired reset codes"),
                Err(e) => tracing::warn!(error = %e, "Reset code sweep failed"),
            }
        }
    });

    let state = AppState {
        auth,
        onboarding,
        speech,
    };
    let router = app::router(state, &config.frontend_origin);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "vasop listening");

    if let Err(e) = axum::serve(listener, router).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
