use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::cli::actions::{account, session, Action};
use crate::cli::globals::GlobalArgs;
use crate::warden::{
    AuthError, AuthService, CachedUserStore, EmailSender, HttpIdentityExchange, LogEmailSender,
    PgStore, ProviderEndpoints, SmtpEmailSender, UserStore,
};

/// Single dispatch point for all CLI actions.
pub(super) async fn execute(
    action: Action,
    globals: &GlobalArgs,
) -> Result<serde_json::Value, AuthError> {
    // Cheap argument checks before touching the database.
    if let Action::Register {
        password,
        password_repeat,
        ..
    } = &action
    {
        account::confirm_password(password, password_repeat)?;
    }

    let service = connect(globals).await?;
    let secure = service.config().secure_cookies();

    match action {
        Action::Register {
            email, password, ..
        } => account::register(&service, &email, &password).await,
        Action::Login {
            email,
            password,
            device,
        } => session::login(&service, &email, &password, &device, secure).await,
        Action::Refresh { token, device } => {
            session::refresh(&service, &token, &device, secure).await
        }
        Action::Logout { token } => session::logout(&service, &token, secure).await,
        Action::ProviderLogin {
            provider,
            token,
            device,
        } => session::provider_login(&service, provider, &token, &device, secure).await,
        Action::ResetRequest { email } => account::reset_request(&service, &email).await,
        Action::ResetPassword { token, password } => {
            account::reset_password(&service, &token, &password).await
        }
        Action::Verify {
            token,
            required_roles,
        } => session::verify(&service, &token, &required_roles).await,
    }
}

async fn connect(globals: &GlobalArgs) -> anyhow::Result<AuthService> {
    let config = globals.auth_config();

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&globals.dsn)
        .await
        .context("Failed to connect to database")?;
    debug!("database pool ready");

    let store = Arc::new(PgStore::new(pool));
    let cache_ttl = u64::try_from(config.user_cache_ttl_seconds()).unwrap_or(0);
    let users: Arc<dyn UserStore> = if cache_ttl == 0 {
        store.clone()
    } else {
        Arc::new(CachedUserStore::new(store.clone(), Duration::from_secs(cache_ttl)))
    };

    let endpoints =
        ProviderEndpoints::new(&globals.google_userinfo_url, &globals.yandex_userinfo_url)
            .context("invalid identity provider endpoint")?;
    let identity = Arc::new(HttpIdentityExchange::new(
        endpoints,
        Duration::from_secs(config.provider_timeout_seconds()),
    )?);

    let mailer: Arc<dyn EmailSender> = match &globals.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)?),
        None => {
            warn!("no SMTP relay configured, reset emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    AuthService::new(config, users, store, &globals.jwt_secret, identity, mailer)
}
