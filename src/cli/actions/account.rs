use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::warden::{AuthError, AuthService, UserView};

/// Registration confirmation is checked here, before the core is involved.
pub fn confirm_password(password: &SecretString, repeat: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret() == repeat.expose_secret() {
        Ok(())
    } else {
        Err(AuthError::BadRequest("passwords do not match".to_string()))
    }
}

pub async fn register(
    service: &AuthService,
    email: &str,
    password: &SecretString,
) -> Result<Value, AuthError> {
    let user = service.register(email, password.expose_secret()).await?;
    Ok(json!({ "user": UserView::from(&user) }))
}

pub async fn reset_request(service: &AuthService, email: &str) -> Result<Value, AuthError> {
    service.request_reset(email).await?;
    Ok(json!({ "status": "ok" }))
}

pub async fn reset_password(
    service: &AuthService,
    token: &SecretString,
    password: &SecretString,
) -> Result<Value, AuthError> {
    service
        .reset_password(token.expose_secret(), password.expose_secret())
        .await?;
    Ok(json!({ "status": "ok" }))
}
