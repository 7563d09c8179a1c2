use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::warden::cookie::{clear_refresh_cookie, refresh_cookie};
use crate::warden::{AuthError, AuthService, IdentityProvider, Role, Tokens};

/// Token pair plus the `Set-Cookie` value a transport would emit.
fn tokens_body(tokens: &Tokens, secure: bool) -> Value {
    json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh.token,
        "refresh_expires_at": tokens.refresh.expires_at,
        "set_cookie": refresh_cookie(&tokens.refresh, secure),
    })
}

pub async fn login(
    service: &AuthService,
    email: &str,
    password: &SecretString,
    device: &str,
    secure: bool,
) -> Result<Value, AuthError> {
    let tokens = service
        .login(email, password.expose_secret(), device)
        .await?;
    Ok(tokens_body(&tokens, secure))
}

pub async fn refresh(
    service: &AuthService,
    token: &str,
    device: &str,
    secure: bool,
) -> Result<Value, AuthError> {
    let tokens = service.refresh(token, device).await?;
    Ok(tokens_body(&tokens, secure))
}

pub async fn logout(service: &AuthService, token: &str, secure: bool) -> Result<Value, AuthError> {
    service.logout(token).await?;
    Ok(json!({
        "status": "ok",
        "set_cookie": clear_refresh_cookie(secure),
    }))
}

pub async fn provider_login(
    service: &AuthService,
    provider: IdentityProvider,
    token: &SecretString,
    device: &str,
    secure: bool,
) -> Result<Value, AuthError> {
    let tokens = service
        .provider_auth(provider, token.expose_secret(), device)
        .await?;
    Ok(tokens_body(&tokens, secure))
}

pub async fn verify(
    service: &AuthService,
    token: &SecretString,
    required_roles: &[Role],
) -> Result<Value, AuthError> {
    let principal = service.authenticate(token.expose_secret()).await?;
    principal.require_any(required_roles)?;
    Ok(json!({
        "user_id": principal.user_id,
        "email": principal.email,
        "roles": principal.roles,
    }))
}
