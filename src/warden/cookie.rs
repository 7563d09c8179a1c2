//! Refresh cookie descriptor for the transport layer.

use chrono::{DateTime, Utc};

use super::models::RefreshSession;

pub const REFRESH_COOKIE_NAME: &str = "refreshtoken";

/// Build the `Set-Cookie` value carrying a refresh session.
#[must_use]
pub fn refresh_cookie(session: &RefreshSession, secure: bool) -> String {
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Expires={}",
        session.token,
        http_date(session.expires_at)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the `Set-Cookie` value that clears the refresh cookie on logout.
#[must_use]
pub fn clear_refresh_cookie(secure: bool) -> String {
    let mut cookie =
        format!("{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Find the refresh token in a `Cookie` header value.
#[must_use]
pub fn extract_refresh_token(cookie_header: &str) -> Option<String> {
    for pair in cookie_header.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let Some(val) = parts.next() else {
            continue;
        };
        if key == REFRESH_COOKIE_NAME && !val.trim().is_empty() {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
