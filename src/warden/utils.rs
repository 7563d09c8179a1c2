//! Small helpers for token generation, hashing and email handling.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn random_bytes() -> Result<[u8; 32]> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to read from the OS random source")?;
    Ok(bytes)
}

/// Create a new refresh token. The raw value is only returned to the caller;
/// the store keeps a hash.
pub(crate) fn generate_refresh_token() -> Result<String> {
    Ok(Base64UrlUnpadded::encode_string(&random_bytes()?))
}

/// Hash a refresh token so raw values never touch the store.
pub(crate) fn hash_refresh_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

/// Create a 256-bit reset token, hex encoded for use in links.
pub(crate) fn generate_reset_token() -> Result<String> {
    Ok(hex::encode(random_bytes()?))
}

/// Hex SHA-256 of a presented reset token; the only form that is stored.
pub(crate) fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

/// Build the frontend link included in reset emails.
pub(crate) fn build_reset_url(frontend_base_url: &str, token: &str) -> Result<String> {
    let base = frontend_base_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/reset-password"))
        .with_context(|| format!("invalid frontend base URL: {frontend_base_url}"))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
