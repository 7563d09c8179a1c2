//! # Warden (credential and session core)
//!
//! `warden` owns the token and session state machine of a multi-provider web
//! service: local email/password login, federated login through external
//! identity providers, refresh-token rotation, and self-service password reset.
//!
//! ## Credentials
//!
//! - **Access tokens** are short-lived HS256 JWTs carrying `{id, email, roles}`.
//!   They are stateless and cannot be revoked before they expire.
//! - **Refresh sessions** are opaque random strings, stored only as SHA-256
//!   hashes, one per `(user, device)` pair. Every successful refresh consumes the
//!   presented value; a second presentation of the same value is rejected.
//! - **Reset tickets** are single-use, time-boxed tokens whose hash lives on the
//!   user record until the password is changed.
//!
//! The durable store is the only source of truth and the only synchronization
//! point. Transport (routing, cookie plumbing) lives outside this crate; the
//! [`warden::cookie`] helpers describe what the transport should emit.

pub mod cli;
pub mod warden;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
