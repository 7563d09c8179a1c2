//! Credential hasher.
//!
//! bcrypt with a per-call random salt. Hashing is CPU bound, so the async
//! wrappers move the work onto the blocking pool.

use anyhow::{Context, Result};

pub fn hash_password(plaintext: &str, cost: u32) -> Result<String> {
    bcrypt::hash(plaintext, cost).context("failed to hash password")
}

/// Mismatch is `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(plaintext, hash).context("stored password hash is malformed")
}

pub async fn hash_password_blocking(plaintext: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext, cost))
        .await
        .context("password hashing task failed")?
}

pub async fn verify_password_blocking(plaintext: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash))
        .await
        .context("password verification task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("secret1", COST)?;
        assert!(verify_password("secret1", &hash)?);
        assert!(!verify_password("secret2", &hash)?);
        Ok(())
    }

    #[test]
    fn salts_differ_per_call() -> Result<()> {
        let first = hash_password("secret1", COST)?;
        let second = hash_password("secret1", COST)?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("secret1", "not-a-bcrypt-hash").is_err());
    }

    #[tokio::test]
    async fn blocking_wrappers_agree() -> Result<()> {
        let hash = hash_password_blocking("secret1".to_string(), COST).await?;
        assert!(verify_password_blocking("secret1".to_string(), hash.clone()).await?);
        assert!(!verify_password_blocking("nope".to_string(), hash).await?);
        Ok(())
    }
}
