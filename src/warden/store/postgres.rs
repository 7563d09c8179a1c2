//! Postgres store (see `sql/schema.sql`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{SessionStore, UserStore};
use crate::warden::models::{CreateOutcome, NewUser, Role, SessionRecord, SessionWrite, User};
use crate::warden::utils::is_unique_violation;

const USER_COLUMNS: &str = "id, email, password_hash, roles, is_blocked, provider, \
     reset_token_hash, reset_token_expires_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let roles: Vec<String> = row.try_get("roles")?;
    let roles = roles
        .iter()
        .map(|role| role.parse::<Role>().map_err(|err| anyhow!(err)))
        .collect::<Result<Vec<_>>>()?;
    let provider: String = row.try_get("provider")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        roles,
        blocked: row.try_get("is_blocked")?,
        provider: provider.parse().map_err(|err: String| anyhow!(err))?,
        reset_token_hash: row.try_get("reset_token_hash")?,
        reset_token_expires_at: row.try_get("reset_token_expires_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<SessionRecord> {
    Ok(SessionRecord {
        token_hash: row.try_get("token_hash")?,
        user_id: row.try_get("user_id")?,
        user_agent: row.try_get("user_agent")?,
        expires_at: row.try_get("expires_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id_or_email: &str) -> Result<Option<User>> {
        // Ids are matched as uuids so a non-uuid key never hits the id index.
        let result = if let Ok(id) = Uuid::parse_str(id_or_email) {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
            sqlx::query(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .instrument(db_span("SELECT", &query))
                .await
        } else {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
            sqlx::query(&query)
                .bind(id_or_email)
                .fetch_optional(&self.pool)
                .instrument(db_span("SELECT", &query))
                .await
        };
        let row = result.context("failed to lookup user")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome> {
        let query = format!(
            "INSERT INTO users (id, email, password_hash, roles, provider) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let roles: Vec<String> = user.roles.iter().map(|role| role.as_str().to_string()).collect();
        let row = sqlx::query(&query)
            .bind(Uuid::now_v7())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(roles)
            .bind(user.provider.as_str())
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn set_reset_ticket(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let query = r"
            UPDATE users
            SET reset_token_hash = $2,
                reset_token_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to store reset ticket")?;
        Ok(())
    }

    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token_hash = $1 AND reset_token_expires_at > $2 LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup reset ticket")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // Conditional on a live ticket so two concurrent resets cannot both win.
        let query = r"
            UPDATE users
            SET password_hash = $3,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND reset_token_hash = $2
              AND reset_token_expires_at > $4
        ";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(password_hash)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to reset password")?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn upsert_session(
        &self,
        user_id: Uuid,
        user_agent: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<SessionWrite> {
        let query = r"
            INSERT INTO refresh_sessions (token_hash, user_id, user_agent, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, user_agent)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          expires_at = EXCLUDED.expires_at,
                          rotated_at = NOW()
        ";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(user_agent)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(SessionWrite::Stored),
            Err(err) if is_unique_violation(&err) => Ok(SessionWrite::TokenCollision),
            Err(err) => Err(err).context("failed to upsert refresh session"),
        }
    }

    async fn take_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        // DELETE .. RETURNING is the race arbiter: only one caller gets the row.
        let query = r"
            DELETE FROM refresh_sessions
            WHERE token_hash = $1
            RETURNING token_hash, user_id, user_agent, expires_at
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to take refresh session")?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT token_hash, user_id, user_agent, expires_at
            FROM refresh_sessions
            WHERE token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup refresh session")?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM refresh_sessions WHERE token_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete refresh session")?;
        Ok(())
    }
}
