use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::users::repo::Role;

use super::token;

/// Server-side session record. The client only ever holds the opaque token,
/// carried in a cookie.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// The two facts a resolved session supplies to handlers. The role comes
/// from the user record at resolution time, not the login-time copy, so a
/// revoked role takes effect on the next request.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Session {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        role: Role,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> sqlx::Result<Session> {
        let token = token::generate();
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, role, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING token, user_id, role, created_at, expires_at
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(role)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(db)
        .await
    }

    /// Resolve a session token. Missing, expired and inactive-user sessions
    /// all come back as `None`, never as an error.
    pub async fn find_valid(
        db: &PgPool,
        token: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<SessionIdentity>> {
        sqlx::query_as::<_, SessionIdentity>(
            r#"
            SELECT s.user_id, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > $2 AND u.active
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    /// Destroy a session. Idempotent: deleting an absent token is not an
    /// error.
    pub async fn delete(db: &PgPool, token: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }
}

pub fn session_cookie(config: &SessionConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        token,
        config.ttl_hours * 3600
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(config: &SessionConfig) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    )
}

/// Pull the session token out of a raw `Cookie` header value.
pub fn token_from_cookie_header<'a>(header: &'a str, cookie_name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value)
}
