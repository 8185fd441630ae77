use crate::auth::password::hash_password;
use crate::config::AppConfig;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::UserStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
    pub active: bool,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser {
    pub external_id: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

/// Fields an administrator may edit. `None` leaves the stored value alone.
pub struct UserUpdate {
    pub full_name: String,
    pub email: String,
    pub age: Option<i32>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

fn map_unique_violation(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505") {
            return match db_err.constraint() {
                Some(c) if c.contains("email") => {
                    ApiError::Validation("email already registered".into())
                }
                Some(c) if c.contains("external_id") => {
                    ApiError::Validation("external id already in use".into())
                }
                _ => ApiError::Validation("duplicate record".into()),
            };
        }
    }
    ApiError::Store(e)
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, full_name, email, password_hash, role, age,
                   specialty, license_number, active, reset_token,
                   reset_token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, full_name, email, password_hash, role, age,
                   specialty, license_number, active, reset_token,
                   reset_token_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Login lookup; the external id is the credential identifier, not email.
    pub async fn find_by_external_id(db: &PgPool, external_id: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, full_name, email, password_hash, role, age,
                   specialty, license_number, active, reset_token,
                   reset_token_expires_at, created_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(db)
        .await
    }

    /// Insert a new user. The unique constraints on email and external_id are
    /// the backstop behind the handler-level pre-checks; violations come back
    /// as validation errors.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, full_name, email, password_hash,
                               role, age, specialty, license_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, external_id, full_name, email, password_hash, role, age,
                      specialty, license_number, active, reset_token,
                      reset_token_expires_at, created_at
            "#,
        )
        .bind(&new.external_id)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(new.age)
        .bind(&new.specialty)
        .bind(&new.license_number)
        .fetch_one(db)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Resolve a reset token without consuming it. An expired token is
    /// cleared here (lazily, both columns together) and reported invalid.
    pub async fn validate_reset_token(
        db: &PgPool,
        token: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, full_name, email, password_hash, role, age,
                   specialty, license_number, active, reset_token,
                   reset_token_expires_at, created_at
            FROM users
            WHERE reset_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;

        match user {
            Some(u) if u.reset_token_expires_at.map(|e| now < e).unwrap_or(false) => Ok(Some(u)),
            Some(u) => {
                Self::clear_reset_token(db, u.id).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Replace the password and clear the token in one conditioned statement,
    /// so two racing consumers of the same token cannot both succeed.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL
            WHERE reset_token = $1 AND reset_token_expires_at > $3
            RETURNING id, external_id, full_name, email, password_hash, role, age,
                      specialty, license_number, active, reset_token,
                      reset_token_expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(db)
        .await
    }

    /// Administrative listing: active users only, newest first.
    pub async fn list_active(db: &PgPool, role: Option<Role>) -> sqlx::Result<Vec<User>> {
        match role {
            Some(role) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, external_id, full_name, email, password_hash, role, age,
                           specialty, license_number, active, reset_token,
                           reset_token_expires_at, created_at
                    FROM users
                    WHERE active AND role = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(role)
                .fetch_all(db)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, external_id, full_name, email, password_hash, role, age,
                           specialty, license_number, active, reset_token,
                           reset_token_expires_at, created_at
                    FROM users
                    WHERE active
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(db)
                .await
            }
        }
    }

    pub async fn stats(db: &PgPool) -> sqlx::Result<UserStats> {
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE active")
                .fetch_one(db)
                .await?;
        let doctors = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE active AND role = 'doctor'",
        )
        .fetch_one(db)
        .await?;
        let patients = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE active AND role = 'patient'",
        )
        .fetch_one(db)
        .await?;
        Ok(UserStats {
            total,
            doctors,
            patients,
        })
    }

    /// Soft delete. Returns false when no such user exists.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &UserUpdate,
    ) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $2,
                email = $3,
                age = COALESCE($4, age),
                specialty = COALESCE($5, specialty),
                license_number = COALESCE($6, license_number)
            WHERE id = $1
            RETURNING id, external_id, full_name, email, password_hash, role, age,
                      specialty, license_number, active, reset_token,
                      reset_token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(&changes.full_name)
        .bind(&changes.email)
        .bind(changes.age)
        .bind(&changes.specialty)
        .bind(&changes.license_number)
        .fetch_optional(db)
        .await
        .map_err(map_unique_violation)
    }
}

/// Create the bootstrap admin account on first start. Skipped when no admin
/// password is configured or an admin already exists.
pub async fn ensure_default_admin(db: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let Some(password) = config.admin_password.as_deref() else {
        return Ok(());
    };
    let admins =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(db)
            .await?;
    if admins > 0 {
        return Ok(());
    }
    let user = User::create(
        db,
        &NewUser {
            external_id: config.admin_external_id.clone(),
            full_name: "Administrator".into(),
            email: config.admin_email.clone(),
            password_hash: hash_password(password)?,
            role: Role::Admin,
            age: None,
            specialty: None,
            license_number: None,
        },
    )
    .await?;
    info!(user_id = %user.id, external_id = %user.external_id, "default admin created");
    Ok(())
}
