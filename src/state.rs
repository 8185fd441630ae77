use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self {
            db,
            config,
            mailer: Arc::new(LogMailer),
        })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, config, mailer }
    }
}

#[cfg(test)]
impl AppState {
    /// State over a test pool with fixed config and the given mailer.
    pub fn fake(db: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        use crate::config::SessionConfig;

        let config = Arc::new(AppConfig {
            database_url: String::new(),
            base_url: "http://localhost:8080".into(),
            session: SessionConfig {
                cookie_name: "cliniq_session".into(),
                cookie_secure: false,
                ttl_hours: 24 * 7,
            },
            reset_token_ttl_hours: 24,
            admin_external_id: "ADMIN001".into(),
            admin_email: "admin@cliniq.local".into(),
            admin_password: None,
        });
        Self { db, config, mailer }
    }
}
