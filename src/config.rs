use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL used when building password-reset links.
    pub base_url: String,
    pub session: SessionConfig,
    pub reset_token_ttl_hours: i64,
    /// Bootstrap admin account; not created when the password is unset.
    pub admin_external_id: String,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "cliniq_session".into()),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true")
                .unwrap_or(false),
            ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24 * 7),
        };
        let reset_token_ttl_hours = std::env::var("RESET_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24);
        Ok(Self {
            database_url,
            base_url,
            session,
            reset_token_ttl_hours,
            admin_external_id: std::env::var("ADMIN_EXTERNAL_ID")
                .unwrap_or_else(|_| "ADMIN001".into()),
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@cliniq.local".into()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok(),
        })
    }
}
