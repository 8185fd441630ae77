use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod mailer;
mod state;
#[cfg(test)]
mod test_util;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cliniq=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run migrations")?;

    users::repo::ensure_default_admin(&app_state.db, &app_state.config)
        .await
        .context("bootstrap admin account")?;

    let app = app::build_app(app_state);
    app::serve(app).await
}
