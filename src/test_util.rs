use std::sync::Arc;

use axum_test::{TestResponse, TestServer};
use serde_json::json;
use sqlx::PgPool;

use crate::app::build_app;
use crate::auth::password::hash_password;
use crate::mailer::RecordingMailer;
use crate::state::AppState;
use crate::users::repo::{NewUser, Role, User};

pub fn server(pool: PgPool) -> (TestServer, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let server = server_with_mailer(pool, mailer.clone());
    (server, mailer)
}

pub fn server_with_mailer(pool: PgPool, mailer: Arc<RecordingMailer>) -> TestServer {
    let state = AppState::fake(pool, mailer);
    TestServer::new(build_app(state)).expect("test server")
}

/// The `name=value` pair from the response's Set-Cookie header, ready to be
/// sent back in a Cookie header.
pub fn session_cookie_pair(response: &TestResponse) -> String {
    response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

/// Register a patient through the API and return their session cookie pair.
pub async fn register_patient(
    server: &TestServer,
    external_id: &str,
    email: &str,
    password: &str,
) -> String {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "external_id": external_id,
            "full_name": "Test Patient",
            "email": email,
            "password": password,
            "role": "patient",
            "age": 30,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    session_cookie_pair(&response)
}

/// Seed an admin account directly in the store (admins cannot self-register)
/// and log in through the API.
pub async fn admin_cookie(server: &TestServer, pool: &PgPool) -> String {
    User::create(
        pool,
        &NewUser {
            external_id: "ADM001".into(),
            full_name: "Administrator".into(),
            email: "adm001@x.com".into(),
            password_hash: hash_password("admin-pw-1").expect("hash"),
            role: Role::Admin,
            age: None,
            specialty: None,
            license_number: None,
        },
    )
    .await
    .expect("seed admin");

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "external_id": "ADM001", "password": "admin-pw-1" }))
        .await;
    login.assert_status_ok();
    session_cookie_pair(&login)
}
