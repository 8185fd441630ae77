use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser, auth::handlers::is_valid_email, error::ApiError, state::AppState,
};

use super::dto::{RoleFilter, UpdateUserRequest, UserListResponse, UserSummary};
use super::repo::{User, UserUpdate};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", put(update_user))
        .route("/admin/users/:id/deactivate", post(deactivate_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(filter): Query<RoleFilter>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = User::list_active(&state.db, filter.role).await?;
    let stats = User::stats(&state.db).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserSummary::from).collect(),
        stats,
    }))
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !User::deactivate(&state.db, id).await? {
        return Err(ApiError::NotFound("user"));
    }
    info!(user_id = %id, admin_id = %admin.user_id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    let updated = User::update_profile(
        &state.db,
        id,
        &UserUpdate {
            full_name: payload.full_name.trim().to_string(),
            email: payload.email,
            age: payload.age,
            specialty: payload.specialty,
            license_number: payload.license_number,
        },
    )
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    info!(user_id = %id, admin_id = %admin.user_id, "user updated");
    Ok(Json(UserSummary::from(updated)))
}

#[cfg(test)]
mod tests {
    use crate::test_util::{admin_cookie, register_patient, server, session_cookie_pair};
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};
    use sqlx::PgPool;

    #[sqlx::test]
    async fn admin_routes_reject_missing_sessions(pool: PgPool) {
        let (server, _mailer) = server(pool);
        server
            .get("/api/v1/admin/users")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn forbidden_outcome_preserves_the_session(pool: PgPool) {
        let (server, _mailer) = server(pool);
        let cookie = register_patient(&server, "PAC100", "p100@x.com", "patient-pw-1").await;

        // a patient session on an admin route is forbidden
        server
            .get("/api/v1/admin/users")
            .add_header(header::COOKIE, cookie.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        // and the same session still works on authenticated-only routes
        server
            .get("/api/v1/me")
            .add_header(header::COOKIE, cookie)
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    async fn listing_filters_and_counts(pool: PgPool) {
        let (server, _mailer) = server(pool.clone());
        let admin = admin_cookie(&server, &pool).await;

        register_patient(&server, "PAC101", "p101@x.com", "patient-pw-1").await;
        let doctor = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "external_id": "DOC101",
                "full_name": "Dr. Lopez",
                "email": "d101@x.com",
                "password": "doctor-pw-1",
                "role": "doctor",
                "specialty": "dermatology",
                "license_number": "MED-4411",
            }))
            .await;
        doctor.assert_status(StatusCode::CREATED);

        let listing = server
            .get("/api/v1/admin/users")
            .add_header(header::COOKIE, admin.clone())
            .await;
        listing.assert_status_ok();
        let body: Value = listing.json();
        assert_eq!(body["stats"]["total"], 3);
        assert_eq!(body["stats"]["doctors"], 1);
        assert_eq!(body["stats"]["patients"], 1);
        assert_eq!(body["users"].as_array().expect("users array").len(), 3);

        let doctors_only = server
            .get("/api/v1/admin/users?role=doctor")
            .add_header(header::COOKIE, admin)
            .await;
        doctors_only.assert_status_ok();
        let body: Value = doctors_only.json();
        let users = body["users"].as_array().expect("users array");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["external_id"], "DOC101");
        assert_eq!(users[0]["specialty"], "dermatology");
    }

    #[sqlx::test]
    async fn deactivation_hides_and_locks_out_the_user(pool: PgPool) {
        let (server, _mailer) = server(pool.clone());
        let admin = admin_cookie(&server, &pool).await;

        let registered = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "external_id": "PAC102",
                "full_name": "Paciente",
                "email": "p102@x.com",
                "password": "patient-pw-1",
                "role": "patient",
            }))
            .await;
        registered.assert_status(StatusCode::CREATED);
        let body: Value = registered.json();
        let id = body["user"]["id"].as_str().expect("user id").to_string();
        let patient_cookie = session_cookie_pair(&registered);

        server
            .post(&format!("/api/v1/admin/users/{id}/deactivate"))
            .add_header(header::COOKIE, admin.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        // gone from the listing
        let listing = server
            .get("/api/v1/admin/users?role=patient")
            .add_header(header::COOKIE, admin.clone())
            .await;
        let listing_body: Value = listing.json();
        assert!(listing_body["users"].as_array().expect("users").is_empty());

        // the live session dies with the account, and login is refused
        server
            .get("/api/v1/me")
            .add_header(header::COOKIE, patient_cookie)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/api/v1/auth/login")
            .json(&json!({ "external_id": "PAC102", "password": "patient-pw-1" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // deactivating an unknown id is a 404
        server
            .post(&format!(
                "/api/v1/admin/users/{}/deactivate",
                uuid::Uuid::new_v4()
            ))
            .add_header(header::COOKIE, admin)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn updates_edit_fields_and_guard_email_uniqueness(pool: PgPool) {
        let (server, _mailer) = server(pool.clone());
        let admin = admin_cookie(&server, &pool).await;

        register_patient(&server, "PAC103", "taken@x.com", "patient-pw-1").await;
        let registered = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "external_id": "DOC103",
                "full_name": "Dr. Old Name",
                "email": "d103@x.com",
                "password": "doctor-pw-1",
                "role": "doctor",
                "specialty": "oncology",
            }))
            .await;
        let body: Value = registered.json();
        let id = body["user"]["id"].as_str().expect("user id").to_string();

        let updated = server
            .put(&format!("/api/v1/admin/users/{id}"))
            .add_header(header::COOKIE, admin.clone())
            .json(&json!({
                "full_name": "Dr. New Name",
                "email": "renamed103@x.com",
                "license_number": "MED-9000",
            }))
            .await;
        updated.assert_status_ok();
        let body: Value = updated.json();
        assert_eq!(body["full_name"], "Dr. New Name");
        assert_eq!(body["email"], "renamed103@x.com");
        // omitted fields keep their stored value
        assert_eq!(body["specialty"], "oncology");
        assert_eq!(body["license_number"], "MED-9000");

        let conflict = server
            .put(&format!("/api/v1/admin/users/{id}"))
            .add_header(header::COOKIE, admin)
            .json(&json!({
                "full_name": "Dr. New Name",
                "email": "taken@x.com",
            }))
            .await;
        conflict.assert_status(StatusCode::BAD_REQUEST);
    }
}
