use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
        },
        extractors::AuthedUser,
        password::{hash_password, verify_password},
        session::{clear_session_cookie, session_cookie, token_from_cookie_header, Session},
        token,
    },
    error::ApiError,
    state::AppState,
    users::repo::{NewUser, Role, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset/:token", get(check_reset_token))
        .route("/auth/password/reset", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.external_id = payload.external_id.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("password too short".into()));
    }
    if payload.external_id.is_empty() {
        return Err(ApiError::Validation("external id must not be empty".into()));
    }
    if payload.full_name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }

    // only patients and doctors self-register; admins are bootstrapped
    let (age, specialty, license_number) = match payload.role {
        Role::Patient => (payload.age, None, None),
        Role::Doctor => (None, payload.specialty.take(), payload.license_number.take()),
        Role::Admin => {
            return Err(ApiError::Validation("role must be patient or doctor".into()));
        }
    };

    // pre-checks; the store's unique constraints are the backstop
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Validation("email already registered".into()));
    }
    if User::find_by_external_id(&state.db, &payload.external_id)
        .await?
        .is_some()
    {
        warn!(external_id = %payload.external_id, "external id already in use");
        return Err(ApiError::Validation("external id already in use".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            external_id: payload.external_id,
            full_name: payload.full_name.trim().to_string(),
            email: payload.email,
            password_hash: hash,
            role: payload.role,
            age,
            specialty,
            license_number,
        },
    )
    .await?;

    // registration logs the user straight in
    let now = OffsetDateTime::now_utc();
    let session = Session::create(
        &state.db,
        user.id,
        user.role,
        now,
        Duration::hours(state.config.session.ttl_hours),
    )
    .await?;

    info!(user_id = %user.id, external_id = %user.external_id, "user registered");
    Ok((
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.session, &session.token),
        )],
        Json(AuthResponse {
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_external_id(&state.db, payload.external_id.trim())
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if !user.active {
        warn!(user_id = %user.id, "login attempt on deactivated account");
        return Err(ApiError::BadCredentials);
    }
    if !verify_password(&payload.password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::BadCredentials);
    }

    let now = OffsetDateTime::now_utc();
    let session = Session::create(
        &state.db,
        user.id,
        user.role,
        now,
        Duration::hours(state.config.session.ttl_hours),
    )
    .await?;

    info!(user_id = %user.id, external_id = %user.external_id, "user logged in");
    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&state.config.session, &session.token),
        )],
        Json(AuthResponse {
            user: PublicUser::from(user),
        }),
    ))
}

/// Destroys the session named by the cookie, if any. Logging out without a
/// session is not an error.
#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| token_from_cookie_header(h, &state.config.session.cookie_name))
    {
        Session::delete(&state.db, token).await?;
    }
    Ok((
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.session),
        )],
        Json(MessageResponse {
            message: "logged out".into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthedUser(identity): AuthedUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, identity.user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::Validation("no account with that email".into()))?;

    let reset = token::generate();
    let now = OffsetDateTime::now_utc();
    let expires_at = now + Duration::hours(state.config.reset_token_ttl_hours);
    User::set_reset_token(&state.db, user.id, &reset, expires_at).await?;

    // the stored token is the source of truth; a failed send does not undo it
    let link = format!("{}/reset_password/{}", state.config.base_url, reset);
    let body = format!(
        "You requested a password reset. Follow this link to choose a new password: {link}\n\
         The link expires in {} hours. If you did not request this, ignore this message.",
        state.config.reset_token_ttl_hours
    );
    let email_sent = match state
        .mailer
        .send(&user.email, "Password recovery", &body)
        .await
    {
        Ok(()) => {
            info!(user_id = %user.id, "password recovery mail dispatched");
            true
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "password recovery mail failed");
            false
        }
    };

    let message = if email_sent {
        "a recovery link has been sent to your email".into()
    } else {
        "the recovery link could not be emailed; try again or contact support".into()
    };
    Ok(Json(ForgotPasswordResponse {
        message,
        email_sent,
    }))
}

/// Validation probe for a reset link, without consuming the token.
#[instrument(skip_all)]
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(reset): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    User::validate_reset_token(&state.db, &reset, OffsetDateTime::now_utc())
        .await?
        .ok_or(ApiError::InvalidResetToken)?;
    Ok(Json(MessageResponse {
        message: "reset link valid".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("passwords do not match".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::consume_reset_token(
        &state.db,
        &payload.token,
        &hash,
        OffsetDateTime::now_utc(),
    )
    .await?
    .ok_or(ApiError::InvalidResetToken)?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}
