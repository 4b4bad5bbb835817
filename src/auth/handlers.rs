use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{is_valid_email, AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password,
    },
    error::ApiError,
    state::AppState,
    store::NewUser,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        warn!("registration missing required fields");
        return Err(ApiError::Validation(
            "Name, email, and password are required".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if payload.age.is_some_and(|age| age < 0) {
        return Err(ApiError::Validation("Age must be non-negative".into()));
    }

    if payload.children.is_some_and(|children| children < 0) {
        return Err(ApiError::Validation("Children must be non-negative".into()));
    }

    // Early duplicate check for a friendly error; the unique index on email
    // still closes the race between concurrent registrations.
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = password::hash_password(payload.password).await?;

    let user = state
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            phone: payload.phone,
            age: payload.age,
            marital_status: payload.marital_status,
            children: payload.children,
            education: payload.education,
            address: payload.address,
        })
        .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("login missing credentials");
        return Err(ApiError::Validation("Email and password are required".into()));
    }

    // Unknown email and wrong password must be indistinguishable to the
    // caller; only the logs differ.
    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Authentication("Invalid credentials".into()));
    };

    let ok = password::verify_password(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Authentication("Invalid credentials".into()));
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}
