use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, ExistsResponse, LoginRequest, RegisterRequest},
        services::CredentialStore,
    },
    error::AppResult,
    state::AppState,
    users::repo_types::Username,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/check/:username", get(check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Json<ExistsResponse>> {
    let username = Username::parse(&raw)?;
    let exists = state.users().exists(&username).await?;
    Ok(Json(ExistsResponse { exists }))
}

#[instrument(skip(creds, payload), fields(username = %payload.username))]
pub async fn register(
    State(creds): State<CredentialStore>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = creds
        .register(&payload.username, &payload.password, payload.birth_year)
        .await?;
    Ok(Json(AuthResponse { ok: true, token }))
}

#[instrument(skip(creds, payload), fields(username = %payload.username))]
pub async fn login(
    State(creds): State<CredentialStore>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = creds.login(&payload.username, &payload.password).await?;
    Ok(Json(AuthResponse { ok: true, token }))
}
