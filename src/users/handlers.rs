use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{OkResponse, UserListResponse};
use crate::{
    auth::extractors::DataOwner,
    error::{AppError, AppResult},
    state::AppState,
    users::repo_types::{validate_birth_year, PublicRecord, UserState, Username},
};

/// Owner-facing state sync. DELETE is the admin removal endpoint.
pub fn data_routes() -> Router<AppState> {
    Router::new().route(
        "/data/:username",
        get(get_state).post(save_state).delete(delete_user),
    )
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/admin/data/:username", get(admin_get_user))
}

#[instrument(skip(state))]
pub async fn get_state(
    State(state): State<AppState>,
    DataOwner(username): DataOwner,
) -> AppResult<Json<UserState>> {
    let record = state.users().load(&username).await?;
    Ok(Json(record.state()))
}

#[instrument(skip(state, body))]
pub async fn save_state(
    State(state): State<AppState>,
    DataOwner(username): DataOwner,
    Json(body): Json<UserState>,
) -> AppResult<Json<OkResponse>> {
    validate_birth_year(body.birth_year)?;
    let users = state.users();
    // a still-valid token must not resurrect a deleted account without its credential
    if !users.exists(&username).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    users.save(&username, &body, None).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Json<OkResponse>> {
    let username = Username::parse(&raw)?;
    state.users().delete(&username).await?;
    info!(%username, "user deleted");
    Ok(Json(OkResponse { ok: true }))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<UserListResponse>> {
    let users = state.users().list_all().await?;
    Ok(Json(UserListResponse { users }))
}

#[instrument(skip(state))]
pub async fn admin_get_user(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> AppResult<Json<PublicRecord>> {
    let username = Username::parse(&raw)?;
    let record = state.users().load(&username).await?;
    Ok(Json(PublicRecord::from(record)))
}
