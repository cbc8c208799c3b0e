use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::dto::{CommentResponse, JournalTextRequest, RecommendResponse};
use super::services;
use crate::{error::AppResult, state::AppState};

pub fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/comment", post(comment))
        .route("/recommend", post(recommend))
}

#[instrument(skip(state, body))]
pub async fn comment(
    State(state): State<AppState>,
    Json(body): Json<JournalTextRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = services::comment(state.ai.as_deref(), &body).await?;
    Ok(Json(CommentResponse { comment }))
}

#[instrument(skip(state, body))]
pub async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<JournalTextRequest>,
) -> AppResult<Json<RecommendResponse>> {
    let recommendation = services::recommend(state.ai.as_deref(), &body).await?;
    Ok(Json(RecommendResponse { recommendation }))
}
