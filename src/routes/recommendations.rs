use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{RecommendationRequest, Recommendations},
};

use super::AppState;

/// Recommendations from a Last.fm user's recent top tracks
pub async fn recommend_for_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Recommendations>> {
    let recommendations = state
        .service
        .recommend_for_user(&username, &state.history_period, state.history_limit)
        .await?;
    Ok(Json(recommendations))
}

/// Recommendations from caller-supplied listening history
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Json<Recommendations> {
    Json(state.service.generate_recommendations(&request.tracks).await)
}
