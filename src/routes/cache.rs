use axum::{extract::State, http::StatusCode};

use crate::error::AppResult;

use super::AppState;

/// Drops every cached tag lookup
pub async fn clear(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.service.tag_cache().clear_cache().await?;
    tracing::info!("Tag cache cleared");
    Ok(StatusCode::NO_CONTENT)
}
