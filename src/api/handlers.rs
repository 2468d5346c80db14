use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    recommender::Recommendation,
};

use super::AppState;

/// Shown when a query produces no recommendations
pub const NO_RECOMMENDATIONS_MESSAGE: &str = "No recommendations found. Please try another movie.";

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub title: String,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub movies: usize,
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let movies = state.recommender().await.catalog().len();
    (StatusCode::OK, Json(json!({ "status": "healthy", "movies": movies })))
}

/// All movie titles, in catalog order
pub async fn get_movies(State(state): State<AppState>) -> Json<Vec<String>> {
    let recommender = state.recommender().await;
    Json(recommender.movie_titles().into_iter().map(String::from).collect())
}

/// Movies similar to the requested title
///
/// An unknown title is not an error: the list comes back empty with an advisory
/// message for the client to display.
pub async fn get_recommendations(
    State(state): State<AppState>,
    request_id: RequestId,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Query(params) = query?;
    let title = params
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("`title` query parameter is required".to_string()))?;

    let recommender = state.recommender().await;
    let recommendations = recommender.scored_recommendations(&title);

    tracing::info!(
        request_id = %request_id,
        title = %title,
        returned = recommendations.len(),
        "Processed recommendation request"
    );

    let message = recommendations
        .is_empty()
        .then(|| NO_RECOMMENDATIONS_MESSAGE.to_string());

    Ok(Json(RecommendationResponse {
        title,
        recommendations,
        message,
    }))
}

/// Reload the catalog and similarity artifacts from disk
pub async fn reload(
    State(state): State<AppState>,
    request_id: RequestId,
) -> AppResult<Json<ReloadResponse>> {
    tracing::info!(request_id = %request_id, "Reload requested");
    let recommender = state.reload().await?;
    Ok(Json(ReloadResponse {
        movies: recommender.catalog().len(),
    }))
}
