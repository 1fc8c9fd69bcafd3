use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;

use crate::{
    error::{AppError, AppResult},
    fetch::{Fetch, FetchTask},
    middleware::CurrentUser,
    models::{
        AuthoredReview, Include, ListKind, MovieDetail, MovieId, MovieRef, MovieSummary, Page,
        RatingAggregate, UserRecord,
    },
    services::NewReview,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    /// Comma-separated sections, e.g. `credits,videos`
    pub include: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub value: f32,
}

/// Movie snapshot supplied by the client alongside a review or toggle
///
/// When the title is missing the cached record or the catalog is used instead.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieMetadata {
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub release_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub text: String,
    pub rating: f32,
    pub viewing_date: Option<i64>,
    #[serde(flatten)]
    pub movie: MovieMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStatus {
    pub movie_id: MovieId,
    pub in_watchlist: bool,
}

/// Runs a write to completion on its own task, so a dropped connection does
/// not abandon the fan-out half-way
async fn run_to_completion<T, F>(operation: F) -> Fetch<T>
where
    T: Send + 'static,
    F: Future<Output = AppResult<T>> + Send + 'static,
{
    match FetchTask::spawn(operation).finish().await {
        Some(outcome) => outcome,
        None => Fetch::from(Err::<T, AppError>(AppError::Internal(
            "operation cancelled".to_string(),
        ))),
    }
}

/// Movie record for a review or toggle: the client's metadata, else the
/// catalog cache, else the external catalog
async fn movie_snapshot(
    state: &AppState,
    movie_id: MovieId,
    metadata: MovieMetadata,
) -> AppResult<MovieRef> {
    if !metadata.title.trim().is_empty() {
        return Ok(MovieRef {
            id: movie_id,
            poster_path: metadata.poster_path,
            title: metadata.title,
            release_date: metadata.release_date,
        });
    }
    if let Some(cached) = state.catalog_cache.get(movie_id).await? {
        return Ok(cached);
    }
    let detail = state.catalog.fetch_by_id(movie_id, &[]).await?;
    Ok(MovieRef {
        id: movie_id,
        ..detail.to_movie_ref()
    })
}

/// An empty body means no metadata; anything else must be valid JSON
fn parse_metadata(body: &[u8]) -> AppResult<MovieMetadata> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(MovieMetadata::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid movie metadata: {}", e)))
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn register_user(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<RegisterRequest>,
) -> Fetch<UserRecord> {
    let users = state.users.clone();
    run_to_completion(async move { users.register(&user_id, &request.username).await }).await
}

pub async fn list_movies(
    State(state): State<AppState>,
    Path(kind): Path<ListKind>,
    Query(query): Query<PageQuery>,
) -> Fetch<Page<MovieSummary>> {
    state.catalog.fetch_list(kind, query.page).await.into()
}

pub async fn search_movies(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Fetch<Page<MovieSummary>> {
    state.catalog.search(&query.q, query.page).await.into()
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(query): Query<DetailQuery>,
) -> Fetch<MovieDetail> {
    let include = query
        .include
        .as_deref()
        .map(Include::parse_list)
        .unwrap_or_default();
    state.catalog.fetch_by_id(movie_id, &include).await.into()
}

pub async fn get_rating(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> Fetch<RatingAggregate> {
    state.ratings.get_aggregate(movie_id).await.into()
}

/// Upserts the caller's rating and returns the fresh aggregate
pub async fn submit_rating(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(movie_id): Path<MovieId>,
    Json(request): Json<RatingRequest>,
) -> Fetch<RatingAggregate> {
    let ratings = state.ratings.clone();
    run_to_completion(async move {
        ratings.submit_rating(&user_id, movie_id, request.value).await?;
        ratings.get_aggregate(movie_id).await
    })
    .await
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> Fetch<Vec<AuthoredReview>> {
    state.reviews.list_reviews(movie_id).await.into()
}

pub async fn submit_review(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(movie_id): Path<MovieId>,
    Json(request): Json<SubmitReviewRequest>,
) -> Fetch<String> {
    run_to_completion(async move {
        let movie = movie_snapshot(&state, movie_id, request.movie).await?;
        state
            .reviews
            .add_review(NewReview {
                user_id,
                movie,
                text: request.text,
                rating: request.rating,
                viewing_date: request.viewing_date,
            })
            .await
    })
    .await
}

pub async fn list_watchlist(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Fetch<Vec<MovieRef>> {
    state.watchlist.list_watchlist_movies(&user_id).await.into()
}

pub async fn watchlist_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(movie_id): Path<MovieId>,
) -> Fetch<WatchlistStatus> {
    state
        .watchlist
        .is_in_watchlist(&user_id, movie_id)
        .await
        .map(|in_watchlist| WatchlistStatus {
            movie_id,
            in_watchlist,
        })
        .into()
}

/// Flips membership, then reports the state the caller ends up in
///
/// Without a movie snapshot the toggle still runs; only the catalog cache
/// write is skipped.
pub async fn toggle_watchlist(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(movie_id): Path<MovieId>,
    body: Bytes,
) -> Fetch<WatchlistStatus> {
    let metadata = match parse_metadata(&body) {
        Ok(metadata) => metadata,
        Err(e) => return Err::<WatchlistStatus, AppError>(e).into(),
    };
    run_to_completion(async move {
        match movie_snapshot(&state, movie_id, metadata).await {
            Ok(movie) => {
                state
                    .watchlist
                    .toggle_watchlist(&user_id, movie_id, &movie)
                    .await?
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    movie_id = movie_id,
                    "No movie snapshot, toggling without caching"
                );
                state.watchlist.toggle_membership(&user_id, movie_id).await?
            }
        };
        let in_watchlist = state.watchlist.is_in_watchlist(&user_id, movie_id).await?;
        Ok(WatchlistStatus {
            movie_id,
            in_watchlist,
        })
    })
    .await
}
