use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, RatingAggregate},
    store::{Collection, DocumentStore, Filter},
};

pub const MIN_RATING: f32 = 0.0;
pub const MAX_RATING: f32 = 5.0;

/// Checks that `value` is a finite rating in `[0, 5]` and snaps it to the
/// nearest 0.1 step
pub fn validate_rating(value: f32) -> AppResult<f32> {
    if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok((value * 10.0).round() / 10.0)
}

/// Owns the `ratings` collection: one rating per (user, movie), averaged on
/// every read
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn DocumentStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upserts the user's rating for a movie
    ///
    /// Any existing rating documents for the pair are overwritten in place;
    /// a new one is inserted only when none exists. The lookup and the write
    /// are not atomic, so two concurrent first submissions from the same user
    /// can still produce two documents.
    pub async fn submit_rating(&self, user_id: &str, movie_id: MovieId, value: f32) -> AppResult<()> {
        let value = validate_rating(value)?;

        let existing = self
            .store
            .query(
                Collection::Ratings,
                &[Filter::eq("userId", user_id), Filter::eq("movieId", movie_id)],
            )
            .await?;

        if existing.is_empty() {
            self.store
                .add(
                    Collection::Ratings,
                    json!({
                        "userId": user_id,
                        "movieId": movie_id,
                        "value": value,
                    }),
                )
                .await?;
            tracing::info!(user_id = %user_id, movie_id = movie_id, value = value, "Rating added");
        } else {
            for doc in &existing {
                self.store
                    .update_field(Collection::Ratings, &doc.key, "value", json!(value))
                    .await?;
            }
            tracing::info!(
                user_id = %user_id,
                movie_id = movie_id,
                value = value,
                "Rating updated"
            );
        }

        Ok(())
    }

    /// Average and count over all ratings of a movie
    ///
    /// Returns [`RatingAggregate::NO_RATINGS`] (`-1.0`, `-1`) when the movie
    /// has never been rated.
    pub async fn get_aggregate(&self, movie_id: MovieId) -> AppResult<RatingAggregate> {
        let docs = self
            .store
            .query(Collection::Ratings, &[Filter::eq("movieId", movie_id)])
            .await?;

        let values: Vec<f64> = docs
            .iter()
            .filter_map(|doc| doc.body.get("value").and_then(|v| v.as_f64()))
            .collect();

        let aggregate = RatingAggregate::from_values(&values);
        tracing::debug!(
            movie_id = movie_id,
            average = aggregate.average,
            count = aggregate.count,
            "Rating aggregate computed"
        );
        Ok(aggregate)
    }
}
