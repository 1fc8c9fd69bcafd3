use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{AuthoredReview, MovieId, MovieRef, Review},
    services::{
        catalog_cache::MovieCatalogCache,
        ratings::{validate_rating, RatingAggregator},
        users::UserDirectory,
    },
    store::{Collection, DocumentStore, Filter},
};

pub const REVIEW_SUBMITTED: &str = "Review Submitted Successfully";

/// Everything one "submit review" action carries
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub user_id: String,
    /// Catalog metadata used if the movie is not cached yet
    pub movie: MovieRef,
    pub text: String,
    pub rating: f32,
    /// Epoch milliseconds; must not lie in the future
    pub viewing_date: Option<i64>,
}

/// Owns the `reviews` collection
#[derive(Clone)]
pub struct ReviewStore {
    store: Arc<dyn DocumentStore>,
    catalog_cache: MovieCatalogCache,
    ratings: RatingAggregator,
    users: UserDirectory,
}

impl ReviewStore {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog_cache: MovieCatalogCache,
        ratings: RatingAggregator,
        users: UserDirectory,
    ) -> Self {
        Self {
            store,
            catalog_cache,
            ratings,
            users,
        }
    }

    /// Submits a review and its rating
    ///
    /// Fans out to three independent writes, in order: catalog cache
    /// create-if-absent, review append, rating upsert. They are not wrapped in
    /// a transaction. A failure part-way leaves the earlier writes in place
    /// and surfaces as the error of the failing step. Reviews are never
    /// de-duplicated; resubmitting appends another one.
    pub async fn add_review(&self, new_review: NewReview) -> AppResult<String> {
        let rating = validate_rating(new_review.rating)?;
        if let Some(viewed_at) = new_review.viewing_date {
            if viewed_at > Utc::now().timestamp_millis() {
                return Err(AppError::InvalidInput(
                    "Viewing date cannot be in the future".to_string(),
                ));
            }
        }

        let movie_id = new_review.movie.id;
        self.catalog_cache
            .ensure_exists(movie_id, &new_review.movie)
            .await;

        let review = Review {
            user_id: new_review.user_id,
            movie_id,
            text: new_review.text,
            rating,
            viewing_date: new_review.viewing_date,
        };
        let key = self.insert_review(&review).await?;

        self.ratings
            .submit_rating(&review.user_id, movie_id, rating)
            .await?;

        tracing::info!(
            user_id = %review.user_id,
            movie_id = movie_id,
            review_key = %key,
            "Review submitted"
        );
        Ok(REVIEW_SUBMITTED.to_string())
    }

    async fn insert_review(&self, review: &Review) -> AppResult<String> {
        self.store
            .add(Collection::Reviews, serde_json::to_value(review)?)
            .await
    }

    /// All reviews of a movie, each joined with its author's display name
    ///
    /// Authors that cannot be resolved get an empty name. Ordering follows the
    /// store (roughly insertion order) and is not guaranteed.
    pub async fn list_reviews(&self, movie_id: MovieId) -> AppResult<Vec<AuthoredReview>> {
        let docs = self
            .store
            .query(Collection::Reviews, &[Filter::eq("movieId", movie_id)])
            .await?;

        let mut reviews = Vec::with_capacity(docs.len());
        for doc in docs {
            let review: Review = match serde_json::from_value(doc.body) {
                Ok(review) => review,
                Err(e) => {
                    tracing::warn!(error = %e, key = %doc.key, "Skipping malformed review");
                    continue;
                }
            };
            let username = self.users.username(&review.user_id).await;
            reviews.push(AuthoredReview { review, username });
        }

        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Document, InMemoryStore, MockDocumentStore};
    use serde_json::json;

    struct Fixture {
        store: Arc<InMemoryStore>,
        reviews: ReviewStore,
        ratings: RatingAggregator,
        catalog_cache: MovieCatalogCache,
        users: UserDirectory,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let shared: Arc<dyn DocumentStore> = store.clone();
        let catalog_cache = MovieCatalogCache::new(shared.clone());
        let ratings = RatingAggregator::new(shared.clone());
        let users = UserDirectory::new(shared.clone());
        let reviews = ReviewStore::new(
            shared,
            catalog_cache.clone(),
            ratings.clone(),
            users.clone(),
        );
        Fixture {
            store,
            reviews,
            ratings,
            catalog_cache,
            users,
        }
    }

    fn movie() -> MovieRef {
        MovieRef {
            id: 42,
            poster_path: "/hhgttg.jpg".to_string(),
            title: "The Hitchhiker's Guide to the Galaxy".to_string(),
            release_date: "2005-04-28".to_string(),
        }
    }

    fn new_review(user_id: &str, text: &str, rating: f32) -> NewReview {
        NewReview {
            user_id: user_id.to_string(),
            movie: movie(),
            text: text.to_string(),
            rating,
            viewing_date: Some(1_700_000_000_000),
        }
    }

    #[tokio::test]
    async fn test_submit_fans_out_to_three_collections() {
        let f = fixture();
        f.users.register("u1", "arthur").await.unwrap();

        let message = f.reviews.add_review(new_review("u1", "Mostly harmless", 4.5)).await.unwrap();
        assert_eq!(message, REVIEW_SUBMITTED);

        assert_eq!(f.catalog_cache.get(42).await.unwrap(), Some(movie()));
        assert_eq!(f.ratings.get_aggregate(42).await.unwrap().count, 1);

        let listed = f.reviews.list_reviews(42).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "arthur");
        assert_eq!(listed[0].review.text, "Mostly harmless");
        assert_eq!(listed[0].review.viewing_date, Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_resubmission_appends_review_but_upserts_rating() {
        let f = fixture();
        f.reviews.add_review(new_review("u1", "first", 2.0)).await.unwrap();
        f.reviews.add_review(new_review("u1", "second", 4.0)).await.unwrap();

        let listed = f.reviews.list_reviews(42).await.unwrap();
        let texts: Vec<&str> = listed.iter().map(|r| r.review.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        let aggregate = f.ratings.get_aggregate(42).await.unwrap();
        assert_eq!(aggregate.count, 1);
        assert_eq!(aggregate.average, 4.0);
    }

    #[tokio::test]
    async fn test_unknown_author_has_empty_name() {
        let f = fixture();
        f.reviews.add_review(new_review("ghost", "boo", 1.0)).await.unwrap();

        let listed = f.reviews.list_reviews(42).await.unwrap();
        assert_eq!(listed[0].username, "");
    }

    #[tokio::test]
    async fn test_no_reviews_is_empty_list() {
        let f = fixture();
        assert!(f.reviews.list_reviews(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let f = fixture();

        let err = f.reviews.add_review(new_review("u1", "too good", 6.0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let mut future = new_review("u1", "from tomorrow", 3.0);
        future.viewing_date = Some(Utc::now().timestamp_millis() + 86_400_000);
        assert!(f.reviews.add_review(future).await.is_err());

        assert_eq!(f.store.len(Collection::Movies).await, 0);
        assert_eq!(f.store.len(Collection::Reviews).await, 0);
        assert_eq!(f.store.len(Collection::Ratings).await, 0);
    }

    #[tokio::test]
    async fn test_rating_failure_leaves_review_in_place() {
        let inserted = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut store = MockDocumentStore::new();
        store.expect_get().returning(|_, _| Ok(Some(json!({}))));
        let log = inserted.clone();
        store.expect_add().returning(move |collection, doc| {
            log.lock().unwrap().push((collection, doc));
            Ok("review-1".to_string())
        });
        store
            .expect_query()
            .returning(|_, _| Err(AppError::Storage("ratings unavailable".to_string())));

        let shared: Arc<dyn DocumentStore> = Arc::new(store);
        let reviews = ReviewStore::new(
            shared.clone(),
            MovieCatalogCache::new(shared.clone()),
            RatingAggregator::new(shared.clone()),
            UserDirectory::new(shared),
        );

        let err = reviews.add_review(new_review("u1", "half", 3.0)).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);

        let inserted = inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, Collection::Reviews);
    }

    #[tokio::test]
    async fn test_malformed_review_documents_are_skipped() {
        let mut store = MockDocumentStore::new();
        store.expect_query().returning(|_, _| {
            Ok(vec![
                Document {
                    key: "bad".to_string(),
                    body: json!({"movieId": 42}),
                },
                Document {
                    key: "good".to_string(),
                    body: json!({"userId": "u1", "movieId": 42, "text": "ok", "rating": 3.0}),
                },
            ])
        });
        store.expect_get().returning(|_, _| Ok(None));

        let shared: Arc<dyn DocumentStore> = Arc::new(store);
        let reviews = ReviewStore::new(
            shared.clone(),
            MovieCatalogCache::new(shared.clone()),
            RatingAggregator::new(shared.clone()),
            UserDirectory::new(shared),
        );

        let listed = reviews.list_reviews(42).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].review.text, "ok");
    }
}
