use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, MovieRef},
    services::catalog_cache::MovieCatalogCache,
    store::{Collection, DocumentStore},
};

/// Flips `movie_id` in `watchlist`: removed when present, appended otherwise
pub fn toggled(watchlist: &[MovieId], movie_id: MovieId) -> Vec<MovieId> {
    if watchlist.contains(&movie_id) {
        watchlist.iter().copied().filter(|id| *id != movie_id).collect()
    } else {
        let mut updated = watchlist.to_vec();
        updated.push(movie_id);
        updated
    }
}

/// Reads the `watchlist` field of a user document, tolerating its absence
fn watchlist_of(user: &Value) -> Vec<MovieId> {
    user.get("watchlist")
        .and_then(|list| list.as_array())
        .map(|list| list.iter().filter_map(|id| id.as_i64()).collect())
        .unwrap_or_default()
}

/// Per-user watchlist membership
#[derive(Clone)]
pub struct WatchlistManager {
    store: Arc<dyn DocumentStore>,
    catalog_cache: MovieCatalogCache,
}

impl WatchlistManager {
    pub fn new(store: Arc<dyn DocumentStore>, catalog_cache: MovieCatalogCache) -> Self {
        Self {
            store,
            catalog_cache,
        }
    }

    /// Movie ids on the user's watchlist; empty when the user is unknown
    pub async fn watchlist(&self, user_id: &str) -> AppResult<Vec<MovieId>> {
        let user = self.store.get(Collection::Users, user_id).await?;
        Ok(user.as_ref().map(watchlist_of).unwrap_or_default())
    }

    pub async fn is_in_watchlist(&self, user_id: &str, movie_id: MovieId) -> AppResult<bool> {
        Ok(self.watchlist(user_id).await?.contains(&movie_id))
    }

    /// Adds the movie if absent, removes it if present
    ///
    /// The catalog cache write happens first and outside the transaction; it
    /// is best-effort and never fails the toggle. Returns `true` on success;
    /// the caller re-derives the new membership state.
    pub async fn toggle_watchlist(
        &self,
        user_id: &str,
        movie_id: MovieId,
        movie: &MovieRef,
    ) -> AppResult<bool> {
        self.catalog_cache.ensure_exists(movie_id, movie).await;
        self.toggle_membership(user_id, movie_id).await
    }

    /// Flips membership without touching the catalog cache
    ///
    /// The read-compute-write on the user document runs as one store
    /// transaction, so concurrent toggles on the same user never lose an
    /// update.
    pub async fn toggle_membership(&self, user_id: &str, movie_id: MovieId) -> AppResult<bool> {
        let owner = user_id.to_string();
        self.store
            .run_transaction(
                Collection::Users,
                user_id,
                Box::new(move |current| {
                    let Some(mut user) = current else {
                        return Err(AppError::NotFound(format!("users/{}", owner)));
                    };
                    let updated = toggled(&watchlist_of(&user), movie_id);
                    match user.as_object_mut() {
                        Some(fields) => {
                            fields.insert("watchlist".to_string(), serde_json::to_value(updated)?);
                            Ok(user)
                        }
                        None => Err(AppError::Storage(format!(
                            "users/{} is not an object document",
                            owner
                        ))),
                    }
                }),
            )
            .await?;

        tracing::info!(user_id = %user_id, movie_id = movie_id, "Watchlist toggled");
        Ok(true)
    }

    /// Cached movie records for the user's watchlist, in watchlist order
    ///
    /// Movies without a catalog cache record are silently left out.
    pub async fn list_watchlist_movies(&self, user_id: &str) -> AppResult<Vec<MovieRef>> {
        let ids = self.watchlist(user_id).await?;

        let mut movies = Vec::with_capacity(ids.len());
        for movie_id in ids {
            match self.catalog_cache.get(movie_id).await? {
                Some(movie) => movies.push(movie),
                None => {
                    tracing::debug!(movie_id = movie_id, "Watchlist movie missing from catalog cache")
                }
            }
        }
        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;
    use crate::services::users::UserDirectory;
    use crate::store::{InMemoryStore, MockDocumentStore};
    use serde_json::json;

    struct Fixture {
        store: Arc<InMemoryStore>,
        watchlist: WatchlistManager,
    }

    async fn fixture(users: &[&str]) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let shared: Arc<dyn DocumentStore> = store.clone();
        let directory = UserDirectory::new(shared.clone());
        for user in users {
            directory.register(user, user).await.unwrap();
        }
        let watchlist = WatchlistManager::new(shared.clone(), MovieCatalogCache::new(shared));
        Fixture { store, watchlist }
    }

    fn movie(id: MovieId) -> MovieRef {
        MovieRef {
            id,
            poster_path: format!("/{}.jpg", id),
            title: format!("Movie {}", id),
            release_date: String::new(),
        }
    }

    #[test]
    fn test_toggled_adds_and_removes() {
        assert_eq!(toggled(&[], 7), vec![7]);
        assert_eq!(toggled(&[1, 7, 3], 7), vec![1, 3]);
        assert_eq!(toggled(&[1, 3], 7), vec![1, 3, 7]);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_membership() {
        let f = fixture(&["bob"]).await;

        assert!(f.watchlist.toggle_watchlist("bob", 7, &movie(7)).await.unwrap());
        assert_eq!(f.watchlist.watchlist("bob").await.unwrap(), vec![7]);
        assert!(f.watchlist.is_in_watchlist("bob", 7).await.unwrap());

        f.watchlist.toggle_watchlist("bob", 7, &movie(7)).await.unwrap();
        assert!(f.watchlist.watchlist("bob").await.unwrap().is_empty());
        assert!(!f.watchlist.is_in_watchlist("bob", 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_keeps_other_fields() {
        let f = fixture(&["bob"]).await;
        f.watchlist.toggle_watchlist("bob", 7, &movie(7)).await.unwrap();

        let user: UserRecord =
            serde_json::from_value(f.store.get(Collection::Users, "bob").await.unwrap().unwrap())
                .unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(user.watchlist, vec![7]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_an_error_for_reads() {
        let f = fixture(&[]).await;
        assert!(!f.watchlist.is_in_watchlist("nobody", 7).await.unwrap());
        assert!(f.watchlist.list_watchlist_movies("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_without_watchlist_field() {
        let f = fixture(&[]).await;
        f.store
            .set(Collection::Users, "legacy", json!({"username": "legacy"}))
            .await
            .unwrap();

        assert!(!f.watchlist.is_in_watchlist("legacy", 7).await.unwrap());
        f.watchlist.toggle_watchlist("legacy", 7, &movie(7)).await.unwrap();
        assert!(f.watchlist.is_in_watchlist("legacy", 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_for_unknown_user_fails_but_caches_movie() {
        let f = fixture(&[]).await;

        let err = f
            .watchlist
            .toggle_watchlist("nobody", 7, &movie(7))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // The cache write sits outside the transaction and stays
        assert_eq!(f.store.len(Collection::Movies).await, 1);
        assert_eq!(f.store.get(Collection::Users, "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_membership_toggle_skips_catalog_cache() {
        let f = fixture(&["erin"]).await;

        assert!(f.watchlist.toggle_membership("erin", 11).await.unwrap());
        assert!(f.watchlist.is_in_watchlist("erin", 11).await.unwrap());
        assert_eq!(f.store.len(Collection::Movies).await, 0);

        f.watchlist.toggle_membership("erin", 11).await.unwrap();
        assert!(!f.watchlist.is_in_watchlist("erin", 11).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_drops_uncached_movies() {
        let f = fixture(&["carol"]).await;
        f.watchlist.toggle_watchlist("carol", 1, &movie(1)).await.unwrap();
        f.watchlist.toggle_watchlist("carol", 2, &movie(2)).await.unwrap();
        f.store
            .update_field(Collection::Users, "carol", "watchlist", json!([1, 99, 2]))
            .await
            .unwrap();

        let movies = f.watchlist.list_watchlist_movies("carol").await.unwrap();
        let ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(movies[0].title, "Movie 1");
    }

    #[tokio::test]
    async fn test_concurrent_toggles_lose_no_updates() {
        let f = fixture(&["dave"]).await;
        let watchlist = f.watchlist.clone();

        // Movie m is toggled m times, so odd ids end up on the list
        let mut tasks = Vec::new();
        for movie_id in 1..=8_i64 {
            for _ in 0..movie_id {
                let watchlist = watchlist.clone();
                tasks.push(tokio::spawn(async move {
                    watchlist
                        .toggle_watchlist("dave", movie_id, &movie(movie_id))
                        .await
                }));
            }
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut ids = f.watchlist.watchlist("dave").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![1, 3, 5, 7]);
    }

    #[tokio::test]
    async fn test_transaction_failure_surfaces_as_error() {
        let mut store = MockDocumentStore::new();
        store.expect_get().returning(|_, _| Ok(Some(json!({}))));
        store
            .expect_run_transaction()
            .returning(|_, _, _| Err(AppError::Storage("aborted".to_string())));

        let shared: Arc<dyn DocumentStore> = Arc::new(store);
        let watchlist = WatchlistManager::new(shared.clone(), MovieCatalogCache::new(shared));

        let err = watchlist.toggle_watchlist("bob", 7, &movie(7)).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
    }
}
