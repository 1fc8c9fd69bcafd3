use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{MovieId, MovieRef},
    store::{Collection, DocumentStore},
};

/// Denormalized movie snapshots in the `movies` collection
///
/// Records are written lazily on the first review or watchlist action for a
/// movie and never overwritten afterwards, so the first writer wins. The
/// existence check and the write are not atomic: two concurrent first writers
/// may both write, and the later one lands.
#[derive(Clone)]
pub struct MovieCatalogCache {
    store: Arc<dyn DocumentStore>,
}

impl MovieCatalogCache {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Writes `movie` under `movie_id` unless a record already exists
    ///
    /// Best-effort: failures are logged and swallowed.
    pub async fn ensure_exists(&self, movie_id: MovieId, movie: &MovieRef) {
        if let Err(e) = self.try_ensure_exists(movie_id, movie).await {
            tracing::warn!(
                error = %e,
                movie_id = movie_id,
                "Could not record movie in catalog cache"
            );
        }
    }

    async fn try_ensure_exists(&self, movie_id: MovieId, movie: &MovieRef) -> AppResult<()> {
        let key = movie_id.to_string();
        if self.store.get(Collection::Movies, &key).await?.is_some() {
            return Ok(());
        }

        let record = MovieRef {
            id: movie_id,
            ..movie.clone()
        };
        self.store
            .set(Collection::Movies, &key, serde_json::to_value(&record)?)
            .await?;

        tracing::debug!(movie_id = movie_id, title = %record.title, "Movie cached");
        Ok(())
    }

    /// Point lookup of a cached movie record
    pub async fn get(&self, movie_id: MovieId) -> AppResult<Option<MovieRef>> {
        let Some(body) = self
            .store
            .get(Collection::Movies, &movie_id.to_string())
            .await?
        else {
            return Ok(None);
        };

        let mut movie: MovieRef = serde_json::from_value(body)?;
        // The document key is authoritative for the id
        movie.id = movie_id;
        Ok(Some(movie))
    }
}
