use std::sync::Arc;

use crate::{
    services::{
        MovieCatalog, MovieCatalogCache, RatingAggregator, ReviewStore, UserDirectory,
        WatchlistManager,
    },
    store::DocumentStore,
};

/// Shared handles to the catalog client and the user-data services
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn MovieCatalog>,
    pub catalog_cache: MovieCatalogCache,
    pub ratings: RatingAggregator,
    pub reviews: ReviewStore,
    pub watchlist: WatchlistManager,
    pub users: UserDirectory,
}

impl AppState {
    /// Wires every service onto one document store
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Arc<dyn MovieCatalog>) -> Self {
        let catalog_cache = MovieCatalogCache::new(store.clone());
        let ratings = RatingAggregator::new(store.clone());
        let users = UserDirectory::new(store.clone());
        let reviews = ReviewStore::new(
            store.clone(),
            catalog_cache.clone(),
            ratings.clone(),
            users.clone(),
        );
        let watchlist = WatchlistManager::new(store, catalog_cache.clone());

        Self {
            catalog,
            catalog_cache,
            ratings,
            reviews,
            watchlist,
            users,
        }
    }
}
