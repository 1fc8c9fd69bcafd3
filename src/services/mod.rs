pub mod catalog;
pub mod catalog_cache;
pub mod ratings;
pub mod reviews;
pub mod users;
pub mod watchlist;

pub use catalog::{MovieCatalog, TmdbClient};
pub use catalog_cache::MovieCatalogCache;
pub use ratings::RatingAggregator;
pub use reviews::{NewReview, ReviewStore};
pub use users::UserDirectory;
pub use watchlist::WatchlistManager;
