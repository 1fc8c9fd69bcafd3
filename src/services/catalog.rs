/// Read-only client for the external movie catalog (TMDB)
///
/// Endpoints used:
/// 1. Lists: `trending/movie/week`, `movie/top_rated`, `movie/upcoming`
/// 2. Details: `movie/{id}?append_to_response=credits,videos`
/// 3. Search: `search/movie?query=...`
///
/// Authentication is the `api_key` query parameter. Responses go through the
/// Redis read-through cache.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        tmdb::{ApiMovieDetail, ApiMovieList},
        Include, ListKind, MovieDetail, MovieId, MovieSummary, Page,
    },
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const LIST_CACHE_TTL: u64 = 3600; // 1 hour
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day

/// Catalog operations the rest of the service depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// One page of a curated list; `total_pages` is capped at 500
    async fn fetch_list(&self, kind: ListKind, page: i64) -> AppResult<Page<MovieSummary>>;

    /// A single movie, optionally with credits and videos embedded
    async fn fetch_by_id(&self, id: MovieId, include: &[Include]) -> AppResult<MovieDetail>;

    /// Free-text title search; `total_pages` is capped at 500
    async fn search(&self, query: &str, page: i64) -> AppResult<Page<MovieSummary>>;
}

fn validate_page(page: i64) -> AppResult<()> {
    if page < 1 {
        return Err(AppError::InvalidInput("Page must be at least 1".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbClient {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    /// GETs `path` with the API key appended and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = self.endpoint(path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "Catalog request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "TMDB returned status {} for {}",
                status, path
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to parse catalog response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbClient {
    async fn fetch_list(&self, kind: ListKind, page: i64) -> AppResult<Page<MovieSummary>> {
        validate_page(page)?;

        cached!(
            self.cache,
            CacheKey::MovieList { kind, page },
            LIST_CACHE_TTL,
            async move {
                let list: ApiMovieList = self
                    .get_json(kind.path(), &[("page", page.to_string())])
                    .await?;
                let page: Page<MovieSummary> = list.into();

                tracing::info!(
                    list = %kind,
                    page = page.page,
                    total_pages = page.total_pages,
                    results = page.results.len(),
                    "Movie list fetched"
                );

                Ok::<_, AppError>(page)
            }
        )
    }

    async fn fetch_by_id(&self, id: MovieId, include: &[Include]) -> AppResult<MovieDetail> {
        let mut include = include.to_vec();
        include.sort();
        include.dedup();
        let append = include
            .iter()
            .map(|section| section.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let key = CacheKey::MovieDetail { id, include };

        cached!(
            self.cache,
            key,
            DETAIL_CACHE_TTL,
            async move {
                let path = format!("movie/{}", id);
                let query = if append.is_empty() {
                    Vec::new()
                } else {
                    vec![("append_to_response", append)]
                };

                let detail: ApiMovieDetail = self.get_json(&path, &query).await?;
                let detail: MovieDetail = detail.into();

                tracing::info!(
                    movie_id = id,
                    cast = detail.cast.len(),
                    videos = detail.videos.len(),
                    "Movie details fetched"
                );

                Ok::<_, AppError>(detail)
            }
        )
    }

    async fn search(&self, query: &str, page: i64) -> AppResult<Page<MovieSummary>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }
        validate_page(page)?;

        cached!(
            self.cache,
            CacheKey::Search {
                query: query.to_string(),
                page,
            },
            LIST_CACHE_TTL,
            async move {
                let list: ApiMovieList = self
                    .get_json(
                        "search/movie",
                        &[("query", query.trim().to_string()), ("page", page.to_string())],
                    )
                    .await?;
                let page: Page<MovieSummary> = list.into();

                tracing::info!(
                    query = %query,
                    results = page.results.len(),
                    "Movie search completed"
                );

                Ok::<_, AppError>(page)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Serves canned TMDB responses on an ephemeral local port
    async fn spawn_fake_tmdb() -> String {
        async fn trending(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            assert_eq!(params.get("api_key").map(String::as_str), Some("test_key"));
            Json(json!({
                "page": params.get("page").and_then(|p| p.parse::<i64>().ok()),
                "total_pages": 1000,
                "results": [{"id": 550, "title": "Fight Club", "poster_path": null}]
            }))
        }

        async fn movie(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            let append = params.get("append_to_response").cloned().unwrap_or_default();
            let mut body = json!({"id": 603, "title": "The Matrix"});
            if append.contains("credits") {
                body["credits"] = json!({"cast": [{"id": 1, "name": "Keanu Reeves"}], "crew": []});
            }
            Json(body)
        }

        async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            Json(json!({
                "page": 1,
                "total_pages": 3,
                "results": [{"id": 1, "title": params.get("query").cloned()}]
            }))
        }

        let app = Router::new()
            .route("/trending/movie/week", get(trending))
            .route("/movie/603", get(movie))
            .route("/search/movie", get(search));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(api_url: String) -> TmdbClient {
        TmdbClient::new(Cache::disabled(), "test_key".to_string(), api_url)
    }

    #[tokio::test]
    async fn test_fetch_list_clamps_total_pages() {
        let tmdb = client(spawn_fake_tmdb().await);
        let page = tmdb.fetch_list(ListKind::Trending, 2).await.unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 500);
        assert_eq!(page.results[0].title, "Fight Club");
        assert_eq!(page.results[0].poster_path, "");
    }

    #[tokio::test]
    async fn test_fetch_by_id_with_credits() {
        let tmdb = client(spawn_fake_tmdb().await);

        let detail = tmdb.fetch_by_id(603, &[Include::Credits]).await.unwrap();
        assert_eq!(detail.title, "The Matrix");
        assert_eq!(detail.cast.len(), 1);

        let bare = tmdb.fetch_by_id(603, &[]).await.unwrap();
        assert!(bare.cast.is_empty());
    }

    #[tokio::test]
    async fn test_search_passes_query() {
        let tmdb = client(spawn_fake_tmdb().await);
        let page = tmdb.search(" matrix ", 1).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.results[0].title, "matrix");
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_failure() {
        let tmdb = client(spawn_fake_tmdb().await);
        let err = tmdb.fetch_list(ListKind::Upcoming, 1).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_empty_search_rejected_before_request() {
        let tmdb = client("http://127.0.0.1:1".to_string());
        let err = tmdb.search("   ", 1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let tmdb = client("http://127.0.0.1:1".to_string());
        let err = tmdb.fetch_list(ListKind::TopRated, 0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_network_failure() {
        let tmdb = client("http://127.0.0.1:1".to_string());
        let err = tmdb.fetch_list(ListKind::TopRated, 1).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }
}
