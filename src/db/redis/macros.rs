/// Read-through caching for catalog calls.
///
/// Returns the cached value when `$cache.lookup(&$key)` hits. Otherwise the
/// future `$block` is awaited, its value is queued for a background write
/// with `$ttl` seconds to live, and then returned. Errors from `$block` are
/// propagated with `?` and never cached, so the macro must sit in a function
/// returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// async fn fetch_list(&self, kind: ListKind, page: i64) -> AppResult<Page<MovieSummary>> {
///     let key = CacheKey::MovieList { kind, page };
///     cached!(self.cache, key, LIST_CACHE_TTL, async move {
///         self.get_json::<ApiMovieList>(kind.path(), &[]).await.map(Page::from)
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(hit) = $cache.lookup(&$key).await {
            Ok(hit)
        } else {
            let value = $block.await?;
            $cache.store_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
