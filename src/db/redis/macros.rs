/// Read-through caching against an optional [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues
/// the result for a background write and returns it. With no cache configured
/// the block is simply awaited. Cache read failures are logged and treated as
/// misses so a Redis outage never fails the request.
///
/// ```rust,ignore
/// let feed: Vec<ScoredMovie> = cached!(state.cache, CacheKey::TrendingFeed(limit), 60, async {
///     compute_trending(limit).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let cached = match &$cache {
            Some(cache) => match cache.get_from_cache(&key).await {
                Ok(hit) => hit,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache read failed");
                    None
                }
            },
            None => None,
        };

        match cached {
            Some(value) => Ok(value),
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = &$cache {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
