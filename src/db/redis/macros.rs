/// Read-through caching against a [`Cache`](crate::db::Cache).
///
/// Returns the cached value under `$key` when present. Otherwise awaits
/// `$block`, queues the result for a background write with `$ttl` seconds
/// to live under the generation seen by the lookup, and returns it. A
/// failing cache read is logged and the value is computed without being
/// written back; errors from `$block` propagate with `?`.
///
/// # Example
/// ```rust,ignore
/// let profile: AppResult<TasteProfile> =
///     cached!(cache, CacheKey::TasteProfile(uid), 300, self.build(uid));
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok($crate::db::CacheLookup::Hit(cached)) => Ok(cached),
            Ok($crate::db::CacheLookup::Miss { generation }) => {
                let value = $block.await?;
                $cache.set_in_background(&$key, generation, &value, $ttl);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, computing value");
                $block.await
            }
        }
    }};
}
