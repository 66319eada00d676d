/// Read-through caching for provider lookups.
///
/// `$cache` is an `&Option<Cache>`. With a cache, a hit is returned directly;
/// on a miss (or a failed cache read) `$block` is awaited and its value is
/// queued for a background write with `$ttl` seconds. Without a cache,
/// `$block` is simply awaited.
///
/// # Example
/// ```rust,ignore
/// cached!(&self.cache, CacheKey::Search("steam", term.to_string()), 3600, async move {
///     fetch_from_api(term).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                let key = $key;
                if let Some(hit) = cache.get_or_miss(&key).await {
                    Ok(hit)
                } else {
                    let value = $block.await?;
                    cache.set_in_background(&key, &value, $ttl);
                    Ok(value)
                }
            }
            None => $block.await,
        }
    }};
}
