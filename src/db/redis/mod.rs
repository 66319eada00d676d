pub mod behavior;
pub mod cache;

mod macros;

pub use behavior::RedisBehaviorStore;
pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheKey;
pub use cache::CacheWriterHandle;
