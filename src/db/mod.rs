pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::{InMemoryBehaviorStore, InMemoryFavoritesStore};
pub use postgres::{create_pool, run_migrations, PgFavoritesStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use redis::RedisBehaviorStore;
