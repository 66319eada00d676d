use redis::{AsyncCommands, Client};

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    models::BehaviorRecord,
    services::BehaviorStore,
};

const BEHAVIOR_TTL: u64 = 365 * 24 * 3600; // 1 year

/// Behavior records stored as JSON strings, one key per visitor
///
/// Every write refreshes the TTL, so only visitors inactive for a year expire.
#[derive(Clone)]
pub struct RedisBehaviorStore {
    redis_client: Client,
}

impl RedisBehaviorStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl BehaviorStore for RedisBehaviorStore {
    async fn load(&self, visitor: &str) -> AppResult<Option<BehaviorRecord>> {
        let key = CacheKey::Behavior(visitor.to_string()).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let stored: Option<String> = conn.get(&key).await?;

        stored
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Behavior record deserialization error: {}", e))
                })
            })
            .transpose()
    }

    async fn save(&self, visitor: &str, record: &BehaviorRecord) -> AppResult<()> {
        let key = CacheKey::Behavior(visitor.to_string()).to_string();
        let json = serde_json::to_string(record).map_err(|e| {
            AppError::Internal(format!("Behavior record serialization error: {}", e))
        })?;

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(&key, json, BEHAVIOR_TTL).await?;

        tracing::debug!(visitor = %visitor, ttl = BEHAVIOR_TTL, "Behavior record saved");
        Ok(())
    }

    async fn remove(&self, visitor: &str) -> AppResult<()> {
        let key = CacheKey::Behavior(visitor.to_string()).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(&key).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;

    fn store() -> RedisBehaviorStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisBehaviorStore::new(create_redis_client(&url).unwrap())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_save_load_remove() {
        let store = store();
        let visitor = format!("test-{}", uuid::Uuid::new_v4());

        let mut record = BehaviorRecord::with_consent();
        record.push_search("hollow knight", 50);
        store.save(&visitor, &record).await.unwrap();

        assert_eq!(store.load(&visitor).await.unwrap(), Some(record));

        store.remove(&visitor).await.unwrap();
        assert_eq!(store.load(&visitor).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_an_error() {
        let store = RedisBehaviorStore::new(create_redis_client("redis://127.0.0.1:1").unwrap());
        assert!(store.load("v1").await.is_err());
    }
}
