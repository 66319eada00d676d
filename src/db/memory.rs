//! Process-local stores, used when no Redis or Postgres is configured and in tests.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{BehaviorRecord, Comment, Favorite},
    services::{BehaviorStore, FavoritesStore},
};

#[derive(Default)]
pub struct InMemoryBehaviorStore {
    records: RwLock<HashMap<String, BehaviorRecord>>,
}

impl InMemoryBehaviorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BehaviorStore for InMemoryBehaviorStore {
    async fn load(&self, visitor: &str) -> AppResult<Option<BehaviorRecord>> {
        Ok(self.records.read().await.get(visitor).cloned())
    }

    async fn save(&self, visitor: &str, record: &BehaviorRecord) -> AppResult<()> {
        self.records
            .write()
            .await
            .insert(visitor.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, visitor: &str) -> AppResult<()> {
        self.records.write().await.remove(visitor);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
struct FavoritesTables {
    favorites: Vec<Favorite>,
    comments: Vec<Comment>,
    next_favorite_id: i64,
    next_comment_id: i64,
}

/// Favorites and comments held in memory, ids assigned sequentially from 1
#[derive(Default)]
pub struct InMemoryFavoritesStore {
    tables: RwLock<FavoritesTables>,
}

impl InMemoryFavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FavoritesStore for InMemoryFavoritesStore {
    async fn list_favorites(&self, owner: &str) -> AppResult<Vec<Favorite>> {
        let tables = self.tables.read().await;
        Ok(tables
            .favorites
            .iter()
            .rev()
            .filter(|f| f.owner == owner)
            .cloned()
            .collect())
    }

    async fn add_favorite(
        &self,
        owner: &str,
        external_id: &str,
        title: &str,
    ) -> AppResult<Favorite> {
        let mut tables = self.tables.write().await;

        if tables
            .favorites
            .iter()
            .any(|f| f.owner == owner && f.external_id == external_id)
        {
            return Err(AppError::Conflict(format!(
                "{} is already a favorite",
                external_id
            )));
        }

        tables.next_favorite_id += 1;
        let favorite = Favorite {
            id: tables.next_favorite_id,
            owner: owner.to_string(),
            external_id: external_id.to_string(),
            title: title.to_string(),
            added_at: Utc::now(),
        };
        tables.favorites.push(favorite.clone());

        Ok(favorite)
    }

    async fn delete_favorite(&self, owner: &str, id: i64) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        let position = tables
            .favorites
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Favorite {} not found", id)))?;

        if tables.favorites[position].owner != owner {
            return Err(AppError::Forbidden(format!(
                "Favorite {} belongs to another user",
                id
            )));
        }

        tables.favorites.remove(position);
        Ok(())
    }

    async fn list_comments(&self, external_id: &str) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.external_id == external_id)
            .cloned()
            .collect())
    }

    async fn add_comment(&self, external_id: &str, author: &str, text: &str) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;

        tables.next_comment_id += 1;
        let comment = Comment {
            id: tables.next_comment_id,
            external_id: external_id.to_string(),
            author: author.to_string(),
            text: text.to_string(),
            posted_at: Utc::now(),
        };
        tables.comments.push(comment.clone());

        Ok(comment)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_favorites_scoped_by_owner() {
        let store = InMemoryFavoritesStore::new();
        store.add_favorite("pisti", "570", "Dota 2").await.unwrap();
        store.add_favorite("pisti", "730", "Counter-Strike 2").await.unwrap();
        store.add_favorite("juli", "570", "Dota 2").await.unwrap();

        let favorites = store.list_favorites("pisti").await.unwrap();
        let ids: Vec<&str> = favorites.iter().map(|f| f.external_id.as_str()).collect();
        assert_eq!(ids, vec!["730", "570"]);
    }

    #[tokio::test]
    async fn test_duplicate_favorite_conflicts() {
        let store = InMemoryFavoritesStore::new();
        store.add_favorite("pisti", "570", "Dota 2").await.unwrap();

        let result = store.add_favorite("pisti", "570", "Dota 2").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_favorite_checks_owner() {
        let store = InMemoryFavoritesStore::new();
        let favorite = store.add_favorite("pisti", "570", "Dota 2").await.unwrap();

        assert!(matches!(
            store.delete_favorite("juli", favorite.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            store.delete_favorite("pisti", 999).await,
            Err(AppError::NotFound(_))
        ));

        store.delete_favorite("pisti", favorite.id).await.unwrap();
        assert!(store.list_favorites("pisti").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_per_item_in_post_order() {
        let store = InMemoryFavoritesStore::new();
        store.add_comment("570", "pisti", "first").await.unwrap();
        store.add_comment("730", "juli", "other game").await.unwrap();
        let second = store.add_comment("570", "juli", "second").await.unwrap();

        let comments = store.list_comments("570").await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].id, second.id);
        assert_eq!(comments[0].text, "first");
    }

    #[tokio::test]
    async fn test_behavior_store_roundtrip() {
        let store = InMemoryBehaviorStore::new();
        assert_eq!(store.load("v1").await.unwrap(), None);

        store.save("v1", &BehaviorRecord::with_consent()).await.unwrap();
        assert!(store.load("v1").await.unwrap().unwrap().consent);

        store.remove("v1").await.unwrap();
        assert_eq!(store.load("v1").await.unwrap(), None);
    }
}
