use std::sync::Arc;

use crate::{
    db::{InMemoryBehaviorStore, InMemoryFavoritesStore},
    models::{default_catalog, AchievementDefinition},
    services::{
        BehaviorStore, BehaviorTracker, ContentProvider, FavoritesService, FavoritesStore,
        HistoryLimits, ProgressionEngine, ProgressionEvent, RecommendationEngine,
        RecommendationLimits, RequestTracker, SessionRegistry,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ContentProvider>,
    pub behavior: BehaviorTracker,
    pub recommendations: RecommendationEngine,
    pub requests: Arc<RequestTracker>,
    pub sessions: Arc<SessionRegistry>,
    pub favorites: FavoritesService,
}

/// Storage backends and tuning for an `AppState`
pub struct AppStateBuilder {
    provider: Arc<dyn ContentProvider>,
    behavior_store: Arc<dyn BehaviorStore>,
    favorites_store: Arc<dyn FavoritesStore>,
    history_limits: HistoryLimits,
    recommendation_limits: RecommendationLimits,
    catalog: Vec<AchievementDefinition>,
}

impl AppStateBuilder {
    pub fn behavior_store(mut self, store: Arc<dyn BehaviorStore>) -> Self {
        self.behavior_store = store;
        self
    }

    pub fn favorites_store(mut self, store: Arc<dyn FavoritesStore>) -> Self {
        self.favorites_store = store;
        self
    }

    pub fn history_limits(mut self, limits: HistoryLimits) -> Self {
        self.history_limits = limits;
        self
    }

    pub fn recommendation_limits(mut self, limits: RecommendationLimits) -> Self {
        self.recommendation_limits = limits;
        self
    }

    pub fn catalog(mut self, catalog: Vec<AchievementDefinition>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn build(self) -> AppState {
        AppState {
            behavior: BehaviorTracker::new(self.behavior_store, self.history_limits),
            recommendations: RecommendationEngine::new(
                Arc::clone(&self.provider),
                self.recommendation_limits,
            ),
            requests: Arc::new(RequestTracker::new()),
            sessions: Arc::new(SessionRegistry::new(ProgressionEngine::new(self.catalog))),
            favorites: FavoritesService::new(self.favorites_store),
            provider: self.provider,
        }
    }
}

impl AppState {
    /// Starts a builder with in-memory stores and default limits
    pub fn builder(provider: Arc<dyn ContentProvider>) -> AppStateBuilder {
        AppStateBuilder {
            provider,
            behavior_store: Arc::new(InMemoryBehaviorStore::new()),
            favorites_store: Arc::new(InMemoryFavoritesStore::new()),
            history_limits: HistoryLimits::default(),
            recommendation_limits: RecommendationLimits::default(),
            catalog: default_catalog(),
        }
    }

    pub fn in_memory(provider: Arc<dyn ContentProvider>) -> Self {
        Self::builder(provider).build()
    }

    /// Feeds an event to the caller's session, if they are logged in
    pub async fn record_progress(&self, identity: Option<&str>, event: ProgressionEvent) {
        let Some(name) = identity else {
            return;
        };

        match self.sessions.record(name, event).await {
            Some(unlocked) if !unlocked.is_empty() => {
                let ids: Vec<&str> = unlocked.iter().map(|a| a.id.as_str()).collect();
                tracing::info!(name = %name, ?event, unlocked = ?ids, "Progression advanced");
            }
            Some(_) => {}
            None => tracing::debug!(name = %name, ?event, "No active session, event ignored"),
        }
    }
}
