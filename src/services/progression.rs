//! Achievement and XP progression.
//!
//! `ProgressionEngine` is a pure state machine over `ProgressionState`;
//! `SessionRegistry` keeps one state per logged-in display name.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::models::{AchievementDefinition, Metric, Rank};

/// User actions that move progression forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressionEvent {
    Login,
    /// A search that returned at least one result
    SearchSucceeded,
    ItemOpened,
    FavoriteAdded,
    CommentAdded,
    XpChanged,
}

impl ProgressionEvent {
    /// Metric evaluated right after the event's counter moves
    fn metric(self) -> Metric {
        match self {
            ProgressionEvent::Login => Metric::Login,
            ProgressionEvent::SearchSucceeded => Metric::Search,
            ProgressionEvent::ItemOpened => Metric::Open,
            ProgressionEvent::FavoriteAdded => Metric::Favorite,
            ProgressionEvent::CommentAdded => Metric::Comment,
            ProgressionEvent::XpChanged => Metric::Xp,
        }
    }
}

/// Per-session counters and unlocks
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub logged_in: bool,
    pub search_count: u32,
    pub opened_count: u32,
    pub favorite_count: u32,
    pub comment_count: u32,
    /// Sum of the points of every unlocked achievement
    pub xp: u32,
    /// Unlocked achievement ids in unlock order
    pub unlocked: Vec<String>,
    /// Pending notification, the most recent unlock
    pub last_unlocked: Option<AchievementDefinition>,
}

impl ProgressionState {
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.iter().any(|unlocked| unlocked == id)
    }

    pub fn rank(&self) -> Rank {
        Rank::from_xp(self.xp)
    }
}

/// One catalog entry with the session's progress towards it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    #[serde(flatten)]
    pub definition: AchievementDefinition,
    /// Metric value, clamped to the target
    pub current: u32,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub name: String,
    pub xp: u32,
    pub rank: Rank,
    pub next_rank_xp: Option<u32>,
    pub state: ProgressionState,
    /// Unlocked entries first, then by title
    pub achievements: Vec<AchievementProgress>,
}

/// Evaluates a fixed achievement catalog against session state
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    catalog: Vec<AchievementDefinition>,
}

impl ProgressionEngine {
    /// Builds an engine, skipping entries with an empty or duplicate id or a zero target
    pub fn new(catalog: Vec<AchievementDefinition>) -> Self {
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(catalog.len());

        for definition in catalog {
            let id = definition.id.trim();
            if id.is_empty() || definition.target == 0 || !seen.insert(id.to_string()) {
                tracing::warn!(
                    id = %definition.id,
                    target = definition.target,
                    "Skipping malformed achievement definition"
                );
                continue;
            }
            valid.push(definition);
        }

        Self { catalog: valid }
    }

    pub fn catalog(&self) -> &[AchievementDefinition] {
        &self.catalog
    }

    /// Fresh session state with the login achievements already evaluated
    pub fn login(&self) -> ProgressionState {
        let mut state = ProgressionState::default();
        self.apply(&mut state, ProgressionEvent::Login);
        state
    }

    /// Applies one event and returns the achievements it unlocked, in unlock order
    pub fn apply(
        &self,
        state: &mut ProgressionState,
        event: ProgressionEvent,
    ) -> Vec<AchievementDefinition> {
        match event {
            ProgressionEvent::Login => {
                *state = ProgressionState {
                    logged_in: true,
                    ..Default::default()
                };
            }
            ProgressionEvent::SearchSucceeded => state.search_count += 1,
            ProgressionEvent::ItemOpened => state.opened_count += 1,
            ProgressionEvent::FavoriteAdded => state.favorite_count += 1,
            ProgressionEvent::CommentAdded => state.comment_count += 1,
            ProgressionEvent::XpChanged => {}
        }

        let mut unlocked = self.evaluate(state, event.metric());
        if matches!(
            event.metric(),
            Metric::Search | Metric::Open | Metric::Favorite | Metric::Comment
        ) {
            unlocked.extend(self.evaluate(state, Metric::All));
        }

        unlocked
    }

    /// Unlocks every pending entry of `metric`, then settles XP achievements
    ///
    /// Already unlocked entries are never touched, so evaluating twice with
    /// unchanged counters is a no-op.
    pub fn evaluate(&self, state: &mut ProgressionState, metric: Metric) -> Vec<AchievementDefinition> {
        let mut unlocked = self.unlock_pending(state, metric);

        // XP unlocks award XP themselves, so repeat until nothing changes
        let mut xp_gained = unlocked.iter().any(|a| a.points > 0);
        while xp_gained {
            let more = self.unlock_pending(state, Metric::Xp);
            xp_gained = more.iter().any(|a| a.points > 0);
            unlocked.extend(more);
        }

        unlocked
    }

    fn unlock_pending(
        &self,
        state: &mut ProgressionState,
        metric: Metric,
    ) -> Vec<AchievementDefinition> {
        let pending: Vec<AchievementDefinition> = self
            .catalog
            .iter()
            .filter(|definition| definition.metric == metric)
            .filter(|definition| !state.is_unlocked(&definition.id))
            .filter(|definition| current_value(state, definition) >= definition.target)
            .cloned()
            .collect();

        for definition in &pending {
            state.unlocked.push(definition.id.clone());
            state.xp += definition.points;
            state.last_unlocked = Some(definition.clone());

            tracing::info!(
                achievement = %definition.id,
                points = definition.points,
                xp = state.xp,
                "Achievement unlocked"
            );
        }

        pending
    }

    /// Catalog progress for display
    pub fn progress(&self, name: &str, state: &ProgressionState) -> ProgressView {
        let mut achievements: Vec<AchievementProgress> = self
            .catalog
            .iter()
            .map(|definition| AchievementProgress {
                current: current_value(state, definition).min(definition.target),
                unlocked: state.is_unlocked(&definition.id),
                definition: definition.clone(),
            })
            .collect();

        achievements.sort_by(|a, b| {
            b.unlocked
                .cmp(&a.unlocked)
                .then_with(|| a.definition.title.cmp(&b.definition.title))
        });

        let rank = state.rank();
        ProgressView {
            name: name.to_string(),
            xp: state.xp,
            rank,
            next_rank_xp: rank.next_threshold(),
            state: state.clone(),
            achievements,
        }
    }
}

/// Value of `definition`'s metric in `state`
///
/// The composite `all` metric is the smallest activity counter, clamped to
/// the entry's target.
pub fn current_value(state: &ProgressionState, definition: &AchievementDefinition) -> u32 {
    match definition.metric {
        Metric::Login => u32::from(state.logged_in),
        Metric::Search => state.search_count,
        Metric::Open => state.opened_count,
        Metric::Favorite => state.favorite_count,
        Metric::Comment => state.comment_count,
        Metric::Xp => state.xp,
        Metric::All => [
            state.search_count,
            state.opened_count,
            state.favorite_count,
            state.comment_count,
            definition.target,
        ]
        .into_iter()
        .min()
        .unwrap_or(0),
    }
}

/// Progression state of every logged-in display name
pub struct SessionRegistry {
    engine: ProgressionEngine,
    sessions: RwLock<HashMap<String, ProgressionState>>,
}

impl SessionRegistry {
    pub fn new(engine: ProgressionEngine) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Starts (or restarts) a session; prior progress under `name` is discarded
    pub async fn login(&self, name: &str) -> ProgressView {
        let state = self.engine.login();
        let view = self.engine.progress(name, &state);

        self.sessions.write().await.insert(name.to_string(), state);
        tracing::info!(name = %name, xp = view.xp, "Session started");

        view
    }

    /// Returns false when there was no session
    pub async fn logout(&self, name: &str) -> bool {
        let removed = self.sessions.write().await.remove(name).is_some();
        if removed {
            tracing::info!(name = %name, "Session ended");
        }
        removed
    }

    /// Applies an event to a live session; `None` when `name` is not logged in
    pub async fn record(
        &self,
        name: &str,
        event: ProgressionEvent,
    ) -> Option<Vec<AchievementDefinition>> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.get_mut(name)?;
        Some(self.engine.apply(state, event))
    }

    pub async fn snapshot(&self, name: &str) -> Option<ProgressView> {
        let sessions = self.sessions.read().await;
        sessions
            .get(name)
            .map(|state| self.engine.progress(name, state))
    }

    /// Clears the pending unlock notification
    pub async fn dismiss_notification(&self, name: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(name) {
            Some(state) => {
                state.last_unlocked = None;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_catalog, ALL_METRIC_TARGET};

    fn engine() -> ProgressionEngine {
        ProgressionEngine::new(default_catalog())
    }

    fn points(id: &str) -> u32 {
        default_catalog()
            .into_iter()
            .find(|a| a.id == id)
            .map(|a| a.points)
            .unwrap()
    }

    fn ids(unlocked: &[AchievementDefinition]) -> Vec<&str> {
        unlocked.iter().map(|a| a.id.as_str()).collect()
    }

    fn repeat(engine: &ProgressionEngine, state: &mut ProgressionState, event: ProgressionEvent, n: u32) {
        for _ in 0..n {
            engine.apply(state, event);
        }
    }

    #[test]
    fn test_login_unlocks_welcome() {
        let state = engine().login();
        assert_eq!(state.unlocked, vec!["login_1"]);
        assert_eq!(state.xp, points("login_1"));
        assert_eq!(
            state.last_unlocked.as_ref().map(|a| a.id.as_str()),
            Some("login_1")
        );
    }

    #[test]
    fn test_login_resets_prior_state() {
        let engine = engine();
        let mut state = engine.login();
        repeat(&engine, &mut state, ProgressionEvent::SearchSucceeded, 7);
        repeat(&engine, &mut state, ProgressionEvent::CommentAdded, 2);

        engine.apply(&mut state, ProgressionEvent::Login);

        assert_eq!(state.unlocked, vec!["login_1"]);
        assert_eq!(state.xp, points("login_1"));
        assert_eq!(state.search_count, 0);
        assert_eq!(state.comment_count, 0);
    }

    #[test]
    fn test_search_5_unlocks_exactly_once() {
        let engine = engine();
        let mut state = engine.login();

        let mut search_5_events = Vec::new();
        for count in 1..=5 {
            let unlocked = engine.apply(&mut state, ProgressionEvent::SearchSucceeded);
            if ids(&unlocked).contains(&"search_5") {
                search_5_events.push(count);
            }
        }
        assert_eq!(search_5_events, vec![5]);

        let xp = state.xp;
        let again = engine.evaluate(&mut state, Metric::Search);
        assert!(again.is_empty());
        assert_eq!(state.xp, xp);
        assert_eq!(state.unlocked.iter().filter(|id| *id == "search_5").count(), 1);
        assert_eq!(
            xp,
            points("login_1") + points("search_1") + points("search_5")
        );
    }

    #[test]
    fn test_all_requires_every_counter() {
        let engine = engine();
        let mut state = engine.login();

        repeat(&engine, &mut state, ProgressionEvent::SearchSucceeded, ALL_METRIC_TARGET);
        repeat(&engine, &mut state, ProgressionEvent::ItemOpened, ALL_METRIC_TARGET);
        repeat(&engine, &mut state, ProgressionEvent::FavoriteAdded, ALL_METRIC_TARGET);
        repeat(&engine, &mut state, ProgressionEvent::CommentAdded, ALL_METRIC_TARGET - 1);
        assert!(!state.is_unlocked("all_5"));

        let unlocked = engine.apply(&mut state, ProgressionEvent::CommentAdded);
        assert!(ids(&unlocked).contains(&"all_5"));
        assert!(state.is_unlocked("all_5"));
    }

    #[test]
    fn test_all_is_never_relocked() {
        let engine = engine();
        let mut state = engine.login();
        for event in [
            ProgressionEvent::SearchSucceeded,
            ProgressionEvent::ItemOpened,
            ProgressionEvent::FavoriteAdded,
            ProgressionEvent::CommentAdded,
        ] {
            repeat(&engine, &mut state, event, ALL_METRIC_TARGET);
        }
        assert!(state.is_unlocked("all_5"));
        let xp = state.xp;

        repeat(&engine, &mut state, ProgressionEvent::SearchSucceeded, 3);

        assert!(state.is_unlocked("all_5"));
        assert_eq!(state.unlocked.iter().filter(|id| *id == "all_5").count(), 1);
        assert!(state.xp >= xp);
    }

    #[test]
    fn test_xp_achievements_chain() {
        let engine = engine();
        let mut state = engine.login();
        for event in [
            ProgressionEvent::SearchSucceeded,
            ProgressionEvent::ItemOpened,
            ProgressionEvent::FavoriteAdded,
            ProgressionEvent::CommentAdded,
        ] {
            repeat(&engine, &mut state, event, ALL_METRIC_TARGET);
        }

        assert!(state.xp >= 50);
        assert!(state.is_unlocked("xp_50"));
        assert_eq!(
            state.xp,
            state
                .unlocked
                .iter()
                .map(|id| points(id))
                .sum::<u32>()
        );
    }

    #[test]
    fn test_xp_changed_is_idempotent() {
        let engine = engine();
        let mut state = engine.login();
        let before = state.clone();

        let unlocked = engine.apply(&mut state, ProgressionEvent::XpChanged);

        assert!(unlocked.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_all_value_is_clamped() {
        let engine = engine();
        let mut state = engine.login();
        for event in [
            ProgressionEvent::SearchSucceeded,
            ProgressionEvent::ItemOpened,
            ProgressionEvent::FavoriteAdded,
            ProgressionEvent::CommentAdded,
        ] {
            repeat(&engine, &mut state, event, 9);
        }
        let all = default_catalog().into_iter().find(|a| a.id == "all_5").unwrap();
        assert_eq!(current_value(&state, &all), ALL_METRIC_TARGET);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut catalog = default_catalog();
        catalog.push(AchievementDefinition::new("", "Blank", "", 5, "", Metric::Search, 1));
        catalog.push(AchievementDefinition::new("zero", "Zero", "", 5, "", Metric::Search, 0));
        catalog.push(AchievementDefinition::new("search_1", "Dup", "", 99, "", Metric::Search, 1));

        let engine = ProgressionEngine::new(catalog);

        assert_eq!(engine.catalog().len(), default_catalog().len());
        let mut state = engine.login();
        engine.apply(&mut state, ProgressionEvent::SearchSucceeded);
        assert_eq!(state.xp, points("login_1") + points("search_1"));
    }

    #[test]
    fn test_progress_view_sorted_unlocked_first() {
        let engine = engine();
        let mut state = engine.login();
        repeat(&engine, &mut state, ProgressionEvent::SearchSucceeded, 2);

        let view = engine.progress("pisti", &state);

        let unlocked: Vec<bool> = view.achievements.iter().map(|a| a.unlocked).collect();
        let first_locked = unlocked.iter().position(|u| !u).unwrap();
        assert!(unlocked[first_locked..].iter().all(|u| !u));
        assert_eq!(first_locked, 2);
        assert!(view.achievements[..2]
            .windows(2)
            .all(|w| w[0].definition.title <= w[1].definition.title));

        let search_5 = view
            .achievements
            .iter()
            .find(|a| a.definition.id == "search_5")
            .unwrap();
        assert_eq!(search_5.current, 2);
        assert_eq!(view.rank, Rank::Novice);
        assert_eq!(view.next_rank_xp, Some(20));
    }

    #[tokio::test]
    async fn test_session_registry_lifecycle() {
        let registry = SessionRegistry::new(engine());

        assert!(registry
            .record("pisti", ProgressionEvent::SearchSucceeded)
            .await
            .is_none());

        let view = registry.login("pisti").await;
        assert_eq!(view.state.unlocked, vec!["login_1"]);

        let unlocked = registry
            .record("pisti", ProgressionEvent::SearchSucceeded)
            .await
            .unwrap();
        assert_eq!(ids(&unlocked), vec!["search_1"]);

        assert!(registry.dismiss_notification("pisti").await);
        let view = registry.snapshot("pisti").await.unwrap();
        assert_eq!(view.state.last_unlocked, None);
        assert_eq!(view.state.search_count, 1);

        assert!(registry.logout("pisti").await);
        assert!(registry.snapshot("pisti").await.is_none());
        assert!(!registry.logout("pisti").await);
    }
}
