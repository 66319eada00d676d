use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Counter an achievement's unlock condition is evaluated against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Login,
    Search,
    Open,
    Favorite,
    Comment,
    /// All four activity counters at once
    All,
    Xp,
}

/// Immutable catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    /// XP awarded on unlock
    pub points: u32,
    pub reward: String,
    pub metric: Metric,
    pub target: u32,
}

impl AchievementDefinition {
    pub fn new(
        id: &str,
        title: &str,
        description: &str,
        points: u32,
        reward: &str,
        metric: Metric,
        target: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            points,
            reward: reward.to_string(),
            metric,
            target,
        }
    }
}

/// Default target shared by the composite `all` achievement
pub const ALL_METRIC_TARGET: u32 = 5;

/// The built-in achievement catalog
#[rustfmt::skip]
pub fn default_catalog() -> Vec<AchievementDefinition> {
    use Metric::*;

    vec![
        AchievementDefinition::new("login_1", "Welcome aboard", "Log in for the first time.", 5, "Starter badge", Login, 1),
        AchievementDefinition::new("search_1", "First lookup", "Run a search that finds something.", 5, "Searcher badge", Search, 1),
        AchievementDefinition::new("search_5", "Curious mind", "Run 5 successful searches.", 10, "Magnifier frame", Search, 5),
        AchievementDefinition::new("search_20", "Archivist", "Run 20 successful searches.", 25, "Archivist title", Search, 20),
        AchievementDefinition::new("open_1", "Window shopper", "Open an item page.", 5, "Explorer badge", Open, 1),
        AchievementDefinition::new("open_10", "Deep diver", "Open 10 item pages.", 15, "Diver frame", Open, 10),
        AchievementDefinition::new("favorite_1", "Keeper", "Add your first favorite.", 5, "Heart badge", Favorite, 1),
        AchievementDefinition::new("favorite_5", "Collector", "Add 5 favorites.", 15, "Collector title", Favorite, 5),
        AchievementDefinition::new("comment_1", "First words", "Post a comment.", 5, "Chatter badge", Comment, 1),
        AchievementDefinition::new("comment_5", "Regular", "Post 5 comments.", 15, "Regular title", Comment, 5),
        AchievementDefinition::new("all_5", "All-rounder", "Reach 5 searches, opens, favorites and comments.", 60, "Golden frame", All, ALL_METRIC_TARGET),
        AchievementDefinition::new("xp_50", "Rising star", "Collect 50 XP.", 10, "Star badge", Xp, 50),
        AchievementDefinition::new("xp_150", "Hall of fame", "Collect 150 XP.", 30, "Crown badge", Xp, 150),
    ]
}

/// Display tier derived from total XP
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Novice,
    Explorer,
    Veteran,
    Elite,
    Legend,
}

/// Ascending XP thresholds; the highest threshold not above the XP wins
const RANK_THRESHOLDS: [(u32, Rank); 5] = [
    (0, Rank::Novice),
    (20, Rank::Explorer),
    (60, Rank::Veteran),
    (120, Rank::Elite),
    (200, Rank::Legend),
];

impl Rank {
    pub fn from_xp(xp: u32) -> Self {
        RANK_THRESHOLDS
            .iter()
            .rev()
            .find(|(threshold, _)| xp >= *threshold)
            .map(|(_, rank)| *rank)
            .unwrap_or(Rank::Novice)
    }

    /// XP needed for the next tier, `None` at the top
    pub fn next_threshold(self) -> Option<u32> {
        RANK_THRESHOLDS
            .iter()
            .map(|(threshold, rank)| (*threshold, *rank))
            .find(|(_, rank)| *rank > self)
            .map(|(threshold, _)| threshold)
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rank::Novice => "Novice",
            Rank::Explorer => "Explorer",
            Rank::Veteran => "Veteran",
            Rank::Elite => "Elite",
            Rank::Legend => "Legend",
        };
        write!(f, "{}", name)
    }
}
