mod achievement;
mod behavior;
mod favorites;
mod item;

pub use achievement::{default_catalog, AchievementDefinition, Metric, Rank, ALL_METRIC_TARGET};
pub use behavior::{BehaviorRecord, ViewedItem, MIN_QUERY_LEN};
pub use favorites::{Comment, Favorite, NewComment, NewFavorite, MAX_COMMENT_LEN};
pub use item::{parse_year, split_genres, Item, ItemKind};
