pub mod behavior;
pub mod favorites;
pub mod progression;
pub mod providers;
pub mod recommendations;
pub mod suggestions;

pub use behavior::{BehaviorStore, BehaviorTracker, HistoryLimits};
pub use favorites::{FavoritesService, FavoritesStore};
pub use progression::{ProgressionEngine, ProgressionEvent, SessionRegistry};
pub use providers::ContentProvider;
pub use recommendations::{RecommendationEngine, RecommendationLimits, RequestTracker};
