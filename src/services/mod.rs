pub mod clock;
pub mod fallback;
pub mod features;
pub mod neighbors;
pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod tag_cache;
pub mod tagger;

pub use recommendations::{RecommendationService, RecommendationSettings};
pub use tag_cache::TagCache;
