//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (TextGenerator, SearchProvider, etc.)
//! but are themselves concrete structs, not traits.

pub mod cache;
pub mod generation;
mod questionnaire;
mod search;

pub use cache::{CacheReport, CacheStats, HitRates, TieredCache};
pub use generation::{
    default_strategies, tree_cache_key, GeneratedTree, GenerationService, PromptDetail, Strategy,
    TreeSource,
};
pub use questionnaire::{QuestionnaireService, Session, Step};
pub use search::{rank, relevance, SearchService};
