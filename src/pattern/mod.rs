pub mod plan;
pub mod spec;

// Re-export main types for easier access
pub use plan::{CostBucket, SearchPlan};
pub use spec::{groups_from_yaml, OneOrMany, PatternGroup, RawPattern, SearchPattern};
