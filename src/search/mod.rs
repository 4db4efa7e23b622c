pub mod exclude;
pub mod matcher;
pub mod parallel;
pub mod reader;
pub mod runner;
pub mod stats;
pub mod walker;

// Re-export main types for easier access
pub use reader::SearchFile;
pub use runner::{DiscoveredFile, Discovery, DiscoveryReport};
pub use stats::{SearchStats, SkipReason};
pub use walker::{CandidateFile, Walker};
