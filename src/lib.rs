//! # Logsift - Bounded File Discovery for Tool Output Trees
//!
//! Logsift scans arbitrary directory trees of heterogeneous tool output and
//! finds the files that satisfy registered interest patterns, reading each
//! file at most once and scanning no more of it than a pattern requires.
//!
//! ## Features
//!
//! - **Cost-ordered matching**: pattern groups run cheapest-first, so most
//!   files are settled by a filename check or a shallow content scan
//! - **Bounded scans**: line and byte budgets per pattern, with exact
//!   budget accounting even when reads overshoot a block boundary
//! - **Read-once caching**: scanned blocks are cached so a downstream
//!   parser can re-read a matched file without touching the disk again
//! - **Parallel dispatch**: file-granular worker pool with results
//!   identical to the sequential path
//!
//! ## Quick Start
//!
//! ```no_run
//! use logsift::{Discovery, SearchConfig};
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let patterns = r#"
//! fastp:
//!   fn: "*.json"
//!   contents: "fastp_version"
//!   num_lines: 10
//! "#;
//! let discovery = Discovery::from_yaml(SearchConfig::default(), patterns)?;
//! let report = discovery.run(&[PathBuf::from("./analysis")])?;
//! for (key, files) in &report.files {
//!     println!("{key}: {} files", files.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pattern;
pub mod search;

pub use config::{ScanMode, SearchConfig};
pub use pattern::{groups_from_yaml, RawPattern, SearchPattern, SearchPlan};
pub use search::{DiscoveredFile, Discovery, DiscoveryReport, SearchFile, SearchStats, SkipReason};

/// Result type alias for logsift operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
