//! Configuration for a discovery run
//!
//! This module handles loading, parsing, and validating the search
//! configuration from YAML files, with sensible defaults for every knob.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution mode for the discovery dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Decide sequential vs parallel from the candidate file count
    #[default]
    Auto,
    /// Always single-threaded
    Sequential,
    /// Always multi-threaded
    Parallel,
}

/// Main configuration for the file search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Skip symlinked entries during tree traversal
    pub ignore_symlinks: bool,

    /// Global upper bound on file size (bytes); larger files are never scanned
    pub log_filesize_limit: u64,

    /// Default line budget for content scans when a pattern sets none
    pub filesearch_lines_limit: usize,

    /// Directory name globs that are never recursed into
    pub fn_ignore_dirs: Vec<String>,

    /// Full-path globs that are never recursed into
    pub fn_ignore_paths: Vec<String>,

    /// Filename globs whose content is never scanned
    pub fn_ignore_files: Vec<String>,

    /// Exclude image and compressed binary files via a cheap pre-filter
    pub ignore_images: bool,

    /// Group keys exempted from the stop-after-first-match short-circuit
    pub shared_group_keys: Vec<String>,

    /// Treat pattern rejections as lint failures surfaced at end of run
    pub strict: bool,

    /// Log cumulative search timing at info level
    pub profile_runtime: bool,

    /// Execution mode for the dispatch loop
    pub scan_mode: ScanMode,

    /// Hard limit on worker threads (0 = derive from thread_percentage)
    pub max_threads: usize,

    /// Percentage of CPU cores to use for parallel dispatch
    pub thread_percentage: u8,

    /// Minimum candidate count before auto mode goes parallel
    pub min_files_for_parallel: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ignore_symlinks: false,
            log_filesize_limit: 50_000_000,
            filesearch_lines_limit: 1000,
            fn_ignore_dirs: vec![
                ".git".to_string(),
                ".svn".to_string(),
                ".hg".to_string(),
                "node_modules".to_string(),
                "__pycache__".to_string(),
                ".pytest_cache".to_string(),
                "target".to_string(),
                "venv".to_string(),
                ".venv".to_string(),
            ],
            fn_ignore_paths: vec![],
            fn_ignore_files: vec![".DS_Store".to_string(), "*.lock".to_string()],
            ignore_images: true,
            shared_group_keys: vec![],
            strict: false,
            profile_runtime: false,
            scan_mode: ScanMode::Auto,
            max_threads: 0,
            thread_percentage: 75,
            min_files_for_parallel: 50,
        }
    }
}

impl SearchConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: SearchConfig = serde_yml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&PathBuf>) -> Self {
        match path {
            Some(p) if p.exists() => Self::load_from_file(p).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.filesearch_lines_limit == 0 {
            anyhow::bail!("filesearch_lines_limit cannot be 0");
        }
        if self.log_filesize_limit == 0 {
            anyhow::bail!("log_filesize_limit cannot be 0");
        }
        if self.thread_percentage == 0 || self.thread_percentage > 100 {
            anyhow::bail!("thread_percentage must be between 1 and 100");
        }
        Ok(())
    }
}
