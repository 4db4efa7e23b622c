//! Candidate file discovery
//!
//! Expands root paths into a flat, pre-order list of candidate files,
//! applying the symlink, ignore-directory, and ignore-path filters, plus a
//! guard that refuses to recurse into what looks like the crate's own
//! source tree. Each path is visited once by construction; dedup across
//! overlapping roots happens downstream.

use crate::config::SearchConfig;
use crate::search::stats::{SearchStats, SkipReason};
use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use std::path::{Path, PathBuf};

/// File names that fingerprint a development source tree. A directory whose
/// plain files include every one of these is refused outright.
const SOURCE_TREE_FINGERPRINT: &[&str] = &[
    "Cargo.toml",
    "LICENSE",
    "CHANGELOG.md",
    "README.md",
    ".gitignore",
];

/// One file produced by the tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub size: Option<u64>,
}

/// Recursive directory walker with exclusion rules
pub struct Walker {
    ignore_symlinks: bool,
    ignore_dirs: Vec<GlobMatcher>,
    ignore_paths: Vec<GlobMatcher>,
}

impl Walker {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<GlobMatcher>> {
            patterns
                .iter()
                .map(|p| {
                    let trimmed = p.trim_end_matches('/');
                    Glob::new(trimmed)
                        .map(|g| g.compile_matcher())
                        .with_context(|| format!("Invalid ignore glob: {p}"))
                })
                .collect()
        };
        Ok(Walker {
            ignore_symlinks: config.ignore_symlinks,
            ignore_dirs: compile(&config.fn_ignore_dirs)?,
            ignore_paths: compile(&config.fn_ignore_paths)?,
        })
    }

    /// Expand roots into a flat, pre-order candidate list
    pub fn collect(&self, roots: &[PathBuf], stats: &mut SearchStats) -> Vec<CandidateFile> {
        let mut out = Vec::new();
        for root in roots {
            self.visit(root, &mut out, stats);
        }
        out
    }

    fn visit(&self, path: &Path, out: &mut Vec<CandidateFile>, stats: &mut SearchStats) {
        let link_meta = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Couldn't stat {}: {}", path.display(), e);
                return;
            }
        };
        if link_meta.file_type().is_symlink() && self.ignore_symlinks {
            stats.record(SkipReason::Symlink, path);
            return;
        }

        // Classify through the link target when symlinks are followed
        let meta = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Couldn't stat {}: {}", path.display(), e);
                return;
            }
        };

        if meta.is_file() {
            out.push(CandidateFile {
                path: path.to_path_buf(),
                size: Some(meta.len()),
            });
        } else if meta.is_dir() {
            if self.dir_is_ignored(path) {
                stats.record(SkipReason::IgnoreDirs, path);
                return;
            }
            if looks_like_source_tree(path) {
                tracing::error!(
                    "Refusing to search inside what looks like a source checkout: {}",
                    path.display()
                );
                return;
            }
            let mut entries: Vec<PathBuf> = match std::fs::read_dir(path) {
                Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
                Err(e) => {
                    tracing::warn!("Couldn't list {}: {}", path.display(), e);
                    return;
                }
            };
            entries.sort();
            for entry in entries {
                self.visit(&entry, out, stats);
            }
        } else {
            // Pipes, sockets and other special files
            stats.record(SkipReason::NotAFile, path);
        }
    }

    fn dir_is_ignored(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy());
        if let Some(name) = &name {
            if self.ignore_dirs.iter().any(|g| g.is_match(name.as_ref())) {
                return true;
            }
        }
        self.ignore_paths.iter().any(|g| g.is_match(path))
    }
}

/// True when the directory's plain files include every fingerprint name
fn looks_like_source_tree(path: &Path) -> bool {
    let Ok(read_dir) = std::fs::read_dir(path) else {
        return false;
    };
    let filenames: Vec<String> = read_dir
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    !filenames.is_empty()
        && SOURCE_TREE_FINGERPRINT
            .iter()
            .all(|fp| filenames.iter().any(|f| f == fp))
}
