//! Skip-reason accounting
//!
//! Diagnostics only: these sets never drive control flow. The runner logs a
//! summary at the end of a run so it is obvious why files were left out.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Why a file (or directory subtree) was left out of the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    Symlink,
    NotAFile,
    IgnorePattern,
    FilesizeLimit,
    SpecificMaxFilesize,
    NoMatch,
    IgnoreDirs,
    ContentsSearchError,
}

impl SkipReason {
    /// Stable key used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Symlink => "skipped_symlinks",
            SkipReason::NotAFile => "skipped_not_a_file",
            SkipReason::IgnorePattern => "skipped_ignore_pattern",
            SkipReason::FilesizeLimit => "skipped_filesize_limit",
            SkipReason::SpecificMaxFilesize => "skipped_module_specific_max_filesize",
            SkipReason::NoMatch => "skipped_no_match",
            SkipReason::IgnoreDirs => "skipped_directory_fn_ignore_dirs",
            SkipReason::ContentsSearchError => "skipped_file_contents_search_errors",
        }
    }
}

/// Per-run search statistics: skip reasons and matched paths per group
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub skipped: BTreeMap<SkipReason, BTreeSet<PathBuf>>,
    pub matched: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl SearchStats {
    pub fn record(&mut self, reason: SkipReason, path: &Path) {
        self.skipped.entry(reason).or_default().insert(path.to_path_buf());
    }

    pub fn record_match(&mut self, key: &str, path: &Path) {
        self.matched.entry(key.to_string()).or_default().insert(path.to_path_buf());
    }

    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).map_or(0, BTreeSet::len)
    }

    pub fn contains(&self, reason: SkipReason, path: &Path) -> bool {
        self.skipped.get(&reason).is_some_and(|s| s.contains(path))
    }

    /// Merge another stats object into this one (parallel fan-in)
    pub fn merge(&mut self, other: SearchStats) {
        for (reason, paths) in other.skipped {
            self.skipped.entry(reason).or_default().extend(paths);
        }
        for (key, paths) in other.matched {
            self.matched.entry(key).or_default().extend(paths);
        }
    }

    /// One-line-per-reason summary, largest set first
    pub fn summary(&self) -> Vec<String> {
        let mut entries: Vec<(&SkipReason, usize)> = self
            .skipped
            .iter()
            .filter(|(_, paths)| !paths.is_empty())
            .map(|(reason, paths)| (reason, paths.len()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .map(|(reason, count)| format!("{}: {}", reason.as_str(), count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_summary() {
        let mut stats = SearchStats::default();
        stats.record(SkipReason::NoMatch, Path::new("/a"));
        stats.record(SkipReason::NoMatch, Path::new("/b"));
        stats.record(SkipReason::Symlink, Path::new("/c"));
        // Duplicate paths collapse
        stats.record(SkipReason::NoMatch, Path::new("/a"));

        assert_eq!(stats.skipped_count(SkipReason::NoMatch), 2);
        assert!(stats.contains(SkipReason::Symlink, Path::new("/c")));

        let summary = stats.summary();
        assert_eq!(summary[0], "skipped_no_match: 2");
        assert_eq!(summary[1], "skipped_symlinks: 1");
    }

    #[test]
    fn test_merge() {
        let mut a = SearchStats::default();
        a.record(SkipReason::NoMatch, Path::new("/a"));
        let mut b = SearchStats::default();
        b.record(SkipReason::NoMatch, Path::new("/b"));
        b.record_match("fastp", Path::new("/c"));

        a.merge(b);
        assert_eq!(a.skipped_count(SkipReason::NoMatch), 2);
        assert!(a.matched["fastp"].contains(Path::new("/c")));
    }
}
