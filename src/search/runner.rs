//! Discovery dispatch
//!
//! Ties the pieces together: expand roots into candidates, run the global
//! pre-checks, then evaluate the cost-ordered plan against each file. A file
//! whose first match comes from a non-shared pattern is claimed on the spot
//! and no later group sees it; shared matches keep the file in play.

use crate::config::{ScanMode, SearchConfig};
use crate::pattern::{groups_from_yaml, PatternGroup, RawPattern, SearchPlan};
use crate::search::exclude;
use crate::search::matcher;
use crate::search::parallel;
use crate::search::reader::SearchFile;
use crate::search::stats::{SearchStats, SkipReason};
use crate::search::walker::{CandidateFile, Walker};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Images explicitly named for ingestion bypass the image pre-filter
static EXPORTED_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".+_mqc\.(png|jpe?g|gif|webp|tiff)$").expect("static regex is valid")
});

/// Compression encodings the reader cannot transparently decode. Gzip is
/// absent on purpose, those files are left to the patterns.
const OPAQUE_COMPRESSED_EXTENSIONS: &[&str] = &[".bz2", ".xz", ".lzma", ".br", ".Z", ".zst"];

/// One confirmed match: which file, relative to where, for which group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub filename: String,
    pub root: PathBuf,
    pub key: String,
}

impl DiscoveredFile {
    /// Full path of the matched file
    pub fn path(&self) -> PathBuf {
        self.root.join(&self.filename)
    }
}

/// Everything a discovery run produces
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Confirmed matches per group key, sorted by path
    pub files: BTreeMap<String, Vec<DiscoveredFile>>,
    /// Skip-reason and per-group match accounting
    pub stats: SearchStats,
    /// Cumulative scan time attributed to each group
    pub runtimes: BTreeMap<String, Duration>,
    /// Pattern rejections collected in strict mode
    pub lint_errors: Vec<String>,
}

impl DiscoveryReport {
    /// Total number of confirmed matches across all groups
    pub fn match_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

/// Outcome of evaluating one candidate file, fanned in by the collector
#[derive(Debug)]
pub(crate) struct FileVerdict {
    pub(crate) records: Vec<DiscoveredFile>,
    pub(crate) stats: SearchStats,
    pub(crate) runtimes: BTreeMap<String, Duration>,
}

impl FileVerdict {
    fn new() -> Self {
        FileVerdict {
            records: Vec::new(),
            stats: SearchStats::default(),
            runtimes: BTreeMap::new(),
        }
    }
}

/// A compiled, reusable discovery engine
pub struct Discovery {
    config: SearchConfig,
    plan: SearchPlan,
    ignore_files: GlobSet,
    shared_keys: BTreeSet<String>,
    lint_errors: Vec<String>,
}

impl Discovery {
    /// Compile raw pattern groups and build the evaluation plan.
    ///
    /// Individual pattern rejections are logged and dropped, never fatal;
    /// in strict mode they are also surfaced in the report's lint errors.
    pub fn new(config: SearchConfig, raw_groups: Vec<(String, Vec<RawPattern>)>) -> Result<Self> {
        config.validate()?;

        let mut lint_errors = Vec::new();
        let groups: Vec<PatternGroup> = raw_groups
            .into_iter()
            .filter_map(|(key, raws)| {
                PatternGroup::compile(&key, raws, config.strict, &mut lint_errors)
            })
            .collect();
        let plan = SearchPlan::build(groups);

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.fn_ignore_files {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("Invalid fn_ignore_files glob: {pattern}"))?,
            );
        }
        let ignore_files = builder.build().context("Couldn't build ignore-file set")?;

        let shared_keys = config.shared_group_keys.iter().cloned().collect();

        Ok(Discovery {
            config,
            plan,
            ignore_files,
            shared_keys,
            lint_errors,
        })
    }

    /// Convenience constructor from a YAML mapping of group key to records
    pub fn from_yaml(config: SearchConfig, yaml: &str) -> Result<Self> {
        let raw_groups = groups_from_yaml(yaml)?;
        Self::new(config, raw_groups)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of pattern groups in the compiled plan
    pub fn group_count(&self) -> usize {
        self.plan.group_count()
    }

    /// Search the given root paths and return the full report.
    ///
    /// The only fatal error is an empty root list; everything that goes
    /// wrong below a single file degrades to a skip-reason statistic.
    pub fn run(&self, roots: &[PathBuf]) -> Result<DiscoveryReport> {
        if roots.is_empty() {
            anyhow::bail!("No root paths given to search");
        }
        let started = Instant::now();

        let mut report = DiscoveryReport {
            lint_errors: self.lint_errors.clone(),
            ..Default::default()
        };

        let walker = Walker::new(&self.config)?;
        let mut candidates = walker.collect(roots, &mut report.stats);

        // Overlapping roots may list the same file twice
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
        candidates.retain(|c| seen.insert(c.path.clone()));
        let total = candidates.len();
        tracing::debug!("Searching {total} candidate files in {} roots", roots.len());

        let workers = parallel::optimal_workers(&self.config, total);
        let go_parallel = match self.config.scan_mode {
            ScanMode::Sequential => false,
            ScanMode::Parallel => workers > 1,
            ScanMode::Auto => workers > 1 && total >= self.config.min_files_for_parallel,
        };

        let verdicts = if go_parallel {
            parallel::run(self, candidates, workers)?
        } else {
            candidates.iter().map(|c| self.evaluate(c)).collect()
        };

        for verdict in verdicts {
            report.stats.merge(verdict.stats);
            for (key, duration) in verdict.runtimes {
                *report.runtimes.entry(key).or_default() += duration;
            }
            for record in verdict.records {
                report.files.entry(record.key.clone()).or_default().push(record);
            }
        }

        // Deterministic output regardless of execution strategy
        for records in report.files.values_mut() {
            records.sort_by(|a, b| a.path().cmp(&b.path()));
        }

        for line in report.stats.summary() {
            tracing::debug!("{line}");
        }
        if self.config.profile_runtime {
            tracing::info!(
                "Searched {total} files in {:.2}s, {} matches",
                started.elapsed().as_secs_f64(),
                report.match_count()
            );
            let mut timed: Vec<(&String, &Duration)> = report.runtimes.iter().collect();
            timed.sort_by(|a, b| b.1.cmp(a.1));
            for (key, duration) in timed.into_iter().take(10) {
                tracing::info!("Search pattern '{key}' took {:.3}s", duration.as_secs_f64());
            }
        }

        Ok(report)
    }

    /// Evaluate every applicable pattern group against one candidate file
    pub(crate) fn evaluate(&self, candidate: &CandidateFile) -> FileVerdict {
        let mut verdict = FileVerdict::new();
        let path = &candidate.path;

        let size = match candidate.size {
            Some(size) => size,
            None => match std::fs::metadata(path) {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => {
                    verdict.stats.record(SkipReason::NotAFile, path);
                    return verdict;
                }
            },
        };
        if size > self.config.log_filesize_limit {
            verdict.stats.record(SkipReason::FilesizeLimit, path);
            return verdict;
        }

        let mut file = SearchFile::new(path.clone());
        if self.config.ignore_images && binary_prefilter(file.filename()) {
            tracing::debug!("Skipping likely-binary file: {}", path.display());
            verdict.stats.record(SkipReason::NoMatch, path);
            return verdict;
        }
        let is_ignore_file = self.ignore_files.is_match(file.filename());

        let mut hit_any = false;
        let mut claimed = false;
        for group in self.plan.iter() {
            let group_start = Instant::now();
            for pattern in &group.patterns {
                if pattern.skip {
                    continue;
                }
                if !matcher::pattern_matches(
                    pattern,
                    &mut file,
                    is_ignore_file,
                    self.config.filesearch_lines_limit,
                    &mut verdict.stats,
                ) {
                    continue;
                }
                hit_any = true;
                if !exclude::excluded(pattern, &mut file, &mut verdict.stats) {
                    verdict.stats.record_match(&group.key, path);
                    verdict.records.push(DiscoveredFile {
                        filename: file.filename().to_string(),
                        root: file.root().to_path_buf(),
                        key: group.key.clone(),
                    });
                }
                // An excluded match still claims the file for a non-shared
                // pattern, so cheaper groups cannot leak it to later ones.
                if !pattern.shared && !self.shared_keys.contains(&group.key) {
                    claimed = true;
                }
                break;
            }
            *verdict.runtimes.entry(group.key.clone()).or_default() += group_start.elapsed();
            if claimed {
                break;
            }
        }

        if !hit_any {
            verdict.stats.record(SkipReason::NoMatch, path);
        }
        file.close();
        verdict
    }
}

/// Cheap extension-based filter for files that can never hold scannable text
fn binary_prefilter(filename: &str) -> bool {
    if EXPORTED_IMAGE_RE.is_match(filename) {
        return false;
    }
    if let Some(mime) = mime_guess::from_path(filename).first() {
        if mime.type_() == mime_guess::mime::IMAGE {
            return true;
        }
    }
    OPAQUE_COMPRESSED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}
