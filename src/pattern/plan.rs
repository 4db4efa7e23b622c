//! Cost-ordered search plan
//!
//! Groups are assigned to one of seven cost buckets, cheapest matching
//! strategy first, and sorted inside each bucket so that patterns with a
//! shallower scan depth run first. The ordering is purely an optimization:
//! the final match set does not depend on it, only the amount of work saved
//! by the stop-after-first-match short-circuit does.

use super::spec::PatternGroup;

/// Number of cost buckets in a plan
pub const BUCKET_COUNT: usize = 7;

/// Cost class for one pattern group, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostBucket {
    /// Filename matching only
    FilenameOnly = 0,
    /// Literal substrings with a line budget
    SubstringBoundedLines = 1,
    /// Literal substrings with a file size gate
    SubstringBoundedBytes = 2,
    /// Literal substrings, unbounded
    SubstringUnbounded = 3,
    /// Content regexes with a line budget
    RegexBoundedLines = 4,
    /// Content regexes with a file size gate
    RegexBoundedBytes = 5,
    /// Content regexes, unbounded
    RegexUnbounded = 6,
}

impl CostBucket {
    /// Classify a group by the most expensive requirement of any of its patterns
    pub fn classify(group: &PatternGroup) -> CostBucket {
        let any_regex = group.patterns.iter().any(|p| !p.contents_re.is_empty());
        let any_substr = group.patterns.iter().any(|p| !p.contents.is_empty());
        let any_lines = group.patterns.iter().any(|p| p.num_lines.is_some());
        let any_bytes = group.patterns.iter().any(|p| p.max_filesize.is_some());

        if any_regex {
            if any_lines {
                CostBucket::RegexBoundedLines
            } else if any_bytes {
                CostBucket::RegexBoundedBytes
            } else {
                CostBucket::RegexUnbounded
            }
        } else if any_substr {
            if any_lines {
                CostBucket::SubstringBoundedLines
            } else if any_bytes {
                CostBucket::SubstringBoundedBytes
            } else {
                CostBucket::SubstringUnbounded
            }
        } else {
            CostBucket::FilenameOnly
        }
    }
}

/// Ordered evaluation plan: seven buckets of groups, each bucket internally
/// sorted by required scan depth
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    pub buckets: [Vec<PatternGroup>; BUCKET_COUNT],
}

impl SearchPlan {
    /// Build the plan from compiled groups, preserving registration order
    /// among groups with equal depth.
    pub fn build(groups: Vec<PatternGroup>) -> SearchPlan {
        let mut plan = SearchPlan::default();

        let mut skipped = Vec::new();
        for group in groups {
            if group.patterns.iter().any(|p| p.skip) {
                skipped.push(group.key.clone());
            }
            let bucket = CostBucket::classify(&group);
            plan.buckets[bucket as usize].push(group);
        }

        // Since a group can hold several patterns, sort by the slowest one.
        let max_lines =
            |g: &PatternGroup| g.patterns.iter().map(|p| p.num_lines.unwrap_or(0)).max().unwrap_or(0);
        let max_bytes =
            |g: &PatternGroup| g.patterns.iter().map(|p| p.max_filesize.unwrap_or(0)).max().unwrap_or(0);

        plan.buckets[CostBucket::SubstringBoundedLines as usize].sort_by_key(max_lines);
        plan.buckets[CostBucket::RegexBoundedLines as usize].sort_by_key(max_lines);
        plan.buckets[CostBucket::SubstringBoundedBytes as usize].sort_by_key(max_bytes);
        plan.buckets[CostBucket::RegexBoundedBytes as usize].sort_by_key(max_bytes);

        if !skipped.is_empty() {
            tracing::info!("Skipping {} file search patterns", skipped.len());
            tracing::debug!("Skipping search patterns: {}", skipped.join(", "));
        }

        plan
    }

    /// Iterate groups in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &PatternGroup> {
        self.buckets.iter().flatten()
    }

    /// Total number of groups across all buckets
    pub fn group_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
