//! Exclusion filter
//!
//! Runs only after a tentative match. Filename rules are checked first
//! since they are cheap; content rules scan the whole cached/live block
//! sequence, deliberately unbounded by the include budget, so a late
//! exclusion marker still vetoes the file.

use crate::pattern::SearchPattern;
use crate::search::reader::SearchFile;
use crate::search::stats::{SearchStats, SkipReason};

/// Whether the pattern's exclusion rules veto a tentatively matched file.
///
/// A read error during the content scan also vetoes: an unverifiable match
/// degrades to "does not match", recorded as a content-search error, rather
/// than standing unconfirmed.
pub fn excluded(pattern: &SearchPattern, file: &mut SearchFile, stats: &mut SearchStats) -> bool {
    for glob in &pattern.exclude_fn {
        if glob.is_match(file.filename()) {
            return true;
        }
    }
    for re in &pattern.exclude_fn_re {
        if re.is_match(file.filename()) {
            return true;
        }
    }

    if pattern.exclude_contents.is_empty() && pattern.exclude_contents_re.is_empty() {
        return false;
    }

    let path = file.path().to_path_buf();
    let mut index = 0usize;
    loop {
        let (_, block) = match file.block(index) {
            Ok(Some(b)) => b,
            Ok(None) => return false,
            Err(e) => {
                tracing::debug!("Exclusion scan failed for {}: {e:#}", path.display());
                stats.record(SkipReason::ContentsSearchError, &path);
                return true;
            }
        };
        for needle in &pattern.exclude_contents {
            if block.contains(needle) {
                return true;
            }
        }
        for re in &pattern.exclude_contents_re {
            if re.is_match(block) {
                return true;
            }
        }
        index += 1;
    }
}
