//! Bounded content matching
//!
//! Evaluates one compiled search pattern against one cached reader. Content
//! is scanned block by block against a running line budget; a substring hit
//! found inside an over-read block only counts if the hit itself starts
//! within the budget (overshoot correction), and content regexes are tested
//! only against the lines still inside the remaining budget.

use crate::pattern::SearchPattern;
use crate::search::reader::SearchFile;
use crate::search::stats::{SearchStats, SkipReason};

/// Evaluate one pattern against one file.
///
/// `is_ignore_file` marks filenames on the global ignore list: those are
/// never content-scanned, though filename-only patterns may still claim
/// them. `default_lines_limit` is the line budget applied when the pattern
/// sets none.
pub fn pattern_matches(
    pattern: &SearchPattern,
    file: &mut SearchFile,
    is_ignore_file: bool,
    default_lines_limit: usize,
    stats: &mut SearchStats,
) -> bool {
    // Pattern-specific filesize gate, a hard stop before any scanning
    if let (Some(max), Some(size)) = (pattern.max_filesize, file.filesize()) {
        if size > max {
            let path = file.path().to_path_buf();
            stats.record(SkipReason::SpecificMaxFilesize, &path);
            return false;
        }
    }

    if let Some(glob) = &pattern.fn_glob {
        if !glob.is_match(file.filename()) {
            return false;
        }
    }
    if let Some(re) = &pattern.fn_re {
        if !re.is_match(file.filename()) {
            return false;
        }
    }

    // Filename match alone is sufficient without content selectors
    if !pattern.has_content_selectors() {
        return true;
    }

    if is_ignore_file {
        let path = file.path().to_path_buf();
        stats.record(SkipReason::IgnorePattern, &path);
        return false;
    }

    let budget = pattern.num_lines.unwrap_or(default_lines_limit);
    let mut matched_strings = vec![false; pattern.contents.len()];
    let mut matched_regexes = vec![false; pattern.contents_re.len()];
    let mut total_lines = 0usize;
    let mut index = 0usize;
    let path = file.path().to_path_buf();

    loop {
        let (line_count, block) = match file.block(index) {
            Ok(Some(b)) => b,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Content search failed for {}: {e:#}", path.display());
                stats.record(SkipReason::ContentsSearchError, &path);
                return false;
            }
        };

        for (qi, query) in pattern.contents.iter().enumerate() {
            if matched_strings[qi] {
                continue;
            }
            if let Some(hit) = block.find(query) {
                if total_lines + line_count > budget {
                    // The block was read past the budget; the hit only counts
                    // if it starts on a line that is still inside it.
                    let lines_including_hit = block[..hit].matches('\n').count() + 1;
                    if total_lines + lines_including_hit <= budget {
                        matched_strings[qi] = true;
                    }
                } else {
                    matched_strings[qi] = true;
                }
            }
        }

        for (ri, re) in pattern.contents_re.iter().enumerate() {
            if matched_regexes[ri] {
                continue;
            }
            // Only the lines that remain inside the budget are eligible
            let remaining = budget.saturating_sub(total_lines);
            for line in block.split_inclusive('\n').take(remaining) {
                if re.is_match(line) {
                    matched_regexes[ri] = true;
                    break;
                }
            }
        }

        total_lines += line_count;
        if total_lines >= budget {
            break;
        }
        if matched_strings.iter().all(|&m| m) && matched_regexes.iter().all(|&m| m) {
            break;
        }
        index += 1;
    }

    matched_strings.iter().all(|&m| m) && matched_regexes.iter().all(|&m| m)
}
