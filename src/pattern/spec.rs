//! Search pattern compilation
//!
//! Raw pattern records arrive as loosely-shaped YAML (scalar-or-list fields,
//! uncompiled glob and regex strings). They are validated and compiled into
//! immutable [`SearchPattern`] values at the registration boundary, so the
//! matching core never carries loosely-typed maps.

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::Deserialize;

/// A field that may be written as a single string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize into a deduplicated list, preserving first-seen order
    fn into_set(self) -> Vec<String> {
        let items = match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        };
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        out
    }
}

/// Raw, uncompiled pattern record as registered by a consumer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPattern {
    /// Filename glob
    #[serde(rename = "fn")]
    pub fn_glob: Option<String>,
    /// Filename regex, anchored at the start of the name
    pub fn_re: Option<String>,
    /// Literal substrings that must all appear in the scanned content
    pub contents: Option<OneOrMany>,
    /// Regexes that must all match at the start of some in-budget line
    pub contents_re: Option<OneOrMany>,
    /// Line budget for the content scan
    pub num_lines: Option<usize>,
    /// Pattern-specific file size gate in bytes
    pub max_filesize: Option<u64>,
    /// Allow the file to also match groups scheduled later
    #[serde(default)]
    pub shared: bool,
    /// Unconditionally disable this pattern
    #[serde(default)]
    pub skip: bool,
    pub exclude_fn: Option<OneOrMany>,
    pub exclude_fn_re: Option<OneOrMany>,
    pub exclude_contents: Option<OneOrMany>,
    pub exclude_contents_re: Option<OneOrMany>,
}

/// Compiled, immutable search pattern
#[derive(Debug, Clone)]
pub struct SearchPattern {
    pub fn_glob: Option<GlobMatcher>,
    pub fn_re: Option<Regex>,
    pub contents: Vec<String>,
    pub contents_re: Vec<Regex>,
    pub num_lines: Option<usize>,
    pub max_filesize: Option<u64>,
    pub shared: bool,
    pub skip: bool,
    pub exclude_fn: Vec<GlobMatcher>,
    pub exclude_fn_re: Vec<Regex>,
    pub exclude_contents: Vec<String>,
    pub exclude_contents_re: Vec<Regex>,
}

/// Compile a regex that behaves like a match anchored at the start of its input
pub(crate) fn compile_anchored(source: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{source})"))
        .with_context(|| format!("Invalid regex pattern: {source}"))
}

impl SearchPattern {
    /// Compile and validate one raw pattern record.
    ///
    /// At least one of the filename or content selectors must be present,
    /// otherwise the record is rejected. Rejection is non-fatal to the run:
    /// the caller logs, optionally lints, and drops the pattern.
    pub fn compile(raw: RawPattern, key: &str) -> Result<Self> {
        let contents = raw.contents.map(OneOrMany::into_set).unwrap_or_default();
        let contents_re_strs = raw.contents_re.map(OneOrMany::into_set).unwrap_or_default();

        if raw.fn_glob.is_none()
            && raw.fn_re.is_none()
            && contents.is_empty()
            && contents_re_strs.is_empty()
        {
            anyhow::bail!(
                "At least one of fn, fn_re, contents, contents_re must be specified \
                 in search pattern '{key}'"
            );
        }

        let fn_glob = match raw.fn_glob {
            Some(g) => Some(
                Glob::new(&g)
                    .with_context(|| format!("Invalid filename glob in '{key}': {g}"))?
                    .compile_matcher(),
            ),
            None => None,
        };
        let fn_re = match raw.fn_re {
            Some(r) => Some(compile_anchored(&r).with_context(|| format!("in pattern '{key}'"))?),
            None => None,
        };

        let contents_re = contents_re_strs
            .iter()
            .map(|s| compile_anchored(s).with_context(|| format!("in pattern '{key}'")))
            .collect::<Result<Vec<_>>>()?;

        let exclude_fn = raw
            .exclude_fn
            .map(OneOrMany::into_set)
            .unwrap_or_default()
            .iter()
            .map(|g| {
                Glob::new(g)
                    .map(|glob| glob.compile_matcher())
                    .with_context(|| format!("Invalid exclude glob in '{key}': {g}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let exclude_fn_re = raw
            .exclude_fn_re
            .map(OneOrMany::into_set)
            .unwrap_or_default()
            .iter()
            .map(|s| compile_anchored(s).with_context(|| format!("in pattern '{key}'")))
            .collect::<Result<Vec<_>>>()?;
        let exclude_contents = raw
            .exclude_contents
            .map(OneOrMany::into_set)
            .unwrap_or_default();
        // Exclusion content regexes search anywhere in a block, so they are
        // compiled unanchored, unlike contents_re.
        let exclude_contents_re = raw
            .exclude_contents_re
            .map(OneOrMany::into_set)
            .unwrap_or_default()
            .iter()
            .map(|s| {
                Regex::new(s).with_context(|| format!("Invalid regex in '{key}': {s}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchPattern {
            fn_glob,
            fn_re,
            contents,
            contents_re,
            num_lines: raw.num_lines,
            max_filesize: raw.max_filesize,
            shared: raw.shared,
            skip: raw.skip,
            exclude_fn,
            exclude_fn_re,
            exclude_contents,
            exclude_contents_re,
        })
    }

    /// Whether this pattern has any content selectors at all
    pub fn has_content_selectors(&self) -> bool {
        !self.contents.is_empty() || !self.contents_re.is_empty()
    }
}

/// A named, ordered list of alternative search patterns.
///
/// A file matches the group if it satisfies at least one pattern in the list.
#[derive(Debug, Clone)]
pub struct PatternGroup {
    pub key: String,
    pub patterns: Vec<SearchPattern>,
}

impl PatternGroup {
    /// Compile a group from raw records, dropping rejected patterns.
    ///
    /// Returns `None` when every record was rejected. Rejections are logged;
    /// in strict mode they are also appended to `lint_errors`.
    pub fn compile(
        key: &str,
        raw_patterns: Vec<RawPattern>,
        strict: bool,
        lint_errors: &mut Vec<String>,
    ) -> Option<Self> {
        let mut patterns = Vec::with_capacity(raw_patterns.len());
        for raw in raw_patterns {
            match SearchPattern::compile(raw, key) {
                Ok(sp) => patterns.push(sp),
                Err(e) => {
                    tracing::error!("{e:#}");
                    if strict {
                        lint_errors.push(format!("{e:#}"));
                    }
                }
            }
        }
        if patterns.is_empty() {
            return None;
        }
        Some(PatternGroup {
            key: key.to_string(),
            patterns,
        })
    }
}

/// Field names accepted in a raw pattern record. Anything else is tolerated
/// but flagged, since it is almost always a typo.
const KNOWN_PATTERN_KEYS: &[&str] = &[
    "fn",
    "fn_re",
    "contents",
    "contents_re",
    "num_lines",
    "max_filesize",
    "shared",
    "skip",
    "exclude_fn",
    "exclude_fn_re",
    "exclude_contents",
    "exclude_contents_re",
];

fn warn_unknown_keys(key: &str, record: &serde_yml::Value) {
    let Some(mapping) = record.as_mapping() else {
        return;
    };
    for field in mapping.keys() {
        if let Some(name) = field.as_str() {
            if !KNOWN_PATTERN_KEYS.contains(&name) {
                tracing::warn!("Unrecognised search pattern key '{name}' in '{key}'");
            }
        }
    }
}

/// Parse a YAML mapping of group key to one-or-many raw pattern records,
/// preserving registration order.
pub fn groups_from_yaml(text: &str) -> Result<Vec<(String, Vec<RawPattern>)>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawEntry {
        One(RawPattern),
        Many(Vec<RawPattern>),
    }

    let mapping: serde_yml::Mapping =
        serde_yml::from_str(text).context("Failed to parse search patterns YAML")?;

    let mut groups = Vec::with_capacity(mapping.len());
    for (k, v) in mapping {
        let key: String = serde_yml::from_value(k).context("Search pattern key must be a string")?;
        match &v {
            serde_yml::Value::Sequence(records) => {
                for record in records {
                    warn_unknown_keys(&key, record);
                }
            }
            record => warn_unknown_keys(&key, record),
        }
        let entry: RawEntry = serde_yml::from_value(v)
            .with_context(|| format!("Invalid search pattern record for '{key}'"))?;
        let raws = match entry {
            RawEntry::One(raw) => vec![raw],
            RawEntry::Many(raws) => raws,
        };
        groups.push((key, raws));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_requires_a_selector() {
        let raw = RawPattern {
            num_lines: Some(10),
            ..Default::default()
        };
        assert!(SearchPattern::compile(raw, "empty").is_err());
    }

    #[test]
    fn test_compile_filename_only() {
        let raw = RawPattern {
            fn_glob: Some("*.tsv".to_string()),
            ..Default::default()
        };
        let sp = SearchPattern::compile(raw, "tabular").unwrap();
        assert!(sp.fn_glob.as_ref().unwrap().is_match("data.tsv"));
        assert!(!sp.fn_glob.as_ref().unwrap().is_match("data.csv"));
        assert!(!sp.has_content_selectors());
    }

    #[test]
    fn test_scalar_or_list_normalization() {
        let yaml = "contents: 'one string'\n";
        let raw: RawPattern = serde_yml::from_str(yaml).unwrap();
        let sp = SearchPattern::compile(raw, "scalar").unwrap();
        assert_eq!(sp.contents, vec!["one string".to_string()]);

        let yaml = "contents: ['a', 'b', 'a']\n";
        let raw: RawPattern = serde_yml::from_str(yaml).unwrap();
        let sp = SearchPattern::compile(raw, "list").unwrap();
        assert_eq!(sp.contents, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_anchored_content_regex() {
        let raw = RawPattern {
            contents_re: Some(OneOrMany::One(r"Total reads: \d+".to_string())),
            ..Default::default()
        };
        let sp = SearchPattern::compile(raw, "anchored").unwrap();
        let re = &sp.contents_re[0];
        assert!(re.is_match("Total reads: 1500"));
        // Anchored at line start, like a prefix match
        assert!(!re.is_match("## Total reads: 1500"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let raw = RawPattern {
            fn_re: Some("[unclosed".to_string()),
            ..Default::default()
        };
        assert!(SearchPattern::compile(raw, "bad").is_err());
    }

    #[test]
    fn test_group_compile_drops_rejected() {
        let mut lint_errors = Vec::new();
        let group = PatternGroup::compile(
            "mixed",
            vec![
                RawPattern::default(), // rejected: no selectors
                RawPattern {
                    fn_glob: Some("*.log".to_string()),
                    ..Default::default()
                },
            ],
            true,
            &mut lint_errors,
        )
        .unwrap();
        assert_eq!(group.patterns.len(), 1);
        assert_eq!(lint_errors.len(), 1);
    }

    #[test]
    fn test_group_compile_all_rejected() {
        let mut lint_errors = Vec::new();
        let group = PatternGroup::compile("hollow", vec![RawPattern::default()], false, &mut lint_errors);
        assert!(group.is_none());
        assert!(lint_errors.is_empty());
    }

    #[test]
    fn test_unknown_keys_tolerated() {
        // A typo'd key degrades to a warning, the record still parses
        let yaml = "g:\n  fn: '*.log'\n  max_filesize_mb: 5\n";
        let groups = groups_from_yaml(yaml).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 1);
        assert_eq!(groups[0].1[0].fn_glob.as_deref(), Some("*.log"));
    }

    #[test]
    fn test_groups_from_yaml_preserves_order() {
        let yaml = r#"
zeta:
  fn: "*.zeta"
alpha:
  - contents: "id:"
    num_lines: 5
  - fn: "*.alpha"
"#;
        let groups = groups_from_yaml(yaml).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "zeta");
        assert_eq!(groups[1].0, "alpha");
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0].num_lines, Some(5));
    }
}
