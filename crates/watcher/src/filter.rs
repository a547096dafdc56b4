//! File name filters
//!
//! A filter is a stateless predicate over an event. The built-in
//! [`FileNameFilter`] matches the last path segment against a pattern where
//! `*` matches any run of characters and `?` matches exactly one character.
//! Every other character is literal. Both sides are lowercased before
//! matching, so comparison ignores case for any Unicode letter.

use crate::events::FileEvent;
use glob::{MatchOptions, Pattern, PatternError};
use std::fmt;
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Predicate deciding whether an event is relevant to a rule
pub trait FileFilter: Send + Sync {
    /// Whether `event` satisfies this filter
    fn matches(&self, event: &FileEvent) -> bool;
}

impl<F> FileFilter for F
where
    F: Fn(&FileEvent) -> bool + Send + Sync,
{
    fn matches(&self, event: &FileEvent) -> bool {
        self(event)
    }
}

/// Matches the event's file name against a wildcard pattern
#[derive(Clone)]
pub struct FileNameFilter {
    raw: String,
    pattern: Pattern,
}

impl FileNameFilter {
    /// Create a filter for `pattern`
    ///
    /// Never fails: characters other than `*` and `?` are escaped before
    /// compilation, so an empty pattern matches only the empty name.
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let pattern = compile(&raw).unwrap_or_else(|e| {
            warn!("Pattern {raw:?} could not be compiled ({e}); it will only match an empty name");
            Pattern::default()
        });
        Self { raw, pattern }
    }

    /// The pattern as supplied by the caller
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// Whether `file_name` matches the whole pattern
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.pattern
            .matches_with(&file_name.to_lowercase(), MATCH_OPTIONS)
    }
}

impl FileFilter for FileNameFilter {
    fn matches(&self, event: &FileEvent) -> bool {
        self.matches_name(&event.file_name())
    }
}

impl fmt::Debug for FileNameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileNameFilter").field(&self.raw).finish()
    }
}

/// Translate a wildcard pattern into an escaped, lowercased glob
///
/// Runs of `*` are collapsed since glob reserves `**` for whole path
/// components. glob only folds ASCII case itself.
fn compile(raw: &str) -> Result<Pattern, PatternError> {
    let mut glob = String::with_capacity(raw.len());
    let mut previous_star = false;

    for c in raw.to_lowercase().chars() {
        match c {
            '*' if previous_star => continue,
            '*' | '?' => glob.push(c),
            '[' | ']' => {
                glob.push('[');
                glob.push(c);
                glob.push(']');
            }
            _ => glob.push(c),
        }
        previous_star = c == '*';
    }

    Pattern::new(&glob)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(pattern: &str) -> FileNameFilter {
        FileNameFilter::new(pattern)
    }

    #[test]
    fn test_extension_pattern() {
        let txt = filter("*.txt");

        assert!(txt.matches_name("a.txt"));
        assert!(txt.matches_name("A.TXT"));
        assert!(txt.matches_name(".txt"));
        assert!(!txt.matches_name("a.txt.bak"));
        assert!(!txt.matches_name("atxt"));
    }

    #[test]
    fn test_literal_pattern_is_case_insensitive_equality() {
        let literal = filter("Report.csv");

        assert!(literal.matches_name("report.CSV"));
        assert!(literal.matches_name("Report.csv"));
        assert!(!literal.matches_name("Report.csv2"));
        assert!(!literal.matches_name("xReport.csv"));
        assert!(!literal.matches_name("Report"));
    }

    #[test]
    fn test_case_folding_covers_non_ascii_letters() {
        assert!(filter("Résumé.pdf").matches_name("RÉSUMÉ.PDF"));
        assert!(filter("RÉSUMÉ.PDF").matches_name("résumé.pdf"));
        assert!(filter("ÄRGER*").matches_name("ärgernis.txt"));
        assert!(!filter("Résumé.pdf").matches_name("Resume.pdf"));
    }

    #[test]
    fn test_contains_pattern() {
        assert!(filter("*test*").matches_name("unittest.bat"));
        assert!(filter("*.bat").matches_name("unittest.bat"));
        assert!(!filter("*test*").matches_name("unit.bat"));
    }

    #[test]
    fn test_question_mark_matches_exactly_one_character() {
        let single = filter("log?.txt");

        assert!(single.matches_name("log1.txt"));
        assert!(!single.matches_name("log.txt"));
        assert!(!single.matches_name("log12.txt"));
    }

    #[test]
    fn test_brackets_are_literal() {
        let bracketed = filter("[draft]*.md");

        assert!(bracketed.matches_name("[draft] notes.md"));
        assert!(!bracketed.matches_name("d notes.md"));
    }

    #[test]
    fn test_consecutive_stars_collapse() {
        let stars = filter("a**b");

        assert!(stars.matches_name("ab"));
        assert!(stars.matches_name("a-long-b"));
        assert!(!stars.matches_name("a-long-c"));
    }

    #[test]
    fn test_empty_pattern_matches_only_empty_name() {
        let empty = filter("");

        assert!(empty.matches_name(""));
        assert!(!empty.matches_name("a"));
    }

    #[test]
    fn test_matches_uses_file_name_not_full_path() {
        let txt = filter("*.txt");

        assert!(txt.matches(&FileEvent::created("/var/data.csv/notes.txt")));
        assert!(!txt.matches(&FileEvent::created("/var/notes.txt/data.csv")));
        assert!(!filter("var*").matches(&FileEvent::created("/var/notes.txt")));
    }

    #[test]
    fn test_closure_filter() {
        let rename_only = |event: &FileEvent| event.previous_path().is_some();

        assert!(rename_only.matches(&FileEvent::renamed("/a", "/b")));
        assert!(!rename_only.matches(&FileEvent::created("/b")));
    }
}
