//! Wildcard table patterns.
//!
//! Patterns use shell-style wildcards: `*` matches zero or more characters and
//! `?` exactly one. Every other character, including regex metacharacters, is
//! literal. Matching is case-insensitive and covers the whole name.

use regex::{Regex, RegexBuilder};

use crate::error::BackupError;

/// Convert a wildcard pattern to an anchored regular expression.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if ch == '*' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    regex.push_str(&regex::escape(&literal));

    regex.push('$');
    regex
}

pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Lowercased literal name.
    Exact(String),
    Wildcard(Regex),
}

/// A compiled table pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    matcher: Matcher,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self, BackupError> {
        let matcher = if has_wildcards(pattern) {
            let regex = RegexBuilder::new(&wildcard_to_regex(pattern))
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|source| BackupError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            Matcher::Wildcard(regex)
        } else {
            Matcher::Exact(pattern.to_lowercase())
        };

        Ok(Self {
            source: pattern.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(expected) => name.to_lowercase() == *expected,
            Matcher::Wildcard(regex) => regex.is_match(name),
        }
    }
}

/// An ordered set of patterns; blank entries are dropped.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<WildcardPattern>,
}

impl PatternSet {
    pub fn compile<I, S>(patterns: I) -> Result<Self, BackupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|p| {
                let trimmed = p.as_ref().trim();
                (!trimmed.is_empty()).then(|| WildcardPattern::new(trimmed))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// First pattern matching `name`, in declaration order.
    pub fn first_match(&self, name: &str) -> Option<&WildcardPattern> {
        self.patterns.iter().find(|p| p.is_match(name))
    }

    pub fn matches(&self, name: &str) -> bool {
        self.first_match(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("temp_*", "temp_users", true)]
    #[case("temp_*", "temp_orders", true)]
    #[case("temp_*", "users_temp", false)]
    #[case("temp_*", "temp_", true)]
    #[case("test?", "test1", true)]
    #[case("test?", "test12", false)]
    #[case("test?", "test", false)]
    #[case("*_log", "AUDIT_LOG", true)]
    #[case("Users", "users", true)]
    #[case("users", "users_archive", false)]
    #[case("a.b", "axb", false)]
    #[case("a.b", "A.B", true)]
    #[case("data(1)*", "data(1)_x", true)]
    #[case("price$", "price$", true)]
    #[case("[abc]", "a", false)]
    #[case("*", "", true)]
    fn wildcard_matching(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        let compiled = WildcardPattern::new(pattern).expect("compile pattern");
        assert_eq!(
            compiled.is_match(name),
            expected,
            "pattern {pattern:?} against {name:?}"
        );
    }

    #[test]
    fn test_wildcard_to_regex_escapes_metacharacters() {
        assert_eq!(wildcard_to_regex("temp_*"), "^temp_.*$");
        assert_eq!(wildcard_to_regex("a.b?"), r"^a\.b.$");
        assert_eq!(wildcard_to_regex("x+(y)"), r"^x\+\(y\)$");
    }

    #[test]
    fn test_pattern_set_skips_blank_entries() {
        let set = PatternSet::compile(["", "  ", "audit_*"]).expect("compile");
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.first_match("audit_events").map(WildcardPattern::as_str),
            Some("audit_*")
        );
        assert!(!set.matches("events"));
    }
}
