//! Glob-style matching for group and namespace filters.
//!
//! Batch operations target registry records whose `group` or `namespace`
//! matches a pattern. Matching is anchored against the full value and supports
//! `*` (any-length wildcard), `?` (single character), and `{a,b,c}` brace
//! alternation.

use globset::{Glob, GlobMatcher};

/// A compiled group/namespace pattern.
///
/// Compile once with [`Pattern::new`] and reuse across a batch scan. An absent
/// value never matches, regardless of pattern; the bare `"*"` pattern matches
/// any present value without consulting the glob engine.
///
/// # Examples
///
/// ```
/// use wardbus::Pattern;
///
/// let p = Pattern::new("user*");
/// assert!(p.matches(Some("user")));
/// assert!(p.matches(Some("user-admin")));
/// assert!(!p.matches(Some("order")));
/// assert!(!p.matches(None));
/// ```
#[derive(Clone, Debug)]
pub struct Pattern {
    raw: String,
    kind: MatchKind,
}

#[derive(Clone, Debug)]
enum MatchKind {
    /// `"*"` fast path.
    Any,
    Glob(GlobMatcher),
    /// Fallback for patterns the glob engine rejects: exact comparison.
    Literal,
}

impl Pattern {
    /// Compile a pattern. Never fails: a syntactically invalid glob degrades
    /// to literal equality matching (logged at `warn`).
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let kind = if raw == "*" {
            MatchKind::Any
        } else {
            match Glob::new(&raw) {
                Ok(glob) => MatchKind::Glob(glob.compile_matcher()),
                Err(err) => {
                    tracing::warn!(pattern = %raw, %err, "invalid glob pattern, matching literally");
                    MatchKind::Literal
                }
            }
        };
        Self { raw, kind }
    }

    /// The original pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `value` satisfies this pattern. `None` never matches.
    #[must_use]
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.kind {
            MatchKind::Any => true,
            MatchKind::Glob(matcher) => matcher.is_match(value),
            MatchKind::Literal => value == self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_prefix_matches_extensions_of_the_prefix() {
        let p = Pattern::new("user*");
        assert!(p.matches(Some("user")));
        assert!(p.matches(Some("user-admin")));
        assert!(!p.matches(Some("order")));
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        let p = Pattern::new("user-?dmin");
        assert!(p.matches(Some("user-admin")));
        assert!(!p.matches(Some("user-guest")));
        assert!(!p.matches(Some("user-dmin")));
    }

    #[test]
    fn brace_alternation_matches_each_branch() {
        let p = Pattern::new("order-{123,abc}");
        assert!(p.matches(Some("order-123")));
        assert!(p.matches(Some("order-abc")));
        assert!(!p.matches(Some("order-xyz")));
    }

    #[test]
    fn matching_is_anchored_not_substring() {
        let p = Pattern::new("admin");
        assert!(!p.matches(Some("user-admin")));
        assert!(p.matches(Some("admin")));
    }

    #[test]
    fn absent_value_never_matches() {
        assert!(!Pattern::new("*").matches(None));
        assert!(!Pattern::new("user*").matches(None));
    }

    #[test]
    fn bare_star_matches_any_present_value() {
        let p = Pattern::new("*");
        assert!(p.matches(Some("")));
        assert!(p.matches(Some("anything/at all")));
    }

    #[test]
    fn invalid_glob_degrades_to_literal_equality() {
        let p = Pattern::new("order-{unclosed");
        assert!(p.matches(Some("order-{unclosed")));
        assert!(!p.matches(Some("order-x")));
    }
}
