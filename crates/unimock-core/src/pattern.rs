//! Segment-wise path pattern matching
//!
//! Patterns are compared segment by segment:
//! - literal segments (case-insensitive unless configured otherwise)
//! - `*` matches exactly one non-empty segment
//! - `**` matches zero or more segments (only legal as a whole segment)
//! - a trailing `*` also matches the collection path one segment shorter,
//!   so `/users/*` matches both `/users/42` and `/users`
//!
//! Each pattern is compiled once at load time; matching allocates nothing.

use crate::{Error, Result};

/// One compiled pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Literal segment text
    Literal(String),
    /// `*` — exactly one segment
    Any,
    /// `**` — zero or more segments
    Deep,
}

/// A compiled path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    case_sensitive: bool,
}

/// Specificity rank of a pattern, used to break ties when several patterns
/// match the same concrete path. Orders by: exact match first, then most
/// pattern segments, then fewest `**` segments, then longest run of leading
/// literal segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    exact: bool,
    segment_count: usize,
    non_deep: usize,
    literal_prefix: usize,
}

/// Strip a single trailing slash; `/products/` and `/products` index the
/// same bucket. The root path is left alone.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Split a path into its non-empty segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathPattern {
    /// Compile a pattern string. Fails on an empty pattern or on a segment
    /// that mixes `*` with literal text.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::config("path pattern must not be empty"));
        }
        let mut segments = Vec::new();
        for part in split_segments(pattern) {
            let segment = match part {
                "*" => Segment::Any,
                "**" => Segment::Deep,
                _ if part.contains('*') => {
                    return Err(Error::config(format!(
                        "wildcard must be a whole segment in pattern '{pattern}'"
                    )));
                }
                _ => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self {
            raw: pattern.to_string(),
            segments,
            case_sensitive,
        })
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern contains no wildcard segments.
    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Specificity rank for tie-breaking between matching patterns.
    pub fn specificity(&self) -> Specificity {
        let literal_prefix = self
            .segments
            .iter()
            .take_while(|s| matches!(s, Segment::Literal(_)))
            .count();
        let non_deep = self
            .segments
            .iter()
            .filter(|s| !matches!(s, Segment::Deep))
            .count();
        Specificity {
            exact: self.is_exact(),
            segment_count: self.segments.len(),
            non_deep,
            literal_prefix,
        }
    }

    /// Match a concrete request path against this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let path_segments = split_segments(path);
        if self.match_segments(&self.segments, &path_segments) {
            return true;
        }
        // Trailing `*` also claims the collection path one segment shorter.
        if let Some((Segment::Any, head)) = self.segments.split_last() {
            return self.match_segments(head, &path_segments);
        }
        false
    }

    fn match_segments(&self, pattern: &[Segment], path: &[&str]) -> bool {
        match pattern.split_first() {
            None => path.is_empty(),
            Some((Segment::Deep, rest)) => {
                (0..=path.len()).any(|skip| self.match_segments(rest, &path[skip..]))
            }
            Some((segment, rest)) => match path.split_first() {
                None => false,
                Some((part, path_rest)) => {
                    self.segment_matches(segment, part) && self.match_segments(rest, path_rest)
                }
            },
        }
    }

    fn segment_matches(&self, segment: &Segment, part: &str) -> bool {
        match segment {
            Segment::Any => !part.is_empty(),
            Segment::Deep => true,
            Segment::Literal(text) => {
                if self.case_sensitive {
                    text == part
                } else {
                    text.eq_ignore_ascii_case(part)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> PathPattern {
        PathPattern::compile(pattern, false).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let p = compile("/api/health");
        assert!(p.matches("/api/health"));
        assert!(!p.matches("/api/health/check"));
        assert!(!p.matches("/api"));
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let p = compile("/Products");
        assert!(p.matches("/products"));
        assert!(p.matches("/PRODUCTS"));
    }

    #[test]
    fn test_case_sensitive() {
        let p = PathPattern::compile("/Products", true).unwrap();
        assert!(p.matches("/Products"));
        assert!(!p.matches("/products"));
    }

    #[test]
    fn test_single_wildcard() {
        let p = compile("/users/*");
        assert!(p.matches("/users/42"));
        assert!(!p.matches("/users/42/orders"));
    }

    #[test]
    fn test_trailing_wildcard_matches_collection() {
        let p = compile("/users/*");
        assert!(p.matches("/users"));
        assert!(p.matches("/users/"));
    }

    #[test]
    fn test_inner_wildcard() {
        let p = compile("/api/*/users");
        assert!(p.matches("/api/v1/users"));
        assert!(!p.matches("/api/users"));
        assert!(!p.matches("/api/v1/v2/users"));
    }

    #[test]
    fn test_deep_wildcard() {
        let p = compile("/api/**");
        assert!(p.matches("/api"));
        assert!(p.matches("/api/users"));
        assert!(p.matches("/api/users/7/orders/1"));
        assert!(!p.matches("/other"));
    }

    #[test]
    fn test_deep_wildcard_inner() {
        let p = compile("/api/**/orders");
        assert!(p.matches("/api/orders"));
        assert!(p.matches("/api/users/7/orders"));
        assert!(!p.matches("/api/users/7"));
    }

    #[test]
    fn test_wildcard_mixed_with_literal_rejected() {
        assert!(PathPattern::compile("/files/*.json", false).is_err());
        assert!(PathPattern::compile("/a/b**", false).is_err());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(PathPattern::compile("", false).is_err());
    }

    #[test]
    fn test_specificity_exact_beats_wildcard() {
        let exact = compile("/api/users");
        let wild = compile("/api/*");
        assert!(exact.specificity() > wild.specificity());
    }

    #[test]
    fn test_specificity_more_segments_win() {
        let long = compile("/api/*/v1/users");
        let short = compile("/api/**");
        assert!(long.specificity() > short.specificity());
    }

    #[test]
    fn test_specificity_any_beats_deep() {
        let any = compile("/api/*");
        let deep = compile("/api/**");
        assert!(any.specificity() > deep.specificity());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/products/"), "/products");
        assert_eq!(normalize_path("/products"), "/products");
        assert_eq!(normalize_path("/"), "/");
    }
}
