//! Wildcard pattern matching for actions and resources
//!
//! Supports wildcards:
//! - `*` - Matches zero or more characters (e.g., `iam:Delete*`)
//! - `?` - Matches exactly one character (e.g., `arn:aws:s3:::bucket-?`)
//!
//! Every other character is literal. Patterns are anchored to the whole string
//! and matching is case-sensitive. Wildcards match any character, newlines
//! included.
//!
//! Patterns too large for the regex engine's compile limits fall back to a
//! direct wildcard scan with identical semantics, so every pattern matches.

use regex::Regex;

/// Compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    kind: MatcherKind,
}

#[derive(Debug, Clone)]
enum MatcherKind {
    /// Pattern without wildcards, compared by equality
    Literal(String),
    /// Pattern with wildcards, compiled to an anchored regex
    Wildcard(Regex),
    /// Pattern the regex engine refused (size limits), scanned directly
    Glob(Vec<char>),
}

impl PatternMatcher {
    /// Compile a wildcard pattern
    pub fn new(pattern: &str) -> Self {
        if !pattern.contains(['*', '?']) {
            return PatternMatcher {
                kind: MatcherKind::Literal(pattern.to_string()),
            };
        }

        let kind = match Regex::new(&Self::translate(pattern)) {
            Ok(regex) => MatcherKind::Wildcard(regex),
            Err(e) => {
                tracing::debug!("Wildcard pattern too large for regex, scanning directly: {}", e);
                MatcherKind::Glob(pattern.chars().collect())
            }
        };
        PatternMatcher { kind }
    }

    /// Check if `actual` matches a wildcard pattern
    ///
    /// # Examples
    /// ```
    /// use pbac::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("iam:DeleteVirtualMFADevice", "iam:Delete*"));
    /// assert!(PatternMatcher::matches("ab", "a?"));
    /// assert!(!PatternMatcher::matches("abc", "a?"));
    /// assert!(!PatternMatcher::matches("s3:GetObject", "iam:*"));
    /// ```
    pub fn matches(actual: &str, pattern: &str) -> bool {
        Self::new(pattern).is_match(actual)
    }

    /// Test a string against this compiled pattern
    pub fn is_match(&self, actual: &str) -> bool {
        match &self.kind {
            MatcherKind::Literal(literal) => literal == actual,
            MatcherKind::Wildcard(regex) => regex.is_match(actual),
            MatcherKind::Glob(pattern) => glob_match(pattern, actual),
        }
    }

    /// Translate a wildcard pattern into an anchored regular expression
    fn translate(pattern: &str) -> String {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");

        let mut buf = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }

        expr.push('$');
        expr
    }
}

/// Greedy wildcard scan, backtracking only to the most recent `*`
fn glob_match(pattern: &[char], actual: &str) -> bool {
    let text: Vec<char> = actual.chars().collect();
    let (mut p, mut t) = (0, 0);
    // (pattern index of the last `*`, text index it currently absorbs up to)
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(&'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
