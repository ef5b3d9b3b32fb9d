use crate::error::{Error, Result};
use regex::Regex;

/// Token standing for "one or more path segments" inside a pattern.
pub const RECURSIVE_MARKER: &str = "...";

/// What a recursive marker expands to: word characters and separators.
const RECURSIVE_EXPANSION: &str = r"[\w/]+";

#[derive(Debug, Clone)]
enum Rule {
    Glob(glob::Pattern),
    Recursive(Regex),
}

impl Rule {
    fn compile(pattern: &str) -> Result<Self> {
        if pattern.contains(RECURSIVE_MARKER) {
            let body = pattern
                .split(RECURSIVE_MARKER)
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(RECURSIVE_EXPANSION);
            Regex::new(&format!("^{body}$"))
                .map(Rule::Recursive)
                .map_err(|e| invalid(pattern, e))
        } else {
            glob::Pattern::new(pattern)
                .map(Rule::Glob)
                .map_err(|e| invalid(pattern, e))
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Rule::Glob(glob) => glob.matches(text),
            Rule::Recursive(re) => re.is_match(text),
        }
    }
}

fn invalid(pattern: &str, reason: impl ToString) -> Error {
    Error::Pattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// An ordered list of path patterns compiled into a single predicate.
///
/// Plain patterns use shell-glob semantics (`*`, `?`, `[...]`); as with `fnmatch`,
/// `*` also matches across `/`. A pattern containing [`RECURSIVE_MARKER`] is compiled
/// into a regular expression matching the whole text, with the marker standing for
/// one or more path segments (`src/.../main` matches `src/a/b/main`).
///
/// A text matches when any pattern matches it; an empty list matches everything.
///
/// ```
/// use project_manager::PathPattern;
/// let pattern = PathPattern::new(["*.rs", "src/.../mod"]).unwrap();
/// assert!(pattern.is_match("lib.rs"));
/// assert!(pattern.is_match("src/a/b/mod"));
/// assert!(!pattern.is_match("README.md"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathPattern {
    rules: Vec<Rule>,
}

impl PathPattern {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| Rule::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.is_match(text))
    }
}
