use std::fmt;

/// A structural error raised while building the node tree: bad
/// indentation, an unexpected token at block level, or a malformed
/// `variants:` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: u32, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.reason)
    }
}

impl std::error::Error for ParseError {}

/// An error raised while parsing a filter expression, either inline
/// during statement parsing or standalone when parsing an extra
/// `only`/`no` filter supplied at the CLI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    pub line: u32,
    pub reason: String,
}

impl FilterError {
    pub fn new(line: u32, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.reason)
    }
}

impl std::error::Error for FilterError {}

/// A bullet declares a dependency name that does not appear as any
/// sibling `VariantName` reachable in the tree, so it could never be
/// satisfied. Detected as a post-pass over the parsed tree, not during
/// statement parsing itself (a forward reference is legal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepError {
    pub bullet: String,
    pub missing_dep: String,
}

impl fmt::Display for DepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bullet {:?} depends on {:?}, which no sibling variant declares",
            self.bullet, self.missing_dep
        )
    }
}

impl std::error::Error for DepError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::new(4, "inconsistent indentation");
        assert_eq!(err.to_string(), "4: inconsistent indentation");
    }

    #[test]
    fn filter_error_display() {
        let err = FilterError::new(1, "expected filter expression");
        assert_eq!(err.to_string(), "1: expected filter expression");
    }

    #[test]
    fn dep_error_display() {
        let err = DepError {
            bullet: "b".into(),
            missing_dep: "a".into(),
        };
        assert_eq!(
            err.to_string(),
            "bullet \"b\" depends on \"a\", which no sibling variant declares"
        );
    }
}
