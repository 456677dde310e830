use std::fmt;

use cartconf_lexer::LexError;
use cartconf_parser::{DepError, FilterError, ParseError};

/// A target could not be loaded, or loading it would close a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeError {
    Missing { target: String },
    Cycle { target: String, chain: Vec<String> },
}

impl fmt::Display for IncludeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { target } => write!(f, "include target {target:?} could not be loaded"),
            Self::Cycle { target, chain } => {
                write!(f, "cyclic include of {target:?}, chain: {}", chain.join(" -> "))
            }
        }
    }
}

impl std::error::Error for IncludeError {}

/// A `${...}` reference never resolved within the iteration cap, either
/// because the key is never assigned or because references form a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpError {
    pub key: String,
    pub chain: Vec<String>,
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unresolved interpolation {:?}, chain: {}",
            self.key,
            self.chain.join(" -> ")
        )
    }
}

impl std::error::Error for InterpError {}

/// The expander reached a state the tree walk cannot make sense of, e.g. a
/// `join` whose groups produced zero subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionError {
    pub reason: String,
}

impl ExpansionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for ExpansionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ExpansionError {}

/// The single error type returned across the lexing/parsing/expansion
/// pipeline, so a caller driving the public entry points only has one
/// type to match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartconfError {
    Lex(LexError),
    Parse(ParseError),
    Filter(FilterError),
    Dep(DepError),
    Include(IncludeError),
    Interp(InterpError),
    Expansion(ExpansionError),
}

impl fmt::Display for CartconfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "lex error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Filter(e) => write!(f, "filter error: {e}"),
            Self::Dep(e) => write!(f, "dependency error: {e}"),
            Self::Include(e) => write!(f, "include error: {e}"),
            Self::Interp(e) => write!(f, "interpolation error: {e}"),
            Self::Expansion(e) => write!(f, "expansion error: {e}"),
        }
    }
}

impl std::error::Error for CartconfError {}

impl From<LexError> for CartconfError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for CartconfError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<FilterError> for CartconfError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

impl From<DepError> for CartconfError {
    fn from(e: DepError) -> Self {
        Self::Dep(e)
    }
}

impl From<IncludeError> for CartconfError {
    fn from(e: IncludeError) -> Self {
        Self::Include(e)
    }
}

impl From<InterpError> for CartconfError {
    fn from(e: InterpError) -> Self {
        Self::Interp(e)
    }
}

impl From<ExpansionError> for CartconfError {
    fn from(e: ExpansionError) -> Self {
        Self::Expansion(e)
    }
}
