//! The node tree: the parser's output and the expander's input.
//!
//! Nodes are built once by the parser and never mutated afterwards; the
//! expander walks a shared reference to the tree and keeps all mutable
//! state (the choice stack, the deferred operation list) to itself. See
//! `cartconf-expander` for that side.

use indexmap::IndexMap;

/// One statement or block in the parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Assign(Assign),
    VariantsDecl(VariantsDecl),
    FilterStmt(FilterStmt),
    CondBlock(CondBlock),
    Include(Include),
    Del(Del),
    Join(Join),
    Suffix(Suffix),
}

/// An ordered sequence of sibling statements sharing one indentation
/// level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub children: Vec<Node>,
}

/// `key <op> value`, scoped by whatever conditional filters enclose it.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub key: String,
    pub op: AssignOp,
    pub value: String,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Append,
    Prepend,
    RegexSub,
    LazySet,
    LazyAppend,
    LazyPrepend,
}

impl AssignOp {
    /// Parse an operator token's text; `None` if it is not a known
    /// assignment operator.
    pub fn from_token_text(text: &str) -> Option<Self> {
        Some(match text {
            "=" => Self::Set,
            "+=" => Self::Append,
            "<=" => Self::Prepend,
            "~=" => Self::RegexSub,
            "?=" => Self::LazySet,
            "?+=" => Self::LazyAppend,
            "?<=" => Self::LazyPrepend,
            _ => return None,
        })
    }

    pub fn is_lazy(self) -> bool {
        matches!(self, Self::LazySet | Self::LazyAppend | Self::LazyPrepend)
    }
}

/// A `variants:` header and its bullets.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantsDecl {
    pub var_type: Option<String>,
    pub meta: IndexMap<String, String>,
    /// Set when the header had no `var_type` prefix: an unnamed block
    /// contributes to the product but not to `name`/`short_name`.
    pub unnamed: bool,
    pub children: Vec<VariantName>,
    pub line: u32,
}

impl VariantsDecl {
    pub fn short_name_only(&self) -> bool {
        self.meta
            .get("short_name_only")
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// One bullet under a `variants:` block.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantName {
    pub name: String,
    pub deps: Vec<String>,
    pub default: bool,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Only,
    No,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterStmt {
    pub kind: FilterKind,
    pub expr: FilterExpr,
    pub line: u32,
}

/// The `filter:` form: a block whose contents only apply when `expr`
/// (possibly negated) matches the active path at application time.
#[derive(Debug, Clone, PartialEq)]
pub struct CondBlock {
    pub expr: FilterExpr,
    pub negated: bool,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub target: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Del {
    pub key: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub groups: Vec<FilterExpr>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suffix {
    pub text: String,
    pub line: u32,
}

/// A single matchable segment of a filter atom: either a literal
/// variant-name pattern or a `(key=value)` attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomPattern {
    Name(String),
    KeyValue(String, String),
}

/// A boolean filter expression over a variant path, parsed with
/// precedence `,` (weakest) < `..` < `.` (strongest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Atom(AtomPattern),
    Not(Box<FilterExpr>),
    /// `..`: every element must match the path, independently of the
    /// others (order-insensitive existence checks).
    And(Vec<FilterExpr>),
    /// `.`: every element must match consecutive path positions, in
    /// order, starting from some common anchor.
    AdjAnd(Vec<FilterExpr>),
    /// `,`: any element matches.
    Or(Vec<FilterExpr>),
}
