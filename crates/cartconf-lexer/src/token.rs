/// The kind of a lexical token produced by the cartconf tokenizer.
///
/// There are no reserved-word kinds: `variants`, `include`, `del`, `only`,
/// `no`, `join` and `suffix` are ordinary [`TokenKind::Ident`] tokens that
/// the statement parser recognizes contextually by their text, since they
/// are only special as the first token on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The leading whitespace run of a logical line, carried as its own
    /// token so the parser can compare indentation without re-deriving it
    /// from every token on the line.
    IndentSet,
    /// `[A-Za-z0-9][A-Za-z0-9_-]*`
    Ident,
    /// One of the recognized single- or multi-character operators.
    Punct,
    /// A single- or double-quoted string literal, body only (quotes
    /// stripped, no escape processing).
    Str,
    /// Terminates a logical line.
    Newline,
    /// Never emitted to the parser; comments are discarded by the lexer.
    /// Kept as a variant for completeness and for lexer-level tests.
    Comment,
    Eof,
}

/// One lexical token.
///
/// `indent_cols` and `line_no` are duplicated onto every token of a line
/// (not just the leading [`TokenKind::IndentSet`]) so the parser never
/// needs to look back at a previous token to know where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub indent_cols: u32,
    pub line_no: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, indent_cols: u32, line_no: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            indent_cols,
            line_no,
        }
    }
}

/// Whether a character can start an identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Whether a character can continue an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
