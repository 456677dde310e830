//! Tokenizer for the cartconf Cartesian configuration format.
//!
//! Reads a source buffer line by line, joins backslash-continued lines,
//! strips comments and blank lines, then tokenizes each remaining logical
//! line into an [`IndentSet`](TokenKind::IndentSet) token followed by
//! content tokens and a terminating [`Newline`](TokenKind::Newline).
//!
//! Tokenization is eager (not a lazy per-character `Iterator`, unlike a
//! general-purpose language lexer) because the whole source must be read
//! to join continuation lines before any line can be tokenized in
//! isolation, and streaming/partial parsing is explicitly out of scope.
//!
//! Assignment right-hand sides are a **value context**: once `key <op>`
//! is recognized at the start of a line, everything remaining on the
//! line is captured verbatim as a single [`Str`](TokenKind::Str) token
//! (still honoring trailing `#`/`//` comments and a single layer of
//! quoting), rather than re-entering the generic dispatch loop. This is
//! what lets values contain `${name}` interpolation syntax or other
//! characters the generic tokenizer would otherwise reject.

mod cursor;
pub mod error;
pub mod token;

use cursor::Cursor;
pub use error::{LexError, LexErrorKind};
pub use token::{is_ident_continue, is_ident_start, Token, TokenKind};

/// One logical line: a physical line, or several joined by trailing `\`
/// continuations, with a single indentation and starting line number.
struct LogicalLine {
    indent: String,
    content: String,
    line_no: u32,
}

/// Join backslash-continued physical lines into logical lines, dropping
/// blank and comment-only lines entirely (they produce no tokens at all).
fn assemble_logical_lines(source: &str) -> Vec<LogicalLine> {
    let physical: Vec<&str> = source.lines().collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < physical.len() {
        let line_no = (i + 1) as u32;
        let indent_len = physical[i].len() - physical[i].trim_start().len();
        let indent = physical[i][..indent_len].to_string();
        let mut content = physical[i].trim_start().to_string();
        let mut j = i;

        while content.ends_with('\\') {
            content.pop();
            j += 1;
            if j >= physical.len() {
                break;
            }
            content.push(' ');
            content.push_str(physical[j].trim_start());
        }

        if !is_blank_or_comment_only(&content) {
            out.push(LogicalLine {
                indent,
                content,
                line_no,
            });
        }
        i = j + 1;
    }

    out
}

/// Whether a logical line's content is empty or consists only of a comment.
fn is_blank_or_comment_only(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// Tokenize the full source, returning the token stream terminated by a
/// single [`TokenKind::Eof`] token, or the first lexical error encountered.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let last_line = source.lines().count().max(1) as u32;

    for line in assemble_logical_lines(source) {
        let indent_cols = line.indent.chars().count() as u32;
        tokens.push(Token::new(
            TokenKind::IndentSet,
            line.indent.clone(),
            indent_cols,
            line.line_no,
        ));
        tokenize_line(&line.content, indent_cols, line.line_no, &mut tokens)?;
        tokens.push(Token::new(TokenKind::Newline, "", indent_cols, line.line_no));
    }

    tokens.push(Token::new(TokenKind::Eof, "", 0, last_line));
    Ok(tokens)
}

/// The assignment operator texts, longest first so prefix ambiguities
/// (`?=` vs `?+=`) resolve correctly under a simple `starts_with` scan.
const ASSIGN_OPS: &[&str] = &["?+=", "?<=", "?=", "+=", "<=", "~=", "="];

/// Tokenize the content of a single logical line (indentation already
/// stripped) into zero or more tokens, stopping silently at a trailing
/// comment.
fn tokenize_line(
    content: &str,
    indent_cols: u32,
    line_no: u32,
    out: &mut Vec<Token>,
) -> Result<(), LexError> {
    if try_lex_assignment(content, indent_cols, line_no, out) {
        return Ok(());
    }

    let mut cursor = Cursor::new(content);

    loop {
        cursor.eat_while(|c| c == ' ' || c == '\t');
        let col = cursor.pos() + 1;
        let Some(c) = cursor.peek() else { break };

        match c {
            '#' => break,
            '/' if cursor.peek_next() == Some('/') => break,

            '(' | ')' | '[' | ']' | ',' | ':' | '@' | '!' => {
                cursor.advance();
                out.push(Token::new(TokenKind::Punct, c.to_string(), indent_cols, line_no));
            }

            '-' => {
                // `-` can never start an identifier (see `is_ident_start`),
                // so at top-level dispatch it is always the bullet-marker
                // punctuation; `-` inside an identifier is consumed by
                // `eat_while(is_ident_continue)` from the ident branch below.
                cursor.advance();
                out.push(Token::new(TokenKind::Punct, "-", indent_cols, line_no));
            }

            '.' => {
                cursor.advance();
                if cursor.peek() == Some('.') {
                    cursor.advance();
                    out.push(Token::new(TokenKind::Punct, "..", indent_cols, line_no));
                } else {
                    out.push(Token::new(TokenKind::Punct, ".", indent_cols, line_no));
                }
            }

            '=' => {
                cursor.advance();
                out.push(Token::new(TokenKind::Punct, "=", indent_cols, line_no));
            }

            '+' => {
                cursor.advance();
                expect_eq(&mut cursor, "+=", indent_cols, line_no, out)?;
            }

            '<' => {
                cursor.advance();
                expect_eq(&mut cursor, "<=", indent_cols, line_no, out)?;
            }

            '~' => {
                cursor.advance();
                expect_eq(&mut cursor, "~=", indent_cols, line_no, out)?;
            }

            '?' => {
                cursor.advance();
                match cursor.peek() {
                    Some('=') => {
                        cursor.advance();
                        out.push(Token::new(TokenKind::Punct, "?=", indent_cols, line_no));
                    }
                    Some('+') => {
                        cursor.advance();
                        expect_eq(&mut cursor, "?+=", indent_cols, line_no, out)?;
                    }
                    Some('<') => {
                        cursor.advance();
                        expect_eq(&mut cursor, "?<=", indent_cols, line_no, out)?;
                    }
                    _ => {
                        return Err(LexError::new(
                            line_no,
                            col,
                            LexErrorKind::UnrecognizedCharacter('?'),
                        ))
                    }
                }
            }

            '"' | '\'' => {
                let quote = c;
                cursor.advance();
                let start = cursor.pos();
                loop {
                    match cursor.peek() {
                        None => {
                            return Err(LexError::new(
                                line_no,
                                col,
                                LexErrorKind::UnterminatedString,
                            ))
                        }
                        Some(q) if q == quote => break,
                        Some(_) => {
                            cursor.advance();
                        }
                    }
                }
                let body = cursor.slice(start, cursor.pos()).to_string();
                cursor.advance(); // closing quote
                out.push(Token::new(TokenKind::Str, body, indent_cols, line_no));
            }

            c if is_ident_start(c) => {
                let start = cursor.pos();
                cursor.advance();
                cursor.eat_while(is_ident_continue);
                let text = cursor.slice(start, cursor.pos()).to_string();
                out.push(Token::new(TokenKind::Ident, text, indent_cols, line_no));
            }

            other => {
                return Err(LexError::new(
                    line_no,
                    col,
                    LexErrorKind::UnrecognizedCharacter(other),
                ))
            }
        }
    }

    Ok(())
}

/// Recognize `key <assign-op> ...` at the start of a line and, if
/// present, push `Ident(key)`, `Punct(op)` and a single `Str` token
/// holding the rest of the line as a raw value (comment-stripped,
/// trimmed, one layer of surrounding quotes removed). Returns whether
/// the line was recognized as an assignment; leaves `out` untouched
/// otherwise so the caller can fall back to generic tokenization.
fn try_lex_assignment(content: &str, indent_cols: u32, line_no: u32, out: &mut Vec<Token>) -> bool {
    let mut cursor = Cursor::new(content);
    cursor.eat_while(|c| c == ' ' || c == '\t');

    let key_start = cursor.pos();
    if !cursor.peek().map(is_ident_start).unwrap_or(false) {
        return false;
    }
    cursor.advance();
    cursor.eat_while(is_ident_continue);
    let key = cursor.slice(key_start, cursor.pos()).to_string();

    cursor.eat_while(|c| c == ' ' || c == '\t');
    let op_start = cursor.pos() as usize;
    let Some(op) = ASSIGN_OPS.iter().find(|op| content[op_start..].starts_with(**op)) else {
        return false;
    };
    for _ in 0..op.chars().count() {
        cursor.advance();
    }
    if cursor.peek() == Some(' ') {
        cursor.advance();
    }

    let value_start = cursor.pos() as usize;
    let raw = strip_trailing_comment(&content[value_start..]);
    let value = unquote(raw.trim());

    out.push(Token::new(TokenKind::Ident, key, indent_cols, line_no));
    out.push(Token::new(TokenKind::Punct, *op, indent_cols, line_no));
    out.push(Token::new(TokenKind::Str, value, indent_cols, line_no));
    true
}

/// Truncate `s` at the first `#` or `//` that is not inside a quoted
/// span. Quoting is tracked only to protect comment markers that
/// happen to appear inside a value's own quotes; it does not otherwise
/// validate the value's quoting.
fn strip_trailing_comment(s: &str) -> &str {
    let mut in_quote: Option<char> = None;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match in_quote {
            Some(q) => {
                if c == q {
                    in_quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    in_quote = Some(c);
                } else if c == '#' {
                    return &s[..i];
                } else if c == '/' && chars.peek().map(|(_, n)| *n) == Some('/') {
                    return &s[..i];
                }
            }
        }
    }
    s
}

/// Strip one layer of matching surrounding quotes, if present.
fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Consume an expected `=` to complete a two-or-more-character operator
/// starting with a character already advanced past; falls back to the
/// single leading character's own token when `=` does not follow (e.g.
/// bare `+`, `<`, `~` have no standalone meaning in this grammar, but we
/// still emit them as single-char punctuation rather than erroring, since
/// the statement parser is in a better position to reject them with
/// context).
fn expect_eq(
    cursor: &mut Cursor<'_>,
    full: &str,
    indent_cols: u32,
    line_no: u32,
    out: &mut Vec<Token>,
) -> Result<(), LexError> {
    if cursor.peek() == Some('=') {
        cursor.advance();
        out.push(Token::new(TokenKind::Punct, full, indent_cols, line_no));
    } else {
        let lead = full.chars().next().unwrap();
        out.push(Token::new(TokenKind::Punct, lead.to_string(), indent_cols, line_no));
    }
    Ok(())
}
