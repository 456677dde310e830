//! Filter expression parsing and matching.
//!
//! Grammar, weakest to strongest precedence: `,` (Or) < `..` (And) < `.`
//! (AdjAnd). `!` prefixes a unary term; parentheses group a
//! sub-expression or introduce a `(key=value)` predicate.

use cartconf_lexer::token::{Token, TokenKind};

use crate::ast::{AtomPattern, FilterExpr};
use crate::error::FilterError;

fn cur(tokens: &[Token], pos: usize) -> &Token {
    &tokens[pos.min(tokens.len() - 1)]
}

fn is_punct(tokens: &[Token], pos: usize, text: &str) -> bool {
    let t = cur(tokens, pos);
    t.kind == TokenKind::Punct && t.text == text
}

/// Parse a `,`-level filter expression starting at `*pos`, advancing
/// `*pos` past everything consumed.
pub fn parse_or(tokens: &[Token], pos: &mut usize) -> Result<FilterExpr, FilterError> {
    let mut items = vec![parse_and(tokens, pos)?];
    while is_punct(tokens, *pos, ",") {
        *pos += 1;
        items.push(parse_and(tokens, pos)?);
    }
    Ok(unwrap_singleton(items, FilterExpr::Or))
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Result<FilterExpr, FilterError> {
    let mut items = vec![parse_adj(tokens, pos)?];
    while is_punct(tokens, *pos, "..") {
        *pos += 1;
        items.push(parse_adj(tokens, pos)?);
    }
    Ok(unwrap_singleton(items, FilterExpr::And))
}

fn parse_adj(tokens: &[Token], pos: &mut usize) -> Result<FilterExpr, FilterError> {
    let mut items = vec![parse_unary(tokens, pos)?];
    while is_punct(tokens, *pos, ".") {
        *pos += 1;
        items.push(parse_unary(tokens, pos)?);
    }
    Ok(unwrap_singleton(items, FilterExpr::AdjAnd))
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Result<FilterExpr, FilterError> {
    let line = cur(tokens, *pos).line_no;

    if is_punct(tokens, *pos, "!") {
        *pos += 1;
        return Ok(FilterExpr::Not(Box::new(parse_unary(tokens, pos)?)));
    }

    if is_punct(tokens, *pos, "(") {
        *pos += 1;
        // A `(key=value)` predicate is an Ident immediately followed by
        // `=`; anything else opening a paren is a grouped sub-expression.
        if cur(tokens, *pos).kind == TokenKind::Ident && is_punct(tokens, *pos + 1, "=") {
            let key = cur(tokens, *pos).text.clone();
            *pos += 2;
            let value_tok = cur(tokens, *pos).clone();
            if !matches!(value_tok.kind, TokenKind::Ident | TokenKind::Str) {
                return Err(FilterError::new(line, "expected a value after '=' in predicate"));
            }
            *pos += 1;
            if !is_punct(tokens, *pos, ")") {
                return Err(FilterError::new(line, "expected ')' to close predicate"));
            }
            *pos += 1;
            return Ok(FilterExpr::Atom(AtomPattern::KeyValue(key, value_tok.text)));
        }

        let inner = parse_or(tokens, pos)?;
        if !is_punct(tokens, *pos, ")") {
            return Err(FilterError::new(line, "expected ')' to close group"));
        }
        *pos += 1;
        return Ok(inner);
    }

    if cur(tokens, *pos).kind == TokenKind::Ident {
        let name = cur(tokens, *pos).text.clone();
        *pos += 1;
        return Ok(FilterExpr::Atom(AtomPattern::Name(name)));
    }

    Err(FilterError::new(
        line,
        format!("expected a filter expression, found {:?}", cur(tokens, *pos).text),
    ))
}

fn unwrap_singleton(mut items: Vec<FilterExpr>, wrap: impl FnOnce(Vec<FilterExpr>) -> FilterExpr) -> FilterExpr {
    if items.len() == 1 {
        items.pop().unwrap()
    } else {
        wrap(items)
    }
}

/// Parse a standalone filter expression from raw text, e.g. an extra
/// `only`/`no` argument supplied at the CLI boundary.
pub fn parse_filter_string(s: &str) -> Result<FilterExpr, FilterError> {
    let tokens = cartconf_lexer::tokenize(s).map_err(|e| FilterError::new(e.line, e.to_string()))?;
    let mut pos = 1; // skip the leading IndentSet token
    let expr = parse_or(&tokens, &mut pos)?;
    if cur(&tokens, pos).kind != TokenKind::Newline && cur(&tokens, pos).kind != TokenKind::Eof {
        return Err(FilterError::new(
            cur(&tokens, pos).line_no,
            format!("unexpected trailing token {:?}", cur(&tokens, pos).text),
        ));
    }
    Ok(expr)
}

/// One segment of a variant path: the chosen bullet's name plus any
/// attributes inherited from its declaring `VariantsDecl`'s `meta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attrs(name: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }
}

/// Evaluate a filter expression against a variant path.
///
/// `Atom` and the boolean combinators (`Not`/`And`/`Or`) are existence
/// checks over the whole path; `AdjAnd` additionally requires its
/// elements to match a shared run of consecutive positions, which is
/// what gives `.` its "immediately followed by" semantics.
pub fn matches(expr: &FilterExpr, path: &[PathSegment]) -> bool {
    match expr {
        FilterExpr::Atom(AtomPattern::Name(name)) => path.iter().any(|seg| &seg.name == name),
        FilterExpr::Atom(AtomPattern::KeyValue(k, v)) => path
            .iter()
            .any(|seg| seg.attrs.iter().any(|(ak, av)| ak == k && av == v)),
        FilterExpr::Not(inner) => !matches(inner, path),
        FilterExpr::And(items) => items.iter().all(|item| matches(item, path)),
        FilterExpr::Or(items) => items.iter().any(|item| matches(item, path)),
        FilterExpr::AdjAnd(items) => (0..path.len()).any(|start| adj_matches_from(items, path, start)),
    }
}

/// Number of consecutive path positions a pattern occupies when nested
/// inside an `AdjAnd`. A plain atom (or a boolean combinator over atoms,
/// which is an existence check rather than a positional one) occupies
/// one position; a nested `AdjAnd` occupies the sum of its own items'
/// widths, since it must match that many consecutive positions itself.
fn adj_width(expr: &FilterExpr) -> usize {
    match expr {
        FilterExpr::AdjAnd(items) => items.iter().map(adj_width).sum(),
        _ => 1,
    }
}

fn adj_matches_from(items: &[FilterExpr], path: &[PathSegment], start: usize) -> bool {
    let total: usize = items.iter().map(adj_width).sum();
    if start + total > path.len() {
        return false;
    }
    let mut pos = start;
    for item in items {
        let w = adj_width(item);
        let matched = match item {
            // A nested `AdjAnd` must match the exact run of positions it
            // occupies, not just any position within it, so recurse with
            // the running absolute offset rather than matching a 1-wide
            // slice.
            FilterExpr::AdjAnd(inner) => adj_matches_from(inner, path, pos),
            _ => matches(item, &path[pos..pos + w]),
        };
        if !matched {
            return false;
        }
        pos += w;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FilterExpr {
        parse_filter_string(s).unwrap()
    }

    fn path(names: &[&str]) -> Vec<PathSegment> {
        names.iter().map(|n| PathSegment::new(*n)).collect()
    }

    #[test]
    fn or_is_weakest() {
        let expr = parse("a,b..c");
        assert_eq!(
            expr,
            FilterExpr::Or(vec![
                FilterExpr::Atom(AtomPattern::Name("a".into())),
                FilterExpr::And(vec![
                    FilterExpr::Atom(AtomPattern::Name("b".into())),
                    FilterExpr::Atom(AtomPattern::Name("c".into())),
                ]),
            ])
        );
    }

    #[test]
    fn dot_binds_tighter_than_dotdot() {
        let expr = parse("a.b..c");
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::AdjAnd(vec![
                    FilterExpr::Atom(AtomPattern::Name("a".into())),
                    FilterExpr::Atom(AtomPattern::Name("b".into())),
                ]),
                FilterExpr::Atom(AtomPattern::Name("c".into())),
            ])
        );
    }

    #[test]
    fn parens_group_an_or_inside_and() {
        let expr = parse("(a,b)..c");
        assert_eq!(
            expr,
            FilterExpr::And(vec![
                FilterExpr::Or(vec![
                    FilterExpr::Atom(AtomPattern::Name("a".into())),
                    FilterExpr::Atom(AtomPattern::Name("b".into())),
                ]),
                FilterExpr::Atom(AtomPattern::Name("c".into())),
            ])
        );
    }

    #[test]
    fn key_value_predicate() {
        let expr = parse("(os=linux)");
        assert_eq!(expr, FilterExpr::Atom(AtomPattern::KeyValue("os".into(), "linux".into())));
    }

    #[test]
    fn negation_prefix() {
        let expr = parse("!a");
        assert_eq!(expr, FilterExpr::Not(Box::new(FilterExpr::Atom(AtomPattern::Name("a".into())))));
    }

    #[test]
    fn unclosed_group_is_an_error() {
        assert!(parse_filter_string("(a,b").is_err());
    }

    #[test]
    fn atom_matches_anywhere_in_path() {
        let expr = parse("b");
        assert!(matches(&expr, &path(&["a", "b", "c"])));
        assert!(!matches(&expr, &path(&["a", "c"])));
    }

    #[test]
    fn adjacency_requires_consecutive_positions() {
        let expr = parse("a.b");
        assert!(matches(&expr, &path(&["x", "a", "b"])));
        assert!(!matches(&expr, &path(&["a", "x", "b"])));
    }

    #[test]
    fn parenthesized_adjacency_group_combines_with_outer_adjacency() {
        let expr = parse("(a.b).c");
        assert_eq!(
            expr,
            FilterExpr::AdjAnd(vec![
                FilterExpr::AdjAnd(vec![
                    FilterExpr::Atom(AtomPattern::Name("a".into())),
                    FilterExpr::Atom(AtomPattern::Name("b".into())),
                ]),
                FilterExpr::Atom(AtomPattern::Name("c".into())),
            ])
        );
        assert!(matches(&expr, &path(&["a", "b", "c"])));
        assert!(!matches(&expr, &path(&["a", "x", "b", "c"])));
        assert!(!matches(&expr, &path(&["a", "b", "x", "c"])));
    }

    #[test]
    fn and_is_order_insensitive_existence() {
        let expr = parse("b..a");
        assert!(matches(&expr, &path(&["a", "x", "b"])));
    }

    #[test]
    fn or_matches_either_branch() {
        let expr = parse("a,b");
        assert!(matches(&expr, &path(&["b"])));
        assert!(matches(&expr, &path(&["a"])));
        assert!(!matches(&expr, &path(&["c"])));
    }

    #[test]
    fn negation_inverts_existence() {
        let expr = parse("!a");
        assert!(matches(&expr, &path(&["b"])));
        assert!(!matches(&expr, &path(&["a"])));
    }

    #[test]
    fn key_value_predicate_matches_path_attrs() {
        let expr = parse("(os=linux)");
        let p = vec![PathSegment::with_attrs("a", vec![("os".into(), "linux".into())])];
        assert!(matches(&expr, &p));
        let p2 = vec![PathSegment::with_attrs("a", vec![("os".into(), "windows".into())])];
        assert!(!matches(&expr, &p2));
    }
}
