//! Indentation-stack-driven statement parser.
//!
//! Each logical line from the lexer starts with an [`TokenKind::IndentSet`]
//! token whose text is the line's raw leading whitespace. Blocks are
//! delimited purely by that text being a strict prefix extension of the
//! enclosing block's indent (mixed tabs/spaces compare as opaque strings,
//! per the invariant in the data model, not by column count).

use indexmap::IndexMap;

use cartconf_lexer::token::{Token, TokenKind};

use crate::ast::{
    AssignOp, Assign, Block, CondBlock, Del, FilterKind, FilterStmt, Include, Join, Node, Suffix,
    VariantName, VariantsDecl,
};
use crate::error::ParseError;
use crate::filter;

/// Tokenize and parse a full source buffer into its root [`Block`].
pub fn parse_source(source: &str) -> Result<Block, ParseError> {
    let tokens = cartconf_lexer::tokenize(source)
        .map_err(|e| ParseError::new(e.line, e.to_string()))?;
    let mut parser = Parser::new(&tokens);
    parser.parse_document()
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn tok(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn kind(&self) -> TokenKind {
        self.tok().kind
    }

    fn text(&self) -> &str {
        &self.tok().text
    }

    fn line(&self) -> u32 {
        self.tok().line_no
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn peek_text(&self, n: usize) -> &str {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].text
    }

    fn is_eof(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn indent_text(&self) -> &str {
        debug_assert_eq!(self.kind(), TokenKind::IndentSet);
        self.text()
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        if self.kind() != TokenKind::Newline {
            return Err(ParseError::new(
                self.line(),
                format!("expected end of line, found {:?}", self.text()),
            ));
        }
        self.advance();
        Ok(())
    }

    fn expect_punct(&mut self, text: &str) -> Result<(), ParseError> {
        if self.kind() != TokenKind::Punct || self.text() != text {
            return Err(ParseError::new(
                self.line(),
                format!("expected {text:?}, found {:?}", self.text()),
            ));
        }
        self.advance();
        Ok(())
    }

    /// Parse the whole document as a root block. The root has no enclosing
    /// indent to extend: every top-level statement shares one common
    /// indentation (ordinarily the empty string), so it is parsed with
    /// `parent_indent: None` rather than `Some("")` (which would wrongly
    /// require top-level lines to be deeper than nothing).
    pub fn parse_document(&mut self) -> Result<Block, ParseError> {
        let children = self.parse_block(None)?;
        Ok(Block { children })
    }

    /// Parse sibling statements sharing one indentation. `Some(parent)`
    /// requires each child line's indent to strictly extend `parent`
    /// (a nested body); `None` accepts any one consistent indent (the
    /// document root, which has no enclosing line to extend).
    fn parse_block(&mut self, parent_indent: Option<&str>) -> Result<Vec<Node>, ParseError> {
        let mut children = Vec::new();
        let mut block_indent: Option<String> = None;

        loop {
            if self.is_eof() {
                break;
            }
            let line_indent = self.indent_text().to_string();
            if !belongs_to_block(&line_indent, parent_indent) {
                break;
            }
            match &block_indent {
                None => block_indent = Some(line_indent.clone()),
                Some(bi) if *bi != line_indent => {
                    return Err(ParseError::new(self.line(), "inconsistent indentation"));
                }
                Some(_) => {}
            }
            self.advance(); // consume IndentSet
            children.push(self.parse_statement(&line_indent)?);
        }

        Ok(children)
    }

    /// Parse the bullets of a `variants:` body. Like `parse_block` but
    /// every child line must open with a `-` bullet marker.
    fn parse_variant_bullets(&mut self, parent_indent: &str) -> Result<Vec<VariantName>, ParseError> {
        let mut children = Vec::new();
        let mut block_indent: Option<String> = None;

        loop {
            if self.is_eof() {
                break;
            }
            let line_indent = self.indent_text().to_string();
            if !belongs_to_block(&line_indent, Some(parent_indent)) {
                break;
            }
            match &block_indent {
                None => block_indent = Some(line_indent.clone()),
                Some(bi) if *bi != line_indent => {
                    return Err(ParseError::new(self.line(), "inconsistent indentation"));
                }
                Some(_) => {}
            }
            self.advance(); // consume IndentSet
            if !(self.kind() == TokenKind::Punct && self.text() == "-") {
                return Err(ParseError::new(
                    self.line(),
                    "expected '-' bullet inside a variants: body",
                ));
            }
            children.push(self.parse_variant_name(&line_indent)?);
        }

        Ok(children)
    }

    fn parse_statement(&mut self, own_indent: &str) -> Result<Node, ParseError> {
        let line = self.line();
        match (self.kind(), self.text()) {
            (TokenKind::Ident, "variants") => self.parse_variants_decl(own_indent).map(Node::VariantsDecl),
            (TokenKind::Ident, "include") => self.parse_include().map(Node::Include),
            (TokenKind::Ident, "del") => self.parse_del().map(Node::Del),
            (TokenKind::Ident, "only") | (TokenKind::Ident, "no") => {
                self.parse_filter_stmt().map(Node::FilterStmt)
            }
            (TokenKind::Ident, "join") => self.parse_join().map(Node::Join),
            (TokenKind::Ident, "suffix") => self.parse_suffix().map(Node::Suffix),
            (TokenKind::Punct, "!") => self.parse_cond_block(own_indent, true).map(Node::CondBlock),
            (TokenKind::Punct, "-") => Err(ParseError::new(
                line,
                "'-' bullet is only valid directly inside a variants: body",
            )),
            (TokenKind::Ident, _) => {
                if self.peek_kind(1) == TokenKind::Punct && AssignOp::from_token_text(self.peek_text(1)).is_some() {
                    self.parse_assign().map(Node::Assign)
                } else {
                    self.parse_cond_block(own_indent, false).map(Node::CondBlock)
                }
            }
            _ => Err(ParseError::new(
                line,
                format!("unexpected token {:?} at statement start", self.text()),
            )),
        }
    }

    fn parse_assign(&mut self) -> Result<Assign, ParseError> {
        let line = self.line();
        let key = self.advance().text;
        let op_text = self.advance().text;
        let op = AssignOp::from_token_text(&op_text)
            .ok_or_else(|| ParseError::new(line, format!("unknown assignment operator {op_text:?}")))?;
        let value = if self.kind() == TokenKind::Str {
            self.advance().text
        } else {
            String::new()
        };
        self.expect_newline()?;
        Ok(Assign { key, op, value, line })
    }

    fn parse_include(&mut self) -> Result<Include, ParseError> {
        let line = self.line();
        self.advance(); // 'include'
        if !matches!(self.kind(), TokenKind::Ident | TokenKind::Str) {
            return Err(ParseError::new(line, "expected a target after 'include'"));
        }
        let target = self.advance().text;
        self.expect_newline()?;
        Ok(Include { target, line })
    }

    fn parse_del(&mut self) -> Result<Del, ParseError> {
        let line = self.line();
        self.advance(); // 'del'
        if self.kind() != TokenKind::Ident {
            return Err(ParseError::new(line, "expected a key after 'del'"));
        }
        let key = self.advance().text;
        self.expect_newline()?;
        Ok(Del { key, line })
    }

    fn parse_filter_stmt(&mut self) -> Result<FilterStmt, ParseError> {
        let line = self.line();
        let kind = if self.text() == "only" { FilterKind::Only } else { FilterKind::No };
        self.advance();
        let expr = self.parse_filter_expr()?;
        self.expect_newline()?;
        Ok(FilterStmt { kind, expr, line })
    }

    fn parse_join(&mut self) -> Result<Join, ParseError> {
        let line = self.line();
        self.advance(); // 'join'
        let mut groups = Vec::new();
        while self.kind() != TokenKind::Newline && !self.is_eof() {
            groups.push(self.parse_filter_expr()?);
        }
        self.expect_newline()?;
        if groups.is_empty() {
            return Err(ParseError::new(line, "'join' requires at least one group"));
        }
        Ok(Join { groups, line })
    }

    fn parse_suffix(&mut self) -> Result<Suffix, ParseError> {
        let line = self.line();
        self.advance(); // 'suffix'
        if !matches!(self.kind(), TokenKind::Ident | TokenKind::Str) {
            return Err(ParseError::new(line, "expected text after 'suffix'"));
        }
        let text = self.advance().text;
        self.expect_newline()?;
        Ok(Suffix { text, line })
    }

    fn parse_cond_block(&mut self, own_indent: &str, negated: bool) -> Result<CondBlock, ParseError> {
        let line = self.line();
        if negated {
            self.advance(); // '!'
        }
        let expr = self.parse_filter_expr()?;
        self.expect_punct(":")?;
        self.expect_newline()?;
        let children = self.parse_block(Some(own_indent))?;
        Ok(CondBlock {
            expr,
            negated,
            body: Block { children },
            line,
        })
    }

    fn parse_filter_expr(&mut self) -> Result<crate::ast::FilterExpr, ParseError> {
        filter::parse_or(self.tokens, &mut self.pos).map_err(|e| ParseError::new(e.line, e.reason))
    }

    fn parse_variants_decl(&mut self, own_indent: &str) -> Result<VariantsDecl, ParseError> {
        let line = self.line();
        self.advance(); // 'variants'

        let var_type = if self.kind() == TokenKind::Ident {
            Some(self.advance().text)
        } else {
            None
        };

        let mut meta = IndexMap::new();
        while self.kind() == TokenKind::Punct && self.text() == "[" {
            self.advance();
            loop {
                if self.kind() != TokenKind::Ident {
                    return Err(ParseError::new(self.line(), "expected an identifier in [meta]"));
                }
                let key = self.advance().text;
                if self.kind() == TokenKind::Punct && self.text() == "=" {
                    self.advance();
                    if !matches!(self.kind(), TokenKind::Ident | TokenKind::Str) {
                        return Err(ParseError::new(self.line(), "expected a value after '=' in [meta]"));
                    }
                    let value = self.advance().text;
                    meta.insert(key, value);
                } else {
                    meta.insert(key, "true".to_string());
                }
                if self.kind() == TokenKind::Punct && self.text() == "," {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect_punct("]")?;
        }

        self.expect_punct(":")?;
        self.expect_newline()?;

        let unnamed = var_type.is_none();
        let children = self.parse_variant_bullets(own_indent)?;

        Ok(VariantsDecl {
            var_type,
            meta,
            unnamed,
            children,
            line,
        })
    }

    fn parse_variant_name(&mut self, own_indent: &str) -> Result<VariantName, ParseError> {
        let line = self.line();
        self.advance(); // '-'

        let default = if self.kind() == TokenKind::Punct && self.text() == "@" {
            self.advance();
            true
        } else {
            false
        };

        if self.kind() != TokenKind::Ident {
            return Err(ParseError::new(line, "expected a variant name after '-'"));
        }
        let name = self.advance().text;
        self.expect_punct(":")?;

        let mut deps = Vec::new();
        while self.kind() == TokenKind::Ident {
            deps.push(self.advance().text);
            if self.kind() == TokenKind::Punct && self.text() == "," {
                self.advance();
                continue;
            }
            break;
        }

        self.expect_newline()?;
        let children = self.parse_block(Some(own_indent))?;
        Ok(VariantName {
            name,
            deps,
            default,
            body: Block { children },
            line,
        })
    }
}

/// Whether `candidate` indent belongs to a block enclosed by
/// `parent_indent`: `None` (the document root) accepts anything, `Some`
/// requires a strict prefix extension.
fn belongs_to_block(candidate: &str, parent_indent: Option<&str>) -> bool {
    match parent_indent {
        None => true,
        Some(parent) => candidate.starts_with(parent) && candidate.len() > parent.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AtomPattern, FilterExpr};

    #[test]
    fn empty_source_parses_to_empty_block() {
        let block = parse_source("").unwrap();
        assert!(block.children.is_empty());
    }

    #[test]
    fn single_assignment() {
        let block = parse_source("x = 1").unwrap();
        assert_eq!(block.children.len(), 1);
        match &block.children[0] {
            Node::Assign(a) => {
                assert_eq!(a.key, "x");
                assert_eq!(a.op, AssignOp::Set);
                assert_eq!(a.value, "1");
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn two_dim_variants_product_shape() {
        let src = "variants:\n  - a:\n  - b:\nvariants:\n  - 1:\n  - 2:\n";
        let block = parse_source(src).unwrap();
        assert_eq!(block.children.len(), 2);
        for child in &block.children {
            match child {
                Node::VariantsDecl(decl) => assert_eq!(decl.children.len(), 2),
                other => panic!("expected VariantsDecl, got {other:?}"),
            }
        }
    }

    #[test]
    fn variant_bullet_with_deps_and_body() {
        let src = "variants:\n  - a: x, y\n      k = v\n";
        let block = parse_source(src).unwrap();
        let Node::VariantsDecl(decl) = &block.children[0] else {
            panic!("expected VariantsDecl");
        };
        let bullet = &decl.children[0];
        assert_eq!(bullet.name, "a");
        assert_eq!(bullet.deps, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(bullet.body.children.len(), 1);
    }

    #[test]
    fn default_bullet_marker() {
        let src = "variants:\n  - @a:\n  - b:\n";
        let block = parse_source(src).unwrap();
        let Node::VariantsDecl(decl) = &block.children[0] else {
            panic!("expected VariantsDecl");
        };
        assert!(decl.children[0].default);
        assert!(!decl.children[1].default);
    }

    #[test]
    fn variants_header_with_type_and_meta() {
        let src = "variants arch [short_name_only] [foo=bar]:\n  - x86:\n";
        let block = parse_source(src).unwrap();
        let Node::VariantsDecl(decl) = &block.children[0] else {
            panic!("expected VariantsDecl");
        };
        assert_eq!(decl.var_type.as_deref(), Some("arch"));
        assert!(decl.short_name_only());
        assert_eq!(decl.meta.get("foo"), Some(&"bar".to_string()));
        assert!(!decl.unnamed);
    }

    #[test]
    fn unnamed_variants_block() {
        let block = parse_source("variants:\n  - a:\n").unwrap();
        let Node::VariantsDecl(decl) = &block.children[0] else {
            panic!("expected VariantsDecl");
        };
        assert!(decl.unnamed);
        assert!(decl.var_type.is_none());
    }

    #[test]
    fn only_and_no_filter_statements() {
        let block = parse_source("only a.b\nno c\n").unwrap();
        assert_eq!(block.children.len(), 2);
        match &block.children[0] {
            Node::FilterStmt(f) => assert_eq!(f.kind, FilterKind::Only),
            other => panic!("expected FilterStmt, got {other:?}"),
        }
        match &block.children[1] {
            Node::FilterStmt(f) => assert_eq!(f.kind, FilterKind::No),
            other => panic!("expected FilterStmt, got {other:?}"),
        }
    }

    #[test]
    fn named_conditional_block() {
        let src = "a.b:\n  x = 1\n";
        let block = parse_source(src).unwrap();
        match &block.children[0] {
            Node::CondBlock(c) => {
                assert!(!c.negated);
                assert_eq!(c.body.children.len(), 1);
                assert_eq!(
                    c.expr,
                    FilterExpr::AdjAnd(vec![
                        FilterExpr::Atom(AtomPattern::Name("a".into())),
                        FilterExpr::Atom(AtomPattern::Name("b".into())),
                    ])
                );
            }
            other => panic!("expected CondBlock, got {other:?}"),
        }
    }

    #[test]
    fn negated_conditional_block() {
        let block = parse_source("!a:\n  x = 1\n").unwrap();
        match &block.children[0] {
            Node::CondBlock(c) => assert!(c.negated),
            other => panic!("expected CondBlock, got {other:?}"),
        }
    }

    #[test]
    fn include_and_del_and_suffix() {
        let block = parse_source("include base\ndel x\nsuffix _a\n").unwrap();
        assert!(matches!(block.children[0], Node::Include(_)));
        assert!(matches!(block.children[1], Node::Del(_)));
        assert!(matches!(block.children[2], Node::Suffix(_)));
    }

    #[test]
    fn join_with_multiple_groups() {
        let block = parse_source("join a b c\n").unwrap();
        match &block.children[0] {
            Node::Join(j) => assert_eq!(j.groups.len(), 3),
            other => panic!("expected Join, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_indentation_is_an_error() {
        // Two sibling bullets at different indentation under the same
        // variants: block.
        let src = "variants:\n  - a:\n    - b:\n";
        let err = parse_source(src).unwrap_err();
        assert!(err.reason.contains("indentation") || err.reason.contains("bullet"));
    }

    #[test]
    fn bullet_outside_variants_is_an_error() {
        let err = parse_source("- a:\n").unwrap_err();
        assert!(err.reason.contains("bullet"));
    }
}
