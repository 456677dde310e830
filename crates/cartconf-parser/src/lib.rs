//! Filter algebra and statement parser for the cartconf configuration
//! format: turns a token stream from `cartconf-lexer` into the node tree
//! consumed by `cartconf-expander`.

pub mod ast;
pub mod error;
pub mod filter;
pub mod parser;

pub use ast::{
    AssignOp, Assign, AtomPattern, Block, CondBlock, Del, FilterExpr, FilterKind, FilterStmt,
    Include, Join, Node, Suffix, VariantName, VariantsDecl,
};
pub use error::{DepError, FilterError, ParseError};
pub use filter::{matches, parse_filter_string, PathSegment};
pub use parser::parse_source;

use std::collections::HashSet;

/// Collect every `VariantName` reachable anywhere in the tree.
fn collect_variant_names<'a>(block: &'a Block, out: &mut HashSet<&'a str>) {
    for child in &block.children {
        match child {
            Node::VariantsDecl(decl) => {
                for bullet in &decl.children {
                    out.insert(bullet.name.as_str());
                    collect_variant_names(&bullet.body, out);
                }
            }
            Node::CondBlock(cond) => collect_variant_names(&cond.body, out),
            _ => {}
        }
    }
}

/// Static check: flag a bullet whose `deps` name a variant that appears
/// nowhere in the tree, so it could never be satisfied regardless of
/// path. This does not attempt to simulate document-order reachability
/// (a dep declared later in the tree is not flagged); it only catches
/// dangling references to names that do not exist anywhere.
pub fn check_deps(root: &Block) -> Result<(), DepError> {
    let mut names = HashSet::new();
    collect_variant_names(root, &mut names);
    check_deps_inner(root, &names)
}

fn check_deps_inner(block: &Block, names: &HashSet<&str>) -> Result<(), DepError> {
    for child in &block.children {
        match child {
            Node::VariantsDecl(decl) => {
                for bullet in &decl.children {
                    for dep in &bullet.deps {
                        if !names.contains(dep.as_str()) {
                            return Err(DepError {
                                bullet: bullet.name.clone(),
                                missing_dep: dep.clone(),
                            });
                        }
                    }
                    check_deps_inner(&bullet.body, names)?;
                }
            }
            Node::CondBlock(cond) => check_deps_inner(&cond.body, names)?,
            _ => {}
        }
    }
    Ok(())
}
