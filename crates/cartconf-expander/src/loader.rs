//! Resolution of `include` directives against an abstract "load by name"
//! capability, with cycle detection keyed on the target string.

use cartconf_parser::{parse_source, Block, Node};

use crate::error::{CartconfError, IncludeError};

/// The one capability the core needs from its host to resolve `include`
/// statements. Passed in by the caller, never looked up globally.
pub trait Loader {
    fn load(&self, target: &str) -> Result<String, IncludeError>;
}

/// A loader that rejects every target; the right default for sources
/// known not to use `include`.
pub struct NullLoader;

impl Loader for NullLoader {
    fn load(&self, target: &str) -> Result<String, IncludeError> {
        Err(IncludeError::Missing { target: target.to_string() })
    }
}

/// Splice every `include` statement's resolved block in place, recursing
/// into included sources so transitive includes are resolved too.
/// `visited` tracks targets currently open on the include chain so a
/// cycle is caught instead of recursing forever.
pub fn resolve_includes(block: Block, loader: &dyn Loader) -> Result<Block, CartconfError> {
    let mut visited = Vec::new();
    resolve_block(block, loader, &mut visited)
}

fn resolve_block(block: Block, loader: &dyn Loader, visited: &mut Vec<String>) -> Result<Block, CartconfError> {
    let mut children = Vec::with_capacity(block.children.len());
    for child in block.children {
        match child {
            Node::Include(inc) => {
                if visited.iter().any(|t| t == &inc.target) {
                    let mut chain = visited.clone();
                    chain.push(inc.target.clone());
                    return Err(IncludeError::Cycle { target: inc.target, chain }.into());
                }
                let source = loader.load(&inc.target)?;
                let included = parse_source(&source)?;
                visited.push(inc.target.clone());
                let resolved = resolve_block(included, loader, visited)?;
                visited.pop();
                children.extend(resolved.children);
            }
            Node::Block(inner) => {
                children.push(Node::Block(resolve_block(inner, loader, visited)?));
            }
            Node::CondBlock(mut cond) => {
                cond.body = resolve_block(cond.body, loader, visited)?;
                children.push(Node::CondBlock(cond));
            }
            Node::VariantsDecl(mut decl) => {
                for bullet in &mut decl.children {
                    bullet.body = resolve_block(std::mem::take(&mut bullet.body), loader, visited)?;
                }
                children.push(Node::VariantsDecl(decl));
            }
            other => children.push(other),
        }
    }
    Ok(Block { children })
}

/// A loader backed by an in-memory map, useful for tests and for callers
/// that have already gathered every included file's contents up front.
pub struct MapLoader {
    sources: std::collections::HashMap<String, String>,
}

impl MapLoader {
    pub fn new(sources: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
        }
    }
}

impl Loader for MapLoader {
    fn load(&self, target: &str) -> Result<String, IncludeError> {
        self.sources
            .get(target)
            .cloned()
            .ok_or_else(|| IncludeError::Missing { target: target.to_string() })
    }
}
