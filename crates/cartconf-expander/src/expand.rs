//! The depth-first Cartesian expander: walks a parsed [`Block`], buffers
//! every assignment/filter/suffix it passes as a deferred operation
//! tagged with the conditions active at that point, and materializes a
//! dict only once a path is fully committed.

use indexmap::IndexMap;
use regex::Regex;

use cartconf_parser::{
    matches, AssignOp, Block, CondBlock, FilterExpr, FilterKind, Join, Node, PathSegment,
    VariantsDecl,
};

use crate::error::{CartconfError, ExpansionError};
use crate::interpolate::interpolate_dict;

/// One fully materialized variant: the dict plus its derived display
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub short_name: String,
    pub dict: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
struct Condition {
    expr: FilterExpr,
    negated: bool,
}

impl Condition {
    fn holds(&self, path: &[PathSegment]) -> bool {
        let m = matches(&self.expr, path);
        if self.negated {
            !m
        } else {
            m
        }
    }
}

fn conditions_hold(conditions: &[Condition], path: &[PathSegment]) -> bool {
    conditions.iter().all(|c| c.holds(path))
}

#[derive(Debug, Clone)]
enum DeferredOp {
    Assign {
        key: String,
        op: AssignOp,
        value: String,
        conditions: Vec<Condition>,
    },
    Del {
        key: String,
        conditions: Vec<Condition>,
    },
    Suffix {
        text: String,
        conditions: Vec<Condition>,
    },
}

#[derive(Debug, Clone)]
struct DeferredFilter {
    kind: FilterKind,
    expr: FilterExpr,
    conditions: Vec<Condition>,
}

/// A bullet's own name, kept separate from the matching [`PathSegment`]
/// so the `short_name_only` exclusion can be applied when rendering
/// `name`/`short_name` without affecting filter matching at all.
#[derive(Debug, Clone)]
struct DisplaySeg {
    name: String,
    short_name_only: bool,
}

struct WalkCtx {
    path: Vec<PathSegment>,
    display: Vec<DisplaySeg>,
    deferred: Vec<DeferredOp>,
    filters: Vec<DeferredFilter>,
    cond_stack: Vec<Condition>,
    deps_seen: Vec<String>,
    /// A `join` statement reachable through several different enclosing
    /// branch choices would otherwise re-run (and re-emit) once per
    /// branch; this latch makes the first encounter, across the whole
    /// walk, the only one that fires.
    joined: bool,
    /// Set while re-walking `root` from inside `handle_join` for one of
    /// its own groups. That re-walk will reach the very `Join` node that
    /// triggered it (it's still part of `root`); without this, firing it
    /// again would recurse into `handle_join` forever. The line number
    /// identifies the specific join being expanded, so sibling `join`
    /// statements elsewhere in the tree still fire normally.
    skip_join_line: Option<u32>,
}

impl WalkCtx {
    fn new() -> Self {
        Self {
            path: Vec::new(),
            display: Vec::new(),
            deferred: Vec::new(),
            filters: Vec::new(),
            cond_stack: Vec::new(),
            deps_seen: Vec::new(),
            joined: false,
            skip_join_line: None,
        }
    }
}

/// One pending slice of sibling statements still to be processed, plus
/// the `cond_stack` length to restore to once this slice is exhausted
/// (undoing whatever `CondBlock` pushed when this frame was opened).
#[derive(Clone, Copy)]
struct Frame<'a> {
    stmts: &'a [Node],
    idx: usize,
    cond_mark: usize,
}

/// Build the `name`/`short_name` output string: variant names in
/// reverse visitation order (deepest choice first), per the emission
/// order fixture in the source format's own test scenarios.
fn build_display_name(display: &[DisplaySeg], short: bool) -> String {
    display
        .iter()
        .rev()
        .filter(|seg| !short || !seg.short_name_only)
        .map(|seg| seg.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn deps_satisfied(deps: &[String], path: &[PathSegment]) -> bool {
    deps.iter().all(|d| path.iter().any(|seg| &seg.name == d))
}

fn apply_regex_sub(existing: &str, spec: &str) -> Option<String> {
    let trimmed = spec.strip_prefix('/')?;
    let mut parts = trimmed.splitn(2, '/');
    let pattern = parts.next()?;
    let replacement = parts.next()?.trim_end_matches('/');
    let re = Regex::new(pattern).ok()?;
    Some(re.replace_all(existing, replacement).into_owned())
}

fn apply_assign(dict: &mut IndexMap<String, String>, key: &str, op: AssignOp, value: &str) {
    match op {
        AssignOp::Set => {
            dict.insert(key.to_string(), value.to_string());
        }
        AssignOp::Append => {
            let mut v = dict.get(key).cloned().unwrap_or_default();
            v.push_str(value);
            dict.insert(key.to_string(), v);
        }
        AssignOp::Prepend => {
            let mut v = value.to_string();
            v.push_str(&dict.get(key).cloned().unwrap_or_default());
            dict.insert(key.to_string(), v);
        }
        AssignOp::RegexSub => {
            // Absent key: no-op. The fixtures this was checked against
            // never exercise `~=` before the key has a value.
            if let Some(existing) = dict.get(key).cloned() {
                if let Some(result) = apply_regex_sub(&existing, value) {
                    dict.insert(key.to_string(), result);
                }
            }
        }
        AssignOp::LazySet | AssignOp::LazyAppend | AssignOp::LazyPrepend => {
            // All three only ever fire when the key is absent, at which
            // point concatenating around "" reduces to a plain set for
            // each of them alike.
            if !dict.contains_key(key) {
                dict.insert(key.to_string(), value.to_string());
            }
        }
    }
}

fn apply_suffix(dict: &mut IndexMap<String, String>, text: &str) {
    let entries: Vec<(String, String)> = dict.drain(..).collect();
    for (k, v) in entries {
        let renamed = if matches!(k.as_str(), "name" | "shortname" | "dep") {
            k
        } else {
            format!("{k}{text}")
        };
        dict.insert(renamed, v);
    }
}

fn materialize_leaf(ctx: &WalkCtx, out: &mut Vec<Variant>) -> Result<(), CartconfError> {
    for f in &ctx.filters {
        if !conditions_hold(&f.conditions, &ctx.path) {
            continue;
        }
        let path_matches = matches(&f.expr, &ctx.path);
        let keep = match f.kind {
            FilterKind::Only => path_matches,
            FilterKind::No => !path_matches,
        };
        if !keep {
            return Ok(());
        }
    }

    let mut dict = IndexMap::new();
    let mut suffixes: Vec<&str> = Vec::new();
    for entry in &ctx.deferred {
        match entry {
            DeferredOp::Assign { key, op, value, conditions } => {
                if conditions_hold(conditions, &ctx.path) {
                    apply_assign(&mut dict, key, *op, value);
                }
            }
            DeferredOp::Del { key, conditions } => {
                if conditions_hold(conditions, &ctx.path) {
                    dict.shift_remove(key);
                }
            }
            DeferredOp::Suffix { text, conditions } => {
                if conditions_hold(conditions, &ctx.path) {
                    suffixes.push(text.as_str());
                }
            }
        }
    }
    // `suffix` renames every key in the subtree's whole emitted dict, not
    // just whatever had already been assigned by the time the statement
    // was visited, so it's applied after all assigns/dels rather than
    // interleaved with them in document order.
    for text in suffixes {
        apply_suffix(&mut dict, text);
    }

    let name = build_display_name(&ctx.display, false);
    let short_name = build_display_name(&ctx.display, true);
    dict.insert("name".to_string(), name.clone());
    dict.insert("shortname".to_string(), short_name.clone());
    dict.insert("dep".to_string(), format!("[{}]", ctx.deps_seen.join(", ")));

    interpolate_dict(&mut dict)?;

    out.push(Variant { name, short_name, dict });
    Ok(())
}

fn push_frame<'a>(frames: &mut Vec<Frame<'a>>, stmts: &'a [Node], cond_mark: usize) {
    frames.push(Frame { stmts, idx: 0, cond_mark });
}

fn walk<'a>(root: &'a Block, ctx: &mut WalkCtx, frames: &mut Vec<Frame<'a>>, out: &mut Vec<Variant>) -> Result<(), CartconfError> {
    loop {
        let Some(top) = frames.last().copied() else {
            return materialize_leaf(ctx, out);
        };
        if top.idx >= top.stmts.len() {
            frames.pop();
            ctx.cond_stack.truncate(top.cond_mark);
            continue;
        }
        let node = &top.stmts[top.idx];
        frames.last_mut().unwrap().idx += 1;

        match node {
            Node::VariantsDecl(decl) => return branch_variants(root, decl, ctx, frames, out),
            Node::Join(join) => {
                if ctx.joined || ctx.skip_join_line == Some(join.line) {
                    return Ok(());
                }
                ctx.joined = true;
                return handle_join(root, join, out);
            }
            Node::CondBlock(cond) => {
                let mark = ctx.cond_stack.len();
                push_cond(ctx, cond);
                push_frame(frames, &cond.body.children, mark);
            }
            Node::Block(b) => {
                let mark = ctx.cond_stack.len();
                push_frame(frames, &b.children, mark);
            }
            Node::Assign(a) => {
                ctx.deferred.push(DeferredOp::Assign {
                    key: a.key.clone(),
                    op: a.op,
                    value: a.value.clone(),
                    conditions: ctx.cond_stack.clone(),
                });
            }
            Node::Del(d) => {
                ctx.deferred.push(DeferredOp::Del {
                    key: d.key.clone(),
                    conditions: ctx.cond_stack.clone(),
                });
            }
            Node::Suffix(s) => {
                ctx.deferred.push(DeferredOp::Suffix {
                    text: s.text.clone(),
                    conditions: ctx.cond_stack.clone(),
                });
            }
            Node::FilterStmt(f) => {
                ctx.filters.push(DeferredFilter {
                    kind: f.kind,
                    expr: f.expr.clone(),
                    conditions: ctx.cond_stack.clone(),
                });
            }
            // Already spliced away by `resolve_includes` before expansion
            // ever starts; encountering one here is a no-op.
            Node::Include(_) => {}
        }
    }
}

fn push_cond(ctx: &mut WalkCtx, cond: &CondBlock) {
    ctx.cond_stack.push(Condition {
        expr: cond.expr.clone(),
        negated: cond.negated,
    });
}

fn branch_variants<'a>(
    root: &'a Block,
    decl: &'a VariantsDecl,
    ctx: &mut WalkCtx,
    frames: &mut Vec<Frame<'a>>,
    out: &mut Vec<Variant>,
) -> Result<(), CartconfError> {
    // A single-child unnamed block is purely structural: it never shows
    // up in `name`/`short_name` and never contributes a path segment,
    // matching the "unnamed variants transparency" property.
    let transparent = decl.unnamed && decl.children.len() == 1;
    let frames_snapshot: Vec<Frame<'a>> = frames.clone();

    for bullet in &decl.children {
        if !deps_satisfied(&bullet.deps, &ctx.path) {
            continue;
        }

        *frames = frames_snapshot.clone();
        let path_mark = ctx.path.len();
        let deferred_mark = ctx.deferred.len();
        let deps_mark = ctx.deps_seen.len();
        let filters_mark = ctx.filters.len();

        if !transparent {
            ctx.path.push(PathSegment::with_attrs(
                bullet.name.clone(),
                decl.meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ));
            ctx.display.push(DisplaySeg {
                name: bullet.name.clone(),
                short_name_only: decl.short_name_only(),
            });
        }
        if let Some(var_type) = &decl.var_type {
            ctx.deferred.push(DeferredOp::Assign {
                key: var_type.clone(),
                op: AssignOp::Set,
                value: bullet.name.clone(),
                conditions: ctx.cond_stack.clone(),
            });
        }
        for dep in &bullet.deps {
            if !ctx.deps_seen.contains(dep) {
                ctx.deps_seen.push(dep.clone());
            }
        }

        let cond_mark = ctx.cond_stack.len();
        push_frame(frames, &bullet.body.children, cond_mark);
        walk(root, ctx, frames, out)?;

        if !transparent {
            ctx.path.truncate(path_mark);
            ctx.display.truncate(path_mark);
        }
        ctx.deferred.truncate(deferred_mark);
        ctx.deps_seen.truncate(deps_mark);
        ctx.filters.truncate(filters_mark);
    }
    Ok(())
}

/// `join` independently re-expands the whole tree once per named group
/// (each restricted by an implicit `only` filter for that group), then
/// zips the resulting sequences element-wise, truncating to the
/// shortest one. This is the interpretation that matches the resolved
/// "truncate on cardinality mismatch" design note: a true Cartesian
/// cross product never needs truncation, since its size is always the
/// product of the input sizes, so the fixtures' truncation behavior
/// only makes sense under element-wise zipping.
fn handle_join(root: &Block, join: &Join, out: &mut Vec<Variant>) -> Result<(), CartconfError> {
    if join.groups.is_empty() {
        return Err(ExpansionError::new("join has no groups").into());
    }

    let mut sequences = Vec::with_capacity(join.groups.len());
    for group in &join.groups {
        let seq = expand_tree_inner(root, &[], &[(FilterKind::Only, group.clone())], Some(join.line))?;
        sequences.push(seq);
    }

    let min_len = sequences.iter().map(|s| s.len()).min().unwrap_or(0);
    if min_len == 0 {
        return Err(ExpansionError::new("join produced zero subtrees").into());
    }

    for i in 0..min_len {
        let mut dict = IndexMap::new();
        let mut names = Vec::with_capacity(sequences.len());
        let mut short_names = Vec::with_capacity(sequences.len());
        let mut deps_union: Vec<String> = Vec::new();
        for seq in &sequences {
            let v = &seq[i];
            names.push(v.name.clone());
            short_names.push(v.short_name.clone());
            for d in parse_dep_list(&v.dict["dep"]) {
                if !deps_union.contains(&d) {
                    deps_union.push(d);
                }
            }
            for (k, val) in &v.dict {
                if k == "dep" {
                    continue;
                }
                dict.insert(k.clone(), val.clone());
            }
        }
        let name = names.join(".");
        let short_name = short_names.join(".");
        dict.insert("name".to_string(), name.clone());
        dict.insert("shortname".to_string(), short_name.clone());
        dict.insert("dep".to_string(), format!("[{}]", deps_union.join(", ")));
        interpolate_dict(&mut dict)?;
        out.push(Variant { name, short_name, dict });
    }
    Ok(())
}

/// Parse a `dep` dict value (`"[a, b, c]"` or `"[]"`) back into its
/// component names, for merging `dep` across joined groups instead of
/// letting a plain key overwrite drop all but the last group's deps.
fn parse_dep_list(formatted: &str) -> Vec<String> {
    let inner = formatted.trim_start_matches('[').trim_end_matches(']');
    if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(", ").map(|s| s.to_string()).collect()
    }
}

/// Expand an already include-resolved tree, seeded with extra
/// assignments/filters applied at the outermost scope (i.e. first in
/// declaration order, so a file-declared `Set` for the same key still
/// wins if it comes later).
pub fn expand_tree(
    root: &Block,
    extra_assignments: &[(String, String)],
    extra_filters: &[(FilterKind, FilterExpr)],
) -> Result<Vec<Variant>, CartconfError> {
    expand_tree_inner(root, extra_assignments, extra_filters, None)
}

fn expand_tree_inner(
    root: &Block,
    extra_assignments: &[(String, String)],
    extra_filters: &[(FilterKind, FilterExpr)],
    skip_join_line: Option<u32>,
) -> Result<Vec<Variant>, CartconfError> {
    // A genuinely empty tree with no extra assignments/filters has
    // nothing to emit: the loop in `walk` would otherwise drain straight
    // through the (empty) top-level frame and materialize a single
    // reserved-keys-only leaf, which isn't a real variant of anything.
    if root.children.is_empty() && extra_assignments.is_empty() && extra_filters.is_empty() {
        return Ok(Vec::new());
    }

    let mut ctx = WalkCtx::new();
    ctx.skip_join_line = skip_join_line;
    for (key, value) in extra_assignments {
        ctx.deferred.push(DeferredOp::Assign {
            key: key.clone(),
            op: AssignOp::Set,
            value: value.clone(),
            conditions: Vec::new(),
        });
    }
    for (kind, expr) in extra_filters {
        ctx.filters.push(DeferredFilter {
            kind: *kind,
            expr: expr.clone(),
            conditions: Vec::new(),
        });
    }

    let mut out = Vec::new();
    let mut frames = vec![Frame { stmts: &root.children, idx: 0, cond_mark: 0 }];
    walk(root, &mut ctx, &mut frames, &mut out)?;
    Ok(out)
}
