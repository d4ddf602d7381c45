//! Component B — Sorter.
//!
//! Reorders a section's variable map into a statement sequence where every
//! read is preceded by the write that produces it, lifts procedural blocks
//! to sibling helpers, and synthesizes stable identifiers for delay call
//! sites.

use std::collections::BTreeSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use smol_str::SmolStr;

use crate::analysis::{self, FunctionParseResult, VarKind, VariableMapEntry};
use crate::ast::{ExprKind, ProceduralDef, ReturnValue, Spanned, Stmt, StmtKind};
use crate::errors::SortError;

/// A section's statements, reordered and with procedural blocks lifted.
#[derive(Debug, Clone, PartialEq)]
pub struct SortResult {
    /// Procedural helpers lifted out of the section, each with its own
    /// body already sorted relative to its parameters.
    pub helpers: Vec<ProceduralDef>,
    /// The sorted assignment body, followed by `end()`-style statements.
    pub body: Vec<Stmt>,
}

/// Sorts a parsed section.
pub fn sort_section(parsed: &FunctionParseResult) -> Result<SortResult, SortError> {
    let order = topo_sort(&parsed.variables)?;

    let mut helpers = Vec::new();
    let mut body = Vec::new();

    for name in order {
        let entry = &parsed.variables[&name];
        match entry.kind {
            VarKind::Procedural => {
                let StmtKind::ProceduralDef(def) = &entry.stmt.node else {
                    unreachable!("Procedural-kind entries always wrap a ProceduralDef")
                };
                let sorted_def = sort_procedural_body(def)?;
                body.push(synthesize_call_site(&sorted_def));
                helpers.push(sorted_def);
            }
            VarKind::Delay => body.push(inject_delay_identifier(&name, &entry.stmt)),
            VarKind::Assign | VarKind::AnnAssign => body.push(entry.stmt.clone()),
        }
    }

    for entry in &parsed.expr_statements {
        body.push(entry.stmt.clone());
    }

    Ok(SortResult { helpers, body })
}

/// A pending/done fixed-point topological sort. Picking the
/// lexicographically smallest eligible name each round is one valid
/// linearization among possibly many; any valid choice is correct.
fn topo_sort(
    variables: &std::collections::BTreeMap<SmolStr, VariableMapEntry>,
) -> Result<Vec<SmolStr>, SortError> {
    let mut pending: BTreeSet<SmolStr> = variables.keys().cloned().collect();
    let mut done: BTreeSet<SmolStr> = BTreeSet::new();
    let mut order = Vec::new();

    while !pending.is_empty() {
        let next = pending
            .iter()
            .find(|v| variables[*v].dependencies.is_subset(&done))
            .cloned();

        match next {
            Some(v) => {
                pending.remove(&v);
                done.insert(v.clone());
                order.push(v);
            }
            None => {
                return Err(SortError::CyclicDependency(
                    pending.into_iter().map(|name| name.to_string()).collect(),
                ));
            }
        }
    }

    Ok(order)
}

/// Sorts a procedural helper's own body, treating its parameters the way
/// a top-level section treats constants: always-available inputs.
fn sort_procedural_body(def: &ProceduralDef) -> Result<ProceduralDef, SortError> {
    let params_as_inputs: BTreeSet<SmolStr> = def.params.iter().cloned().collect();
    let section = crate::ast::Section {
        body: def.body.clone(),
    };
    let parsed: FunctionParseResult = analysis::parse_section(&section, &params_as_inputs)
        .expect("a procedural block body parses under the same grammar as a section body");
    let sorted = sort_section(&parsed)?;

    let mut body = sorted.body;
    for helper in sorted.helpers {
        // Nested procedural blocks are not part of this grammar (only
        // top-level sections carry `@procedural` definitions), so this
        // is unreachable; kept so a future grammar extension fails loudly
        // instead of silently dropping helpers.
        body.insert(0, synthesize_call_site(&helper));
    }

    Ok(ProceduralDef {
        name: def.name.clone(),
        params: def.params.clone(),
        body,
        returns: def.returns.clone(),
        span: def.span.clone(),
    })
}

fn synthesize_call_site(def: &ProceduralDef) -> Stmt {
    let args = def
        .params
        .iter()
        .map(|p| Spanned::new(ExprKind::Name(p.clone()), def.span.clone()))
        .collect();

    Spanned::new(
        StmtKind::Assign {
            target: call_site_target(def),
            value: Spanned::new(
                ExprKind::Call {
                    callee: def.name.clone(),
                    args,
                    keywords: Vec::new(),
                },
                def.span.clone(),
            ),
        },
        def.span.clone(),
    )
}

/// The name a synthesized call site binds this block's output to. A
/// named return reuses the returned identifier; a literal return has no
/// identifier to reuse, so the block's own name stands in for it.
fn call_site_target(def: &ProceduralDef) -> SmolStr {
    match &def.returns {
        ReturnValue::Name(name) => name.clone(),
        ReturnValue::Literal(_) => def.name.clone(),
    }
}

/// Appends a stable per-call-site identifier to a `delay(...)` call's
/// argument list, derived by hashing the serialized arguments together
/// with the assignment target name. Stable for one process/build, not
/// guaranteed stable across Rust toolchain versions.
fn inject_delay_identifier(target: &SmolStr, stmt: &Stmt) -> Stmt {
    let StmtKind::Assign { target: t, value } = &stmt.node else {
        return stmt.clone();
    };
    let ExprKind::Call { callee, args, keywords } = &value.node else {
        return stmt.clone();
    };

    let mut hasher = DefaultHasher::new();
    target.hash(&mut hasher);
    format!("{args:?}").hash(&mut hasher);
    let id = hasher.finish() as i64;

    let mut new_args = args.clone();
    new_args.push(Spanned::new(ExprKind::Int(id), value.span.clone()));

    Spanned::new(
        StmtKind::Assign {
            target: t.clone(),
            value: Spanned::new(
                ExprKind::Call {
                    callee: callee.clone(),
                    args: new_args,
                    keywords: keywords.clone(),
                },
                value.span.clone(),
            ),
        },
        stmt.span.clone(),
    )
}
