//! Component D — Section Compiler.
//!
//! Turns a sorted section body into a [`CompiledSection`]: lifted
//! procedural helpers plus an ordered `(name, Expr)` assignment list,
//! callable against a `BTreeMap<String, f64>` scope of constants,
//! state variables, and `t`.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::ast::{Expr, StmtKind};
use crate::delay::DelayRegistry;
use crate::errors::RunError;
use crate::eval::{self, CompiledHelper};
use crate::sort::SortResult;

/// A compiled, callable section.
#[derive(Debug, Clone, Default)]
pub struct CompiledSection {
    helpers: BTreeMap<SmolStr, CompiledHelper>,
    body: Vec<(SmolStr, Expr)>,
}

impl CompiledSection {
    /// Compiles a sorted section. `constant(...)` statements have already
    /// been stripped during parsing (they never become variable-map
    /// entries); `end()` markers carry no runtime value and are dropped
    /// here, matching their "no runtime meaning after build" status.
    pub fn compile(sorted: &SortResult) -> Self {
        let mut helpers = BTreeMap::new();
        for def in &sorted.helpers {
            let body = def
                .body
                .iter()
                .filter_map(assignment_pair)
                .collect::<Vec<_>>();
            helpers.insert(
                def.name.clone(),
                CompiledHelper {
                    params: def.params.clone(),
                    body,
                    returns: def.returns.clone(),
                },
            );
        }

        let body = sorted.body.iter().filter_map(assignment_pair).collect();

        Self { helpers, body }
    }

    /// A section with no body: the default callable that returns its
    /// input scope unchanged (the `end()`-only section).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles a section in its original source order, with no
    /// topological sort and no procedural lifting. Used for sections not
    /// flagged `sort` (INITIAL, DYNAMIC): their bodies are expected to
    /// already read in a usable order.
    pub fn compile_unsorted(section: &crate::ast::Section) -> Self {
        let body = section.body.iter().filter_map(assignment_pair).collect();
        Self {
            helpers: BTreeMap::new(),
            body,
        }
    }

    /// Evaluates this section against an argument scope, returning the
    /// updated scope. Missing names referenced before being written
    /// surface as [`RunError::UndefinedName`].
    pub fn run(&self, args: &BTreeMap<String, f64>) -> Result<BTreeMap<String, f64>, RunError> {
        let mut scope = args.clone();
        let mut delays = DelayRegistry::new();
        eval::eval_stmts(&self.body, &mut scope, &self.helpers, &mut delays)?;
        Ok(scope)
    }

    /// Evaluates this section using a caller-owned delay registry, so
    /// delay state persists across steps within one simulation run.
    pub fn run_with_delays(
        &self,
        args: &BTreeMap<String, f64>,
        delays: &mut DelayRegistry,
    ) -> Result<BTreeMap<String, f64>, RunError> {
        let mut scope = args.clone();
        eval::eval_stmts(&self.body, &mut scope, &self.helpers, delays)?;
        Ok(scope)
    }
}

fn assignment_pair(stmt: &crate::ast::Stmt) -> Option<(SmolStr, Expr)> {
    match &stmt.node {
        StmtKind::Assign { target, value } => Some((target.clone(), value.clone())),
        StmtKind::AnnAssign { target, value, .. } => Some((target.clone(), value.clone())),
        StmtKind::ProceduralDef(_) | StmtKind::ExprStmt(_) => None,
    }
}
