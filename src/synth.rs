//! Component C — Derivative Synthesizer.
//!
//! For each state variable discovered by Component A, walks the variable
//! map backward from its derivative-expression name to collect every
//! transitive dependency, then materializes a [`DerivativeKernel`]: a
//! typed closure over an ordered `(name, Expr)` body, evaluated against a
//! `BTreeMap<String, f64>` at call time, rather than textual codegen and
//! `exec`.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::analysis::{self, FunctionParseResult, VariableMapEntry};
use crate::ast::{ExprKind, ReturnValue, StmtKind};
use crate::delay::DelayRegistry;
use crate::errors::SynthesisError;
use crate::eval::{self, CompiledHelper};

/// A synthesized derivative kernel for one state variable.
#[derive(Debug, Clone)]
pub struct DerivativeKernel {
    /// The state variable this kernel computes the derivative of.
    pub state_var: SmolStr,
    /// The name of the derivative expression itself (e.g. `dAdt`).
    pub derivative_name: SmolStr,
    /// Every formal parameter this kernel reads: the state variable,
    /// every constant encountered, and `t` (always included).
    pub params: Vec<SmolStr>,
    /// Intermediate assignments in emission order (reverse of first
    /// visit), followed by the assignment defining `derivative_name`.
    pub body: Vec<(SmolStr, crate::ast::Expr)>,
}

impl DerivativeKernel {
    /// Evaluates this kernel against a scope containing the state
    /// variable, every constant it needs, and `t`.
    pub fn call(&self, env: &BTreeMap<String, f64>) -> Result<f64, crate::errors::RunError> {
        let mut scope = env.clone();
        let helpers: BTreeMap<SmolStr, CompiledHelper> = BTreeMap::new();
        let mut delays = DelayRegistry::new();
        eval::eval_stmts(&self.body, &mut scope, &helpers, &mut delays)?;
        scope
            .get(self.derivative_name.as_str())
            .copied()
            .ok_or_else(|| crate::errors::RunError::UndefinedName(self.derivative_name.to_string()))
    }
}

/// Synthesizes one kernel per state variable discovered in `parsed`.
pub fn synthesize(
    parsed: &FunctionParseResult,
    constants: &BTreeSet<SmolStr>,
) -> Result<Vec<DerivativeKernel>, SynthesisError> {
    let mut kernels = Vec::new();

    for state_var in &parsed.state_vars {
        let entry = &parsed.variables[state_var];
        let state_info = entry
            .state_var
            .as_ref()
            .expect("a discovered state variable always carries StateVarInfo");
        let dy_name = state_info.derivative_name.clone();

        kernels.push(synthesize_one(state_var.clone(), dy_name, parsed, constants)?);
    }

    Ok(kernels)
}

fn synthesize_one(
    state_var: SmolStr,
    dy_name: SmolStr,
    parsed: &FunctionParseResult,
    constants: &BTreeSet<SmolStr>,
) -> Result<DerivativeKernel, SynthesisError> {
    if !parsed.variables.contains_key(&dy_name) {
        return Err(SynthesisError::UnknownDerivativeName(dy_name.to_string()));
    }

    // Reverse reachability walk from dy_name, numbering intermediates in
    // first-visit order so they can be emitted in reverse.
    let mut visited: BTreeSet<SmolStr> = BTreeSet::new();
    let mut order: Vec<SmolStr> = Vec::new();
    let mut used_constants: BTreeSet<SmolStr> = BTreeSet::new();
    let mut other_state_inputs: BTreeSet<SmolStr> = BTreeSet::new();

    let mut stack = vec![dy_name.clone()];
    while let Some(name) = stack.pop() {
        if visited.contains(&name) {
            continue;
        }
        visited.insert(name.clone());
        order.push(name.clone());

        let Some(entry) = parsed.variables.get(&name) else {
            // A leaf name that is not itself assigned here: a constant or
            // a state variable (this one, or another).
            if name == state_var {
                continue;
            }
            if parsed.state_vars.contains(&name) {
                other_state_inputs.insert(name);
            } else if constants.contains(&name) {
                used_constants.insert(name);
            }
            continue;
        };

        // `entry.dependencies` is pre-filtered for Component B's sort
        // (constants, state vars, and `t` already stripped). This walk
        // instead needs the raw reference set so it can classify each
        // encountered name as a constant, another state variable, or an
        // intermediate — so it re-derives dependencies from the
        // statement itself rather than reusing that filtered field.
        for dep in raw_dependencies(entry) {
            if !visited.contains(&dep) {
                stack.push(dep);
            }
        }
    }

    // `order[0]` is dy_name itself; everything after is an intermediate,
    // in first-visit order. Emission is intermediates in reverse-first-
    // visit order, then dy_name's own assignment last.
    let dy_entry: &VariableMapEntry = &parsed.variables[&dy_name];
    let mut body = Vec::new();
    for name in order.iter().skip(1).rev() {
        if let Some(entry) = parsed.variables.get(name) {
            if let (target, Some(value)) = assignment_value(&entry.stmt) {
                body.push((target, value));
            }
        }
    }
    if let (target, Some(value)) = assignment_value(&dy_entry.stmt) {
        body.push((target, value));
    }

    let mut params: Vec<SmolStr> = used_constants.into_iter().collect();
    params.extend(other_state_inputs);
    params.push(state_var.clone());
    params.push(SmolStr::new("t"));
    params.sort();
    params.dedup();

    Ok(DerivativeKernel {
        state_var,
        derivative_name: dy_name,
        params,
        body,
    })
}

/// The unfiltered set of names an entry's statement references: every
/// name `analysis::collect_dependencies` would find in an assignment's
/// value, or a procedural block's formal parameters. Unlike
/// `VariableMapEntry::dependencies`, nothing is stripped out here, since
/// this walk needs to see constants and other state variables to
/// classify them as it goes.
fn raw_dependencies(entry: &VariableMapEntry) -> BTreeSet<SmolStr> {
    match &entry.stmt.node {
        StmtKind::Assign { value, .. } | StmtKind::AnnAssign { value, .. } => {
            let mut deps = BTreeSet::new();
            analysis::collect_dependencies(value, &mut deps);
            deps
        }
        StmtKind::ProceduralDef(def) => match &def.returns {
            ReturnValue::Name(_) => def.params.iter().cloned().collect(),
            ReturnValue::Literal(_) => BTreeSet::new(),
        },
        StmtKind::ExprStmt(_) => BTreeSet::new(),
    }
}

fn assignment_value(stmt: &crate::ast::Stmt) -> (SmolStr, Option<crate::ast::Expr>) {
    match &stmt.node {
        crate::ast::StmtKind::Assign { target, value } => (target.clone(), Some(value.clone())),
        crate::ast::StmtKind::AnnAssign { target, value, .. } => (target.clone(), Some(value.clone())),
        crate::ast::StmtKind::ProceduralDef(def) => {
            let target = match &def.returns {
                ReturnValue::Name(name) => name.clone(),
                ReturnValue::Literal(_) => def.name.clone(),
            };
            (
                target,
                Some(crate::ast::Spanned::new(
                    ExprKind::Call {
                        callee: def.name.clone(),
                        args: def
                            .params
                            .iter()
                            .map(|p| crate::ast::Spanned::new(ExprKind::Name(p.clone()), def.span.clone()))
                            .collect(),
                        keywords: Vec::new(),
                    },
                    def.span.clone(),
                )),
            )
        }
        crate::ast::StmtKind::ExprStmt(_) => (SmolStr::new(""), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use std::collections::BTreeMap as Map;

    fn analyze(source: &str, constants: &[&str]) -> (FunctionParseResult, BTreeSet<SmolStr>) {
        let lexed = tokenize(source);
        let section = Parser::new(lexed.tokens, source)
            .with_lexer_diagnostics(lexed.diagnostics)
            .parse()
            .section
            .expect("section should parse");
        let constants: BTreeSet<SmolStr> = constants.iter().map(|s| SmolStr::new(*s)).collect();
        let parsed = analysis::parse_section(&section, &constants).expect("analysis should succeed");
        (parsed, constants)
    }

    #[test]
    fn synthesizes_kernel_for_linear_decay() {
        let (parsed, constants) = analyze(
            "A = integ(dAdt, 3.811004739069482)\ndAdt = -k * A / vol\n",
            &["k", "vol"],
        );
        let kernels = synthesize(&parsed, &constants).expect("synthesis should succeed");
        assert_eq!(kernels.len(), 1);
        let kernel = &kernels[0];
        assert_eq!(kernel.state_var, SmolStr::new("A"));
        assert!(kernel.params.contains(&SmolStr::new("k")));
        assert!(kernel.params.contains(&SmolStr::new("vol")));
        assert!(kernel.params.contains(&SmolStr::new("t")));

        let mut env = Map::new();
        env.insert("A".to_string(), 3.811004739069482);
        env.insert("k".to_string(), 0.42);
        env.insert("vol".to_string(), 1.0);
        env.insert("t".to_string(), 0.0);
        let dadt = kernel.call(&env).unwrap();
        assert!((dadt - (-0.42 * 3.811004739069482)).abs() < 1e-12);
    }

    #[test]
    fn kernel_slicing_excludes_unreachable_names() {
        let (parsed, constants) = analyze(
            "A = integ(dAdt, 1.0)\ndAdt = -k * A\nunused = k * 99\n",
            &["k"],
        );
        let kernels = synthesize(&parsed, &constants).unwrap();
        let names: Vec<String> = kernels[0]
            .body
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert!(!names.contains(&"unused".to_string()));
    }

    #[test]
    fn unknown_derivative_name_is_an_error() {
        let (mut parsed, constants) = analyze("A = integ(dAdt, 1.0)\n", &[]);
        parsed.variables.remove(&SmolStr::new("dAdt"));
        // Simulate a malformed parse where dAdt was never assigned.
        let err = synthesize(&parsed, &constants);
        assert!(err.is_err());
    }
}
