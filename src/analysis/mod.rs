//! Component A — Function Parser.
//!
//! Walks a single section's statements and builds the variable map, the
//! expression map, and the list of locally-discovered state variables.
//! Performs no sorting and no synthesis; [`crate::sort`] and
//! [`crate::synth`] consume its output.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use crate::ast::{Expr, ExprKind, ReturnValue, Section, Stmt, StmtKind};
use crate::errors::AnalysisError;

/// The syntactic shape a variable map entry was classified from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Assign,
    AnnAssign,
    Procedural,
    Delay,
}

/// Where a state variable's initial condition comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    /// A named constant.
    Constant(SmolStr),
    /// A literal numeric value.
    Literal(f64),
}

/// Recorded when an assignment's right-hand side is an `integ(...)` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVarInfo {
    /// The name of the derivative expression (`integ`'s first argument).
    pub derivative_name: SmolStr,
    pub initial_condition: InitialCondition,
}

/// One entry of the variable map: a single assigned name, its direct
/// dependencies, and the statement that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMapEntry {
    pub stmt: Stmt,
    pub dependencies: BTreeSet<SmolStr>,
    pub kind: VarKind,
    pub state_var: Option<StateVarInfo>,
}

/// A non-assigning statement of interest, retained verbatim. Only `end()`
/// populates this map; `constant(...)` is recognized and discarded here
/// (handled by the constant manager).
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMapEntry {
    pub stmt: Stmt,
}

/// Output of Component A for one section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionParseResult {
    /// Keyed by assigned/returned name.
    pub variables: std::collections::BTreeMap<SmolStr, VariableMapEntry>,
    /// `end()`-style statements, in original order.
    pub expr_statements: Vec<ExprMapEntry>,
    /// Names discovered to be state variables in this section, in the
    /// order their `integ(...)` assignment was authored.
    pub state_vars: Vec<SmolStr>,
}

/// Parses a section's statements into a variable map, expression map, and
/// state-variable list.
///
/// `constants` is the set of names already known to be constants (from the
/// constant manager), used for dependency filtering.
pub fn parse_section(
    section: &Section,
    constants: &BTreeSet<SmolStr>,
) -> Result<FunctionParseResult, AnalysisError> {
    let mut result = FunctionParseResult::default();

    for stmt in &section.body {
        let target_and_value = match &stmt.node {
            StmtKind::Assign { target, value } => Some((target, value)),
            StmtKind::AnnAssign { target, value, .. } => Some((target, value)),
            _ => None,
        };
        if let Some((target, value)) = target_and_value {
            if let ExprKind::Call { callee, args, .. } = &value.node {
                if callee == "integ" && !args.is_empty() {
                    result.state_vars.push(target.clone());
                }
            }
        }
    }

    let mut local_state_vars: BTreeSet<SmolStr> = result.state_vars.iter().cloned().collect();
    local_state_vars.insert(SmolStr::new("t"));

    for stmt in &section.body {
        match &stmt.node {
            StmtKind::Assign { target, value } => {
                let entry = build_entry(stmt.clone(), value, VarKind::Assign, constants, &local_state_vars)?;
                result.variables.insert(target.clone(), entry);
            }
            StmtKind::AnnAssign { target, value, .. } => {
                let entry =
                    build_entry(stmt.clone(), value, VarKind::AnnAssign, constants, &local_state_vars)?;
                result.variables.insert(target.clone(), entry);
            }
            StmtKind::ProceduralDef(def) => {
                // A named return depends on every parameter the block
                // reads to produce it; a literal return depends on
                // nothing, since it never touches the block's body.
                let dependencies: BTreeSet<SmolStr> = match &def.returns {
                    ReturnValue::Name(_) => {
                        let mut deps: BTreeSet<SmolStr> = def.params.iter().cloned().collect();
                        deps.retain(|name| !constants.contains(name) && !local_state_vars.contains(name));
                        deps
                    }
                    ReturnValue::Literal(_) => BTreeSet::new(),
                };
                let key = match &def.returns {
                    ReturnValue::Name(name) => name.clone(),
                    ReturnValue::Literal(_) => def.name.clone(),
                };
                result.variables.insert(
                    key,
                    VariableMapEntry {
                        stmt: stmt.clone(),
                        dependencies,
                        kind: VarKind::Procedural,
                        state_var: None,
                    },
                );
            }
            StmtKind::ExprStmt(expr) => match &expr.node {
                ExprKind::Call { callee, .. } if callee == "end" => {
                    result.expr_statements.push(ExprMapEntry { stmt: stmt.clone() });
                }
                ExprKind::Call { callee, .. } if callee == "constant" => {}
                ExprKind::Call { callee, .. } => {
                    return Err(AnalysisError::UnknownBareCall(callee.to_string()));
                }
                _ => return Err(AnalysisError::UnknownBareCall("<non-call expression>".into())),
            },
        }
    }

    Ok(result)
}

fn build_entry(
    stmt: Stmt,
    value: &Expr,
    kind: VarKind,
    constants: &BTreeSet<SmolStr>,
    local_state_vars: &BTreeSet<SmolStr>,
) -> Result<VariableMapEntry, AnalysisError> {
    let mut dependencies = BTreeSet::new();
    collect_dependencies(value, &mut dependencies);
    dependencies.retain(|name| !constants.contains(name) && !local_state_vars.contains(name));

    let (kind, state_var) = match &value.node {
        ExprKind::Call { callee, args, .. } if callee == "integ" => {
            let derivative_name = match args.first().map(|a| &a.node) {
                Some(ExprKind::Name(name)) => name.clone(),
                _ => return Err(AnalysisError::NonNameDerivativeArgument),
            };
            let initial_condition = match args.get(1).map(|a| &a.node) {
                Some(ExprKind::Name(name)) => InitialCondition::Constant(name.clone()),
                Some(ExprKind::Int(i)) => InitialCondition::Literal(*i as f64),
                Some(ExprKind::Float(f)) => InitialCondition::Literal(*f),
                _ => return Err(AnalysisError::UnsupportedExpression),
            };
            (
                kind,
                Some(StateVarInfo {
                    derivative_name,
                    initial_condition,
                }),
            )
        }
        ExprKind::Call { callee, .. } if callee == "delay" => (VarKind::Delay, None),
        _ => (kind, None),
    };

    Ok(VariableMapEntry {
        stmt,
        dependencies,
        kind,
        state_var,
    })
}

/// Recursively collects every name referenced by an expression. Call
/// callees are never dependencies themselves; their arguments are.
pub(crate) fn collect_dependencies(expr: &Expr, out: &mut BTreeSet<SmolStr>) {
    match &expr.node {
        ExprKind::Name(name) => {
            out.insert(name.clone());
        }
        ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Bool(_) => {}
        ExprKind::Unary(_, operand) => collect_dependencies(operand, out),
        ExprKind::Binary(_, lhs, rhs) => {
            collect_dependencies(lhs, out);
            collect_dependencies(rhs, out);
        }
        ExprKind::Call { args, keywords, .. } => {
            for arg in args {
                collect_dependencies(arg, out);
            }
            for (_, value) in keywords {
                collect_dependencies(value, out);
            }
        }
        ExprKind::Subscript(value, index) => {
            collect_dependencies(value, out);
            collect_dependencies(index, out);
        }
    }
}
