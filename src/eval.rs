//! Shared expression/statement evaluator.
//!
//! Both the Derivative Synthesizer's kernels and the Section Compiler's
//! compiled sections are, at their core, an ordered list of `(name, Expr)`
//! assignments evaluated against a `BTreeMap<String, f64>` scope. This
//! module is the one place that walks `Expr` nodes to produce a number,
//! so arithmetic semantics (division by zero, call dispatch, delay
//! lookups) are defined exactly once.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::ast::{BinOp, Expr, ExprKind, ReturnValue, UnaryOp};
use crate::delay::DelayRegistry;
use crate::errors::RunError;

/// A lifted procedural helper, materialized for evaluation: bind its
/// parameters to argument values, run its sorted body, then resolve its
/// return value — either the bound value of a return name, or a fixed
/// literal independent of the body.
#[derive(Debug, Clone)]
pub struct CompiledHelper {
    pub params: Vec<SmolStr>,
    pub body: Vec<(SmolStr, Expr)>,
    pub returns: ReturnValue,
}

/// Evaluates a single expression against a variable scope.
pub fn eval_expr(
    expr: &Expr,
    env: &BTreeMap<String, f64>,
    helpers: &BTreeMap<SmolStr, CompiledHelper>,
    delays: &mut DelayRegistry,
) -> Result<f64, RunError> {
    match &expr.node {
        ExprKind::Name(name) => env
            .get(name.as_str())
            .copied()
            .ok_or_else(|| RunError::UndefinedName(name.to_string())),
        ExprKind::Int(value) => Ok(*value as f64),
        ExprKind::Float(value) => Ok(*value),
        ExprKind::Bool(value) => Ok(if *value { 1.0 } else { 0.0 }),
        ExprKind::Unary(op, operand) => {
            let value = eval_expr(operand, env, helpers, delays)?;
            Ok(match op {
                UnaryOp::Neg => -value,
                UnaryOp::Pos => value,
            })
        }
        ExprKind::Binary(op, lhs, rhs) => {
            let lhs = eval_expr(lhs, env, helpers, delays)?;
            let rhs = eval_expr(rhs, env, helpers, delays)?;
            eval_binop(*op, lhs, rhs)
        }
        ExprKind::Subscript(..) => Err(RunError::UndefinedName(
            "subscript expressions have no runtime value in this grammar".into(),
        )),
        ExprKind::Call { callee, args, .. } if callee == "delay" => {
            eval_delay(args, env, helpers, delays)
        }
        ExprKind::Call { callee, args, .. } => eval_helper_call(callee, args, env, helpers, delays),
    }
}

fn eval_binop(op: BinOp, lhs: f64, rhs: f64) -> Result<f64, RunError> {
    match op {
        BinOp::Add => Ok(lhs + rhs),
        BinOp::Sub => Ok(lhs - rhs),
        BinOp::Mul => Ok(lhs * rhs),
        BinOp::Div => {
            if rhs == 0.0 {
                Err(RunError::DivisionByZero)
            } else {
                Ok(lhs / rhs)
            }
        }
        BinOp::FloorDiv => {
            if rhs == 0.0 {
                Err(RunError::DivisionByZero)
            } else {
                Ok((lhs / rhs).floor())
            }
        }
        BinOp::Mod => {
            if rhs == 0.0 {
                Err(RunError::DivisionByZero)
            } else {
                Ok(lhs.rem_euclid(rhs))
            }
        }
        BinOp::Pow => Ok(lhs.powf(rhs)),
    }
}

fn eval_delay(
    args: &[Expr],
    env: &BTreeMap<String, f64>,
    helpers: &BTreeMap<SmolStr, CompiledHelper>,
    delays: &mut DelayRegistry,
) -> Result<f64, RunError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval_expr(arg, env, helpers, delays)?);
    }
    let [x, ic, tdl, nmx, _delmin, id, ..] = values[..] else {
        return Err(RunError::UndefinedName(
            "delay() requires (x, ic, tdl, nmx, delmin) plus a synthesized identifier".into(),
        ));
    };
    let t = env
        .get("t")
        .copied()
        .ok_or_else(|| RunError::UndefinedName("t".into()))?;

    Ok(delays.evaluate(id as i64, t, x, ic, tdl, nmx.max(1.0) as usize)?)
}

fn eval_helper_call(
    callee: &SmolStr,
    args: &[Expr],
    env: &BTreeMap<String, f64>,
    helpers: &BTreeMap<SmolStr, CompiledHelper>,
    delays: &mut DelayRegistry,
) -> Result<f64, RunError> {
    let helper = helpers
        .get(callee)
        .ok_or_else(|| RunError::UndefinedName(callee.to_string()))?
        .clone();

    let mut local_env = BTreeMap::new();
    for (param, arg) in helper.params.iter().zip(args) {
        local_env.insert(param.to_string(), eval_expr(arg, env, helpers, delays)?);
    }

    eval_stmts(&helper.body, &mut local_env, helpers, delays)?;

    match &helper.returns {
        ReturnValue::Name(name) => local_env
            .get(name.as_str())
            .copied()
            .ok_or_else(|| RunError::UndefinedName(name.to_string())),
        ReturnValue::Literal(expr) => eval_expr(expr, &local_env, helpers, delays),
    }
}

/// Evaluates an ordered list of `(name, expr)` assignments, writing each
/// result into `env` as it goes so later assignments can read it.
///
/// An assignment whose expression is an `integ(...)` call is skipped: the
/// state variable it names is advanced by the Integration Manager, not by
/// generic evaluation, and is already present in `env` as an input.
pub fn eval_stmts(
    body: &[(SmolStr, Expr)],
    env: &mut BTreeMap<String, f64>,
    helpers: &BTreeMap<SmolStr, CompiledHelper>,
    delays: &mut DelayRegistry,
) -> Result<(), RunError> {
    for (name, expr) in body {
        if matches!(&expr.node, ExprKind::Call { callee, .. } if callee == "integ") {
            continue;
        }
        let value = eval_expr(expr, env, helpers, delays)?;
        env.insert(name.to_string(), value);
    }
    Ok(())
}
