//! Component E — Constant Manager.
//!
//! Three ingestion paths: executing INITIAL once and promoting its
//! resulting scope, literal `constant(name, value)` calls collected from
//! section bodies, and explicit caller-supplied values. An owned instance
//! per build, not a process-wide singleton.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::ast::{ExprKind, Section, StmtKind};
use crate::errors::ConstantError;
use crate::value::Value;

/// An owned, per-build constant registry.
#[derive(Debug, Clone)]
pub struct ConstantManager {
    values: BTreeMap<SmolStr, Value>,
}

impl ConstantManager {
    /// Creates a fresh registry with `t` pre-registered at `0.0`.
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        values.insert(SmolStr::new("t"), Value::Float(0.0));
        Self { values }
    }

    /// Registers a single constant. Re-registration under any path is
    /// always an error.
    pub fn register(&mut self, name: SmolStr, value: Value) -> Result<(), ConstantError> {
        if self.values.contains_key(&name) {
            return Err(ConstantError::Redefined(name.to_string()));
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Ingestion path 1: promotes every binding in the INITIAL section's
    /// resulting scope that is not already a registered constant.
    pub fn ingest_initial_scope(&mut self, scope: &BTreeMap<String, f64>) {
        for (name, value) in scope {
            let name = SmolStr::new(name.as_str());
            if self.values.contains_key(&name) {
                continue;
            }
            self.values.insert(name, Value::Float(*value));
        }
    }

    /// Ingestion path 2: literal `constant(name, value)` calls found
    /// anywhere in a section's raw (unsorted) body. This grammar has no
    /// string-literal syntax, so the name argument is a bare identifier
    /// whose text is the constant's name, not a variable reference.
    pub fn ingest_section_declarations(&mut self, section: &Section) -> Result<(), ConstantError> {
        for stmt in &section.body {
            let StmtKind::ExprStmt(expr) = &stmt.node else {
                continue;
            };
            let ExprKind::Call { callee, args, .. } = &expr.node else {
                continue;
            };
            if callee != "constant" {
                continue;
            }
            let (Some(name_arg), Some(value_arg)) = (args.first(), args.get(1)) else {
                continue;
            };
            let ExprKind::Name(name) = &name_arg.node else {
                return Err(ConstantError::InvalidValue("<constant name>".into()));
            };
            let value = match &value_arg.node {
                ExprKind::Int(i) => Value::Int(*i),
                ExprKind::Float(f) => Value::Float(*f),
                ExprKind::Bool(b) => Value::Bool(*b),
                _ => return Err(ConstantError::InvalidValue(name.to_string())),
            };
            self.register(name.clone(), value)?;
        }
        Ok(())
    }

    /// Ingestion path 3: explicit assignments supplied by the caller
    /// through the Build Coordinator.
    pub fn ingest_explicit(&mut self, explicit: BTreeMap<String, Value>) -> Result<(), ConstantError> {
        for (name, value) in explicit {
            self.register(SmolStr::new(name.as_str()), value)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> BTreeSet<SmolStr> {
        self.values.keys().cloned().collect()
    }

    /// A flattened numeric view suitable for seeding a section's or
    /// kernel's evaluation scope. Non-numeric constants (lists) are
    /// omitted; this grammar never reads them directly.
    pub fn as_f64_map(&self) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.to_string(), v)))
            .collect()
    }
}

impl Default for ConstantManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn parse(source: &str) -> Section {
        let lexed = tokenize(source);
        Parser::new(lexed.tokens, source)
            .with_lexer_diagnostics(lexed.diagnostics)
            .parse()
            .section
            .expect("section should parse")
    }

    #[test]
    fn t_is_preregistered_at_zero() {
        let manager = ConstantManager::new();
        assert_eq!(manager.get("t"), Some(&Value::Float(0.0)));
    }

    #[test]
    fn redefining_a_constant_is_an_error() {
        let mut manager = ConstantManager::new();
        manager.register(SmolStr::new("k"), Value::Float(1.0)).unwrap();
        let err = manager.register(SmolStr::new("k"), Value::Float(2.0)).unwrap_err();
        assert_eq!(err, ConstantError::Redefined("k".to_string()));
    }

    #[test]
    fn collects_literal_constant_declarations_from_a_section() {
        let section = parse("constant(k, 0.42)\nconstant(vol, 1.0)\n");
        let mut manager = ConstantManager::new();
        manager.ingest_section_declarations(&section).unwrap();
        assert_eq!(manager.get("k"), Some(&Value::Float(0.42)));
        assert_eq!(manager.get("vol"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn initial_scope_promotion_skips_already_registered_constants() {
        let mut manager = ConstantManager::new();
        manager.register(SmolStr::new("k"), Value::Float(9.0)).unwrap();
        let mut scope = BTreeMap::new();
        scope.insert("k".to_string(), 1.0);
        scope.insert("vol".to_string(), 2.0);
        manager.ingest_initial_scope(&scope);
        assert_eq!(manager.get("k"), Some(&Value::Float(9.0)));
        assert_eq!(manager.get("vol"), Some(&Value::Float(2.0)));
    }
}
