//! Component G — Simulation Driver.
//!
//! Owns the compiled sections, the integration manager, and the constant
//! and state-variable tables for one run, and drives the fixed-step loop
//! described below.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::delay::DelayRegistry;
use crate::errors::RunError;
use crate::integration::IntegrationManager;
use crate::section::CompiledSection;
use crate::synth::DerivativeKernel;

/// A column-oriented result table. `t` is always column zero; remaining
/// columns follow in the order they were requested. No external dataframe
/// crate: a run's reporting set is small and this keeps the dependency
/// stack aligned with the pack.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl ResultTable {
    fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    fn push_row(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column values by name, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// One state variable's identity within a run: its name, resolved initial
/// value, and synthesized kernel.
struct StateVariable {
    name: SmolStr,
    initial_value: f64,
    kernel: DerivativeKernel,
}

/// Drives a fixed-step simulation run.
pub struct SimulationDriver {
    constants: BTreeMap<String, f64>,
    state_vars: Vec<StateVariable>,
    derivative: CompiledSection,
    dynamic: Option<CompiledSection>,
    integration: IntegrationManager,
    cint: i64,
}

impl SimulationDriver {
    pub fn new(
        constants: BTreeMap<String, f64>,
        state_vars: Vec<(SmolStr, f64, DerivativeKernel)>,
        derivative: CompiledSection,
        dynamic: Option<CompiledSection>,
        integration: IntegrationManager,
        cint: i64,
    ) -> Self {
        Self {
            constants,
            state_vars: state_vars
                .into_iter()
                .map(|(name, initial_value, kernel)| StateVariable {
                    name,
                    initial_value,
                    kernel,
                })
                .collect(),
            derivative,
            dynamic,
            integration,
            cint,
        }
    }

    /// Runs the simulation to `stop_time`, reporting `t`, every name in
    /// `report`, and every state variable.
    pub fn run(&self, stop_time: f64, report: &BTreeSet<String>) -> Result<ResultTable, RunError> {
        let h = self.integration.step_size();

        let mut columns: BTreeSet<String> = report.clone();
        for sv in &self.state_vars {
            columns.insert(sv.name.to_string());
        }
        columns.remove("t");
        let mut header = vec!["t".to_string()];
        header.extend(columns.iter().cloned());
        let mut table = ResultTable::new(header.clone());

        // Step 1: initial arguments.
        let mut scope = self.constants.clone();
        for sv in &self.state_vars {
            scope.insert(sv.name.to_string(), sv.initial_value);
        }
        scope.insert("t".to_string(), 0.0);

        // Step 2: DERIVATIVE dry-run seeds the previous-step scope and
        // emits the first sample.
        let mut delays = DelayRegistry::new();
        let mut previous = self
            .derivative
            .run_with_delays(&scope, &mut delays)
            .map_err(|_| RunError::SectionFailed("DERIVATIVE".into()))?;
        table.push_row(row_for(&header, &previous));

        // Step 3: DYNAMIC validation dry-run, if present.
        if let Some(dynamic) = &self.dynamic {
            dynamic
                .run(&scope)
                .map_err(|_| RunError::SectionFailed("DYNAMIC".into()))?;
        }

        // Step 4: main stepping loop.
        let mut t = h;
        while t <= stop_time {
            let mut args = self.constants.clone();
            for sv in &self.state_vars {
                let value = previous
                    .get(sv.name.as_str())
                    .copied()
                    .ok_or_else(|| RunError::UndefinedName(sv.name.to_string()))?;
                args.insert(sv.name.to_string(), value);
            }
            args.insert("t".to_string(), t);

            for sv in &self.state_vars {
                let next = self.integration.advance(&sv.kernel, &args)?;
                args.insert(sv.name.to_string(), next);
            }

            let scope = self.derivative.run_with_delays(&args, &mut delays)?;
            table.push_row(row_for(&header, &scope));
            previous = scope;

            t += h;
        }

        Ok(project_to_communication_grid(table, self.cint, stop_time))
    }
}

fn row_for(header: &[String], scope: &BTreeMap<String, f64>) -> Vec<f64> {
    header.iter().map(|name| scope.get(name).copied().unwrap_or(0.0)).collect()
}

/// Projects the dense per-step table down to the communication grid: for
/// each `k*CINT` grid point, keeps the row whose `t` is nearest to it.
/// The grid has exactly `floor(stop_time / CINT) + 1` points.
fn project_to_communication_grid(table: ResultTable, cint: i64, stop_time: f64) -> ResultTable {
    if table.is_empty() || cint <= 0 {
        return table;
    }
    let t_idx = 0;
    let grid_points = (stop_time / cint as f64).floor() as i64 + 1;

    let mut grid = ResultTable::new(table.columns.clone());
    for k in 0..grid_points {
        let target = k as f64 * cint as f64;
        let best = table
            .rows
            .iter()
            .min_by(|a, b| {
                (a[t_idx] - target)
                    .abs()
                    .partial_cmp(&(b[t_idx] - target).abs())
                    .unwrap()
            })
            .cloned();
        if let Some(row) = best {
            grid.push_row(row);
        }
    }
    grid
}
