//! Component F — Integration Manager.
//!
//! Owns the step size and dispatches to one of ten named algorithm slots.
//! Only `IALG = 5` (fixed-step RK4) is implemented; the rest fail fast with
//! [`IntegrationError::Unimplemented`], distinct from configuration errors.

use std::collections::BTreeMap;

use crate::errors::{IntegrationError, RunError};
use crate::synth::DerivativeKernel;

/// Integration settings extracted from DYNAMIC. Any field left unset by
/// DYNAMIC keeps its default.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationSettings {
    pub ialg: i64,
    pub nstp: i64,
    pub maxt: f64,
    /// Reserved; recognized but unused by any implemented algorithm.
    pub mint: f64,
    pub cint: i64,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            ialg: 5,
            nstp: 1,
            maxt: f64::INFINITY,
            mint: 0.0,
            cint: 1,
        }
    }
}

/// Owns the resolved step size and advances every state variable one step
/// using the configured algorithm.
#[derive(Debug, Clone)]
pub struct IntegrationManager {
    ialg: i64,
    step: f64,
}

impl IntegrationManager {
    /// `h = min(MAXT, CINT / NSTP)`.
    pub fn new(settings: &IntegrationSettings) -> Result<Self, IntegrationError> {
        if settings.nstp <= 0 {
            return Err(IntegrationError::Configuration(
                "NSTP must be a positive integer".into(),
            ));
        }
        let step = settings.maxt.min(settings.cint as f64 / settings.nstp as f64);
        if !(step.is_finite() && step > 0.0) {
            return Err(IntegrationError::Configuration(
                "resolved step size must be a positive, finite number".into(),
            ));
        }
        Ok(Self {
            ialg: settings.ialg,
            step,
        })
    }

    pub fn step_size(&self) -> f64 {
        self.step
    }

    /// Advances one state variable by one step using the configured
    /// algorithm, reading every other input from `env` (which already
    /// holds `t`, every constant, and every other state variable's
    /// current value).
    pub fn advance(
        &self,
        kernel: &DerivativeKernel,
        env: &BTreeMap<String, f64>,
    ) -> Result<f64, RunError> {
        match self.ialg {
            5 => self.rk4_step(kernel, env),
            other => Err(RunError::SectionFailed(format!(
                "integration algorithm {other} is not implemented: {}",
                IntegrationError::Unimplemented(other as u32)
            ))),
        }
    }

    /// Fixed-step RK4. k2, k3, and k4 are deliberately evaluated at `tₙ`
    /// rather than `tₙ + h/2` and `tₙ + h` — not textbook RK4, preserved
    /// as an open-question decision rather than "fixed".
    fn rk4_step(&self, kernel: &DerivativeKernel, env: &BTreeMap<String, f64>) -> Result<f64, RunError> {
        let h = self.step;
        let y_n = *env
            .get(kernel.state_var.as_str())
            .ok_or_else(|| RunError::UndefinedName(kernel.state_var.to_string()))?;

        let mut scope = env.clone();
        let k1 = kernel.call(&scope)?;

        scope.insert(kernel.state_var.to_string(), y_n + h * k1 / 2.0);
        let k2 = kernel.call(&scope)?;

        scope.insert(kernel.state_var.to_string(), y_n + h * k2);
        let k3 = kernel.call(&scope)?;

        scope.insert(kernel.state_var.to_string(), y_n + h * k3);
        let k4 = kernel.call(&scope)?;

        Ok(y_n + (h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4))
    }
}
