//! Component H — Build Coordinator.
//!
//! Assembles a [`SimulationDriver`] from raw section sources in the fixed
//! nine-step order of the Build Coordinator. Section decorators (`section`,
//! `collect_constants`, `collect_statevars`, `sort`, `procedural`) are an
//! authoring-surface concern outside this crate; callers express them here
//! as a [`SectionKind`] per source string, and this module applies the
//! standard flags per kind.

use std::collections::{BTreeMap, BTreeSet};

use smol_str::SmolStr;

use crate::analysis::{self, InitialCondition};
use crate::ast::{ExprKind, Section, StmtKind};
use crate::constants::ConstantManager;
use crate::driver::SimulationDriver;
use crate::errors::BuildError;
use crate::integration::{IntegrationManager, IntegrationSettings};
use crate::lexer::tokenize;
use crate::parser::Parser;
use crate::section::CompiledSection;
use crate::sort;
use crate::synth;
use crate::value::Value;

/// Which of the five section roles a source string fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SectionKind {
    Initial,
    Dynamic,
    Derivative,
    Discrete,
    Terminal,
}

impl SectionKind {
    fn name(self) -> &'static str {
        match self {
            SectionKind::Initial => "INITIAL",
            SectionKind::Dynamic => "DYNAMIC",
            SectionKind::Derivative => "DERIVATIVE",
            SectionKind::Discrete => "DISCRETE",
            SectionKind::Terminal => "TERMINAL",
        }
    }

    /// `collect_constants` is true for every section except DYNAMIC, whose
    /// body exists to configure the Integration Manager rather than to
    /// declare model constants.
    fn collect_constants(self) -> bool {
        !matches!(self, SectionKind::Dynamic)
    }

    /// DERIVATIVE and DISCRETE are dependent sections and require DYNAMIC.
    fn requires_dynamic(self) -> bool {
        matches!(self, SectionKind::Derivative | SectionKind::Discrete)
    }
}

/// One section's source, tagged with its role.
pub struct SectionSpec {
    pub kind: SectionKind,
    pub source: String,
}

/// Everything the Build Coordinator needs to assemble a run.
pub struct BuildInputs {
    pub sections: Vec<SectionSpec>,
    /// Explicit caller-supplied constants (ingestion path 3).
    pub explicit_constants: BTreeMap<String, Value>,
    /// Overrides DYNAMIC's and the constant table's CINT, if set.
    pub comm_interval: Option<i64>,
}

fn parse(kind: SectionKind, source: &str) -> Result<Section, BuildError> {
    let lexed = tokenize(source);
    let result = Parser::new(lexed.tokens, source)
        .with_lexer_diagnostics(lexed.diagnostics)
        .parse();
    // A synchronized partial parse can still return `section: Some(..)`
    // with one or more statements dropped; no error is recovered locally
    // here, so any `Error`-severity diagnostic fails the whole build.
    if result.had_error {
        return Err(BuildError::ParseFailed(kind.name().to_string()));
    }
    result.section.ok_or_else(|| BuildError::ParseFailed(kind.name().to_string()))
}

/// Runs the nine-step build pipeline and returns a ready-to-run driver.
pub fn build(inputs: BuildInputs) -> Result<SimulationDriver, BuildError> {
    let mut seen_kinds = BTreeSet::new();
    let mut parsed_sections: BTreeMap<SectionKind, Section> = BTreeMap::new();
    for spec in &inputs.sections {
        if !seen_kinds.insert(spec.kind) {
            return Err(BuildError::DuplicateSection(spec.kind.name().to_string()));
        }
        parsed_sections.insert(spec.kind, parse(spec.kind, &spec.source)?);
    }

    for kind in parsed_sections.keys() {
        if kind.requires_dynamic() && !parsed_sections.contains_key(&SectionKind::Dynamic) {
            return Err(BuildError::MissingDynamic(kind.name().to_string()));
        }
    }

    // Step 1: constants collection, then INITIAL scope ingestion.
    let mut constants = ConstantManager::new();
    for (kind, section) in &parsed_sections {
        if kind.collect_constants() {
            constants.ingest_section_declarations(section)?;
        }
    }
    constants.ingest_explicit(inputs.explicit_constants)?;
    if let Some(initial) = parsed_sections.get(&SectionKind::Initial) {
        let compiled_initial = CompiledSection::compile_unsorted(initial);
        let scope = compiled_initial.run(&constants.as_f64_map())?;
        constants.ingest_initial_scope(&scope);
    }

    let constant_names: BTreeSet<SmolStr> = constants.names();

    // Step 2 & 3: state-variable collection and sorting, gated per kind.
    let derivative_section = parsed_sections.get(&SectionKind::Derivative);
    let sorted_derivative = match derivative_section {
        Some(section) => {
            let parsed = analysis::parse_section(section, &constant_names)?;
            Some((parsed.clone(), sort::sort_section(&parsed)?))
        }
        None => None,
    };

    // Step 4: integration settings from DYNAMIC.
    let mut settings = parsed_sections
        .get(&SectionKind::Dynamic)
        .map(extract_integration_settings)
        .unwrap_or_default();

    // Step 5: CINT resolution — explicit caller value, then a constant
    // named CINT, then DYNAMIC's own assignment, then default 1.
    settings.cint = inputs
        .comm_interval
        .or_else(|| constants.get("CINT").and_then(Value::as_f64).map(as_integer_cint))
        .unwrap_or(settings.cint);
    if settings.cint <= 0 {
        settings.cint = 1;
    }

    // Step 6: synthesis of one derivative kernel per state variable.
    let state_vars = match &sorted_derivative {
        Some((parsed, _)) => resolve_state_vars(parsed, &constants)?,
        None => Vec::new(),
    };

    // Step 7: construction of the Integration Manager.
    let integration = IntegrationManager::new(&settings)?;

    // Step 8: compilation of each section.
    let derivative_compiled = match &sorted_derivative {
        Some((_, sorted)) => CompiledSection::compile(sorted),
        None => CompiledSection::empty(),
    };
    let dynamic_compiled = parsed_sections
        .get(&SectionKind::Dynamic)
        .map(CompiledSection::compile_unsorted);

    let mut flat_constants = constants.as_f64_map();
    flat_constants.remove("t");

    // Step 9: construction of the Simulation Driver.
    Ok(SimulationDriver::new(
        flat_constants,
        state_vars,
        derivative_compiled,
        dynamic_compiled,
        integration,
        settings.cint,
    ))
}

fn resolve_state_vars(
    parsed: &analysis::FunctionParseResult,
    constants: &ConstantManager,
) -> Result<Vec<(SmolStr, f64, synth::DerivativeKernel)>, BuildError> {
    let kernels = synth::synthesize(parsed, &constants.names())?;
    let mut out = Vec::with_capacity(kernels.len());
    for kernel in kernels {
        let entry = &parsed.variables[&kernel.state_var];
        let info = entry
            .state_var
            .as_ref()
            .expect("state variables always carry StateVarInfo");
        let initial_value = match &info.initial_condition {
            InitialCondition::Literal(v) => *v,
            InitialCondition::Constant(name) => constants
                .get(name)
                .and_then(Value::as_f64)
                .unwrap_or_default(),
        };
        out.push((kernel.state_var.clone(), initial_value, kernel));
    }
    Ok(out)
}

/// CINT is forced to an integer; a non-integer value is silently replaced
/// by 1 rather than truncated.
fn as_integer_cint(value: f64) -> i64 {
    if value.fract() == 0.0 {
        value as i64
    } else {
        1
    }
}

const RECOGNIZED_SETTINGS: [&str; 5] = ["IALG", "NSTP", "MAXT", "MINT", "CINT"];

fn extract_integration_settings(section: &Section) -> IntegrationSettings {
    let mut settings = IntegrationSettings::default();
    for stmt in &section.body {
        let (target, value) = match &stmt.node {
            StmtKind::Assign { target, value } => (target, value),
            StmtKind::AnnAssign { target, value, .. } => (target, value),
            _ => continue,
        };
        if !RECOGNIZED_SETTINGS.contains(&target.as_str()) {
            continue;
        }
        let literal = match &value.node {
            ExprKind::Int(i) => *i as f64,
            ExprKind::Float(f) => *f,
            _ => continue,
        };
        match target.as_str() {
            "IALG" => settings.ialg = literal as i64,
            "NSTP" => settings.nstp = literal as i64,
            "MAXT" => settings.maxt = literal,
            "MINT" => settings.mint = literal,
            "CINT" => settings.cint = as_integer_cint(literal),
            _ => {}
        }
    }
    settings
}
