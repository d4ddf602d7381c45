//! Typed error enums for the build and run pipeline.
//!
//! Hand-rolled `Display`/`Error` impls, matching this crate's lexer/parser
//! diagnostics: no `thiserror`.

use std::fmt;

/// An error raised while sorting a section's variable map.
#[derive(Debug, Clone, PartialEq)]
pub enum SortError {
    /// `pending` is non-empty and no further progress can be made.
    CyclicDependency(Vec<String>),
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::CyclicDependency(names) => {
                write!(f, "cyclic dependency among variables: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for SortError {}

/// An error raised while analyzing a section's statements (Component A).
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// `constant(...)`/`end()` is the only legal bare expression statement.
    UnknownBareCall(String),
    /// `integ(...)`'s first argument was not a plain name.
    NonNameDerivativeArgument,
    /// An expression shape this grammar's analysis cannot classify.
    UnsupportedExpression,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UnknownBareCall(name) => {
                write!(f, "'{name}' is not a legal bare expression statement")
            }
            AnalysisError::NonNameDerivativeArgument => {
                write!(f, "integ()'s first argument must be a plain name")
            }
            AnalysisError::UnsupportedExpression => {
                write!(f, "unsupported expression shape")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// An error raised by the Constant Manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantError {
    /// A constant was registered more than once.
    Redefined(String),
    /// A constant value was not int/float/bool/homogeneous-list.
    InvalidValue(String),
}

impl fmt::Display for ConstantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantError::Redefined(name) => write!(f, "constant '{name}' is already defined"),
            ConstantError::InvalidValue(name) => {
                write!(f, "constant '{name}' has an invalid value")
            }
        }
    }
}

impl std::error::Error for ConstantError {}

/// An error raised by the Derivative Synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The derivative-expression name was never assigned in the section.
    UnknownDerivativeName(String),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::UnknownDerivativeName(name) => {
                write!(f, "derivative expression '{name}' is never assigned")
            }
        }
    }
}

impl std::error::Error for SynthesisError {}

/// An error raised by the Integration Manager. Distinct from
/// [`RunError`] so "algorithm not implemented" is never confused with a
/// bad configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// `IALG` named an algorithm slot that is a recognized id but has no
    /// implementation.
    Unimplemented(u32),
    /// `IALG`, `NSTP`, or `MAXT` had an invalid value.
    Configuration(String),
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationError::Unimplemented(ialg) => {
                write!(f, "integration algorithm {ialg} is not implemented")
            }
            IntegrationError::Configuration(message) => {
                write!(f, "integration configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

/// An error raised while evaluating a compiled section or derivative
/// kernel at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// A name was read before it was ever written.
    UndefinedName(String),
    /// A section failed to evaluate during the initial dry-run.
    SectionFailed(String),
    /// Division or modulo by zero.
    DivisionByZero,
    /// A delay-buffer lookup failed.
    Delay(DelayError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UndefinedName(name) => write!(f, "'{name}' is undefined"),
            RunError::SectionFailed(section) => {
                write!(f, "section '{section}' failed to run")
            }
            RunError::DivisionByZero => write!(f, "division by zero"),
            RunError::Delay(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<DelayError> for RunError {
    fn from(err: DelayError) -> Self {
        RunError::Delay(err)
    }
}

/// An error raised by the delay buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayError {
    /// The requested past time precedes every retained sample.
    HistoryExhausted { requested: f64, earliest: f64 },
}

impl fmt::Display for DelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayError::HistoryExhausted { requested, earliest } => write!(
                f,
                "delay buffer has no sample at or before t={requested}; earliest retained sample is t={earliest}"
            ),
        }
    }
}

impl std::error::Error for DelayError {}

/// An error raised while assembling the build pipeline (Component H).
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Two sections were declared with the same name.
    DuplicateSection(String),
    /// DERIVATIVE or DISCRETE was present without DYNAMIC.
    MissingDynamic(String),
    /// A section's source failed to parse.
    ParseFailed(String),
    Analysis(AnalysisError),
    Sort(SortError),
    Constant(ConstantError),
    Synthesis(SynthesisError),
    Integration(IntegrationError),
    Run(RunError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateSection(name) => {
                write!(f, "section '{name}' is declared more than once")
            }
            BuildError::MissingDynamic(name) => {
                write!(f, "section '{name}' requires a DYNAMIC section")
            }
            BuildError::ParseFailed(name) => write!(f, "section '{name}' failed to parse"),
            BuildError::Analysis(err) => write!(f, "{err}"),
            BuildError::Sort(err) => write!(f, "{err}"),
            BuildError::Constant(err) => write!(f, "{err}"),
            BuildError::Synthesis(err) => write!(f, "{err}"),
            BuildError::Integration(err) => write!(f, "{err}"),
            BuildError::Run(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<AnalysisError> for BuildError {
    fn from(err: AnalysisError) -> Self {
        BuildError::Analysis(err)
    }
}

impl From<SortError> for BuildError {
    fn from(err: SortError) -> Self {
        BuildError::Sort(err)
    }
}

impl From<ConstantError> for BuildError {
    fn from(err: ConstantError) -> Self {
        BuildError::Constant(err)
    }
}

impl From<SynthesisError> for BuildError {
    fn from(err: SynthesisError) -> Self {
        BuildError::Synthesis(err)
    }
}

impl From<IntegrationError> for BuildError {
    fn from(err: IntegrationError) -> Self {
        BuildError::Integration(err)
    }
}

impl From<RunError> for BuildError {
    fn from(err: RunError) -> Self {
        BuildError::Run(err)
    }
}
