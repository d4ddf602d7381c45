//! Statement nodes for section-body syntax.

use smol_str::SmolStr;

use super::expr::Expr;
use super::span::{Span, Spanned};

/// A statement, carrying its source span.
pub type Stmt = Spanned<StmtKind>;

/// What a procedural block's single `return` statement yields.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// `return name` — the name of a value computed inside the block.
    Name(SmolStr),
    /// `return <literal>` — a fixed value with no dependency on the
    /// block's body or parameters.
    Literal(Expr),
}

/// A nested, `@procedural`-decorated helper function.
///
/// Parameters become its dependency list, and its single `return`
/// statement names the variable this block computes (or gives a literal
/// value outright).
#[derive(Debug, Clone, PartialEq)]
pub struct ProceduralDef {
    /// The helper's name.
    pub name: SmolStr,
    /// Formal parameter names, in order.
    pub params: Vec<SmolStr>,
    /// Statements in the helper's body, excluding the final `return`.
    pub body: Vec<Stmt>,
    /// What this helper returns.
    pub returns: ReturnValue,
    /// Span of the whole `def` block.
    pub span: Span,
}

/// The structural shape of a statement recognized inside a section body.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `target = value`
    Assign { target: SmolStr, value: Expr },
    /// `target: annotation = value`
    AnnAssign {
        target: SmolStr,
        annotation: SmolStr,
        value: Expr,
    },
    /// An `@procedural def ...` block.
    ProceduralDef(ProceduralDef),
    /// A bare call statement: only `constant(...)` and `end()` are legal
    /// here; anything else is an authoring error raised by `analysis`.
    ExprStmt(Expr),
}

/// One labeled section's parsed body.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Statements in source order (not yet sorted).
    pub body: Vec<Stmt>,
}
