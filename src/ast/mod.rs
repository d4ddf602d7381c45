//! AST foundation types and node structures for section bodies.

mod expr;
mod span;
mod stmt;

// Re-export span types.
pub use span::{Span, Spanned};

// Re-export expression and statement nodes.
pub use expr::{BinOp, Expr, ExprKind, UnaryOp};
pub use stmt::{ProceduralDef, ReturnValue, Section, Stmt, StmtKind};
