//! Expression nodes for section-body syntax.

use smol_str::SmolStr;

use super::span::Spanned;

/// An expression, carrying its source span.
pub type Expr = Spanned<ExprKind>;

/// Binary arithmetic operators recognized inside a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
}

/// Unary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
}

/// The structural shape of an expression.
///
/// This mirrors the node kinds `analysis` knows how to walk for
/// dependencies: names, literals, unary/binary operators, calls, and
/// subscripts. Any other Rust-level node (there are none today, since this
/// grammar is deliberately small) would be an unsupported-expression
/// authoring error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A bare identifier reference.
    Name(SmolStr),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A `True`/`False` literal.
    Bool(bool),
    /// A unary operator applied to an operand.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operator applied to two operands.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// A call `callee(args..., kw=val...)`.
    Call {
        /// The callee name (`integ`, `constant`, `delay`, `end`, or a
        /// user-defined procedural helper).
        callee: SmolStr,
        /// Positional arguments.
        args: Vec<Expr>,
        /// Keyword arguments, in source order.
        keywords: Vec<(SmolStr, Expr)>,
    },
    /// A subscript `value[slice]`.
    Subscript(Box<Expr>, Box<Expr>),
}
