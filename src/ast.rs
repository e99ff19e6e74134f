//! Abstract syntax tree nodes for arithmetic expressions.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }

    /// Apply the operator with the semantics of the generated machine code.
    ///
    /// add/sub/mul wrap on overflow; division truncates toward zero and
    /// returns `None` where the native instruction would trap.
    pub fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            BinOp::Add => Some(lhs.wrapping_add(rhs)),
            BinOp::Sub => Some(lhs.wrapping_sub(rhs)),
            BinOp::Mul => Some(lhs.wrapping_mul(rhs)),
            BinOp::Div => lhs.checked_div(rhs),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    // integer literals are 32-bit, matching the return type of `main`
    Literal(i32),
    // each operand is owned exclusively by its parent
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn literal(value: i32) -> Self {
        Expr::Literal(value)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    /// Evaluate the tree directly, left operand first.
    ///
    /// Returns `None` on division by zero or `i32::MIN / -1`, the cases that
    /// fault at runtime in a compiled program.
    pub fn evaluate(&self) -> Option<i32> {
        match self {
            Expr::Literal(v) => Some(*v),
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.evaluate()?;
                let r = rhs.evaluate()?;
                op.apply(l, r)
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) => 1,
            Expr::Binary { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Expr::Literal(_) => 1,
            Expr::Binary { lhs, rhs, .. } => 1 + lhs.node_count() + rhs.node_count(),
        }
    }
}

/// Fully parenthesised rendering that parses back into an equal tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
        }
    }
}
