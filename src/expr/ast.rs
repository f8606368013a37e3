//! Expression AST.
//!
//! The tree the parser produces and everything downstream consumes:
//! variable detection walks it, the evaluator interprets it, `Display`
//! renders it back to canonical text.

use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Names always interpreted as mathematical constants, never free symbols.
pub const CONSTANTS: [&str; 3] = ["pi", "e", "tau"];

/// Numeric value of a recognized constant name.
pub fn constant_value(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        _ => None,
    }
}

// =============================================================================
// Operators
// =============================================================================

/// Binary operators. `^` is right-associative, everything else left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    /// Operator token as written in source.
    pub const fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Pow => '^',
        }
    }
}

/// Unary operators. Only negation today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

// =============================================================================
// Expression tree
// =============================================================================

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Free symbols in first-appearance order, constants excluded.
    ///
    /// "First appearance" is source order under a left-to-right walk, so
    /// `y + x*y` yields `["y", "x"]`.
    pub fn free_symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                if constant_value(name).is_none() && !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Unary(_, inner) => inner.collect_symbols(out),
            Expr::Binary(_, left, right) => {
                left.collect_symbols(out);
                right.collect_symbols(out);
            }
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
        }
    }

    /// Binding strength used by `Display` to decide parenthesization.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(BinOp::Add | BinOp::Sub, ..) => 1,
            Expr::Binary(BinOp::Mul | BinOp::Div, ..) => 2,
            Expr::Unary(..) => 3,
            Expr::Binary(BinOp::Pow, ..) => 4,
            Expr::Number(_) | Expr::Symbol(_) | Expr::Call(..) => 5,
        }
    }
}

impl fmt::Display for Expr {
    /// Canonical text: minimal parentheses that reparse to the same tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn paren(f: &mut fmt::Formatter<'_>, e: &Expr, needed: bool) -> fmt::Result {
            if needed {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        }

        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Symbol(name) => write!(f, "{name}"),
            Expr::Unary(UnaryOp::Neg, inner) => {
                write!(f, "-")?;
                paren(f, inner, inner.precedence() < self.precedence())
            }
            Expr::Binary(op, left, right) => {
                let prec = self.precedence();
                // `^` groups rightward, the rest leftward.
                let (left_needs, right_needs) = if *op == BinOp::Pow {
                    (left.precedence() <= prec, right.precedence() < prec)
                } else {
                    (left.precedence() < prec, right.precedence() <= prec)
                };
                paren(f, left, left_needs)?;
                write!(f, "{}", op.symbol())?;
                paren(f, right, right_needs)
            }
            Expr::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
