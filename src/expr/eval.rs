//! Expression evaluation.
//!
//! An AST walk over a variable scope, plus the builtin function table.
//! Division by zero and friends produce ordinary non-finite numbers;
//! only structural problems (unknown names, wrong arity) are errors.

use crate::expr::ast::{BinOp, Expr, UnaryOp, constant_value};
use crate::expr::compile::{CompiledExpression, Compiler, ExprError};
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;

/// Variable assignment an expression is evaluated against.
pub type Scope = BTreeMap<String, f64>;

// =============================================================================
// Errors
// =============================================================================

/// Structural evaluation failures.
///
/// These are what the render layer records as per-function error text;
/// non-finite results are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{name} expects exactly {expected} argument(s), found {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates an expression against a scope.
///
/// Recognized constants resolve before scope entries, so `pi` is always
/// the circle constant even if a scope key shadows it.
pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Symbol(name) => {
            if let Some(value) = constant_value(name) {
                return Ok(value);
            }
            scope
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::UnknownSymbol(name.clone()))
        }
        Expr::Unary(UnaryOp::Neg, inner) => Ok(-evaluate(inner, scope)?),
        Expr::Binary(op, left, right) => {
            let l = evaluate(left, scope)?;
            let r = evaluate(right, scope)?;
            Ok(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Pow => l.powf(r),
            })
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, scope)?);
            }
            apply_builtin(name, &values)
        }
    }
}

// =============================================================================
// Builtins
// =============================================================================

/// Applies a builtin function by name.
pub fn apply_builtin(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    match name {
        "sin" => Ok(expect_1_arg(name, args)?.sin()),
        "cos" => Ok(expect_1_arg(name, args)?.cos()),
        "tan" => Ok(expect_1_arg(name, args)?.tan()),
        "asin" => Ok(expect_1_arg(name, args)?.asin()),
        "acos" => Ok(expect_1_arg(name, args)?.acos()),
        "atan" => Ok(expect_1_arg(name, args)?.atan()),
        "sinh" => Ok(expect_1_arg(name, args)?.sinh()),
        "cosh" => Ok(expect_1_arg(name, args)?.cosh()),
        "tanh" => Ok(expect_1_arg(name, args)?.tanh()),
        "sqrt" => Ok(expect_1_arg(name, args)?.sqrt()),
        "cbrt" => Ok(expect_1_arg(name, args)?.cbrt()),
        "abs" => Ok(expect_1_arg(name, args)?.abs()),
        "ln" => Ok(expect_1_arg(name, args)?.ln()),
        // Calculator convention: bare `log` is base 10.
        "log" | "log10" => Ok(expect_1_arg(name, args)?.log10()),
        "log2" => Ok(expect_1_arg(name, args)?.log2()),
        "exp" => Ok(expect_1_arg(name, args)?.exp()),
        "floor" => Ok(expect_1_arg(name, args)?.floor()),
        "ceil" => Ok(expect_1_arg(name, args)?.ceil()),
        "round" => Ok(expect_1_arg(name, args)?.round()),
        "sign" => {
            let x = expect_1_arg(name, args)?;
            // signum(±0) is ±1; the mathematical sign of zero is zero.
            Ok(if x == 0.0 { 0.0 } else { x.signum() })
        }
        "min" => {
            let (a, b) = expect_2_args(name, args)?;
            Ok(a.min(b))
        }
        "max" => {
            let (a, b) = expect_2_args(name, args)?;
            Ok(a.max(b))
        }
        "pow" => {
            let (a, b) = expect_2_args(name, args)?;
            Ok(a.powf(b))
        }
        "atan2" => {
            let (a, b) = expect_2_args(name, args)?;
            Ok(a.atan2(b))
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

/// Validates and extracts exactly one argument.
fn expect_1_arg(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    // Keep function arity checks centralized for consistent diagnostics.
    match args {
        [a] => Ok(*a),
        _ => Err(EvalError::WrongArity {
            name: name.to_string(),
            expected: 1,
            found: args.len(),
        }),
    }
}

/// Validates and extracts exactly two arguments.
fn expect_2_args(name: &str, args: &[f64]) -> Result<(f64, f64), EvalError> {
    // Keep function arity checks centralized for consistent diagnostics.
    match args {
        [a, b] => Ok((*a, *b)),
        _ => Err(EvalError::WrongArity {
            name: name.to_string(),
            expected: 2,
            found: args.len(),
        }),
    }
}

// =============================================================================
// Point evaluator
// =============================================================================

/// Where an evaluator's expression comes from.
#[derive(Debug, Clone)]
pub enum ExprSource {
    /// Raw text, compiled through the shared compiler (and its cache).
    Raw(String),
    /// An already-compiled expression, used as-is.
    Compiled(CompiledExpression),
}

impl From<&str> for ExprSource {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

impl From<String> for ExprSource {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<CompiledExpression> for ExprSource {
    fn from(compiled: CompiledExpression) -> Self {
        Self::Compiled(compiled)
    }
}

/// Evaluates one expression at arbitrary points.
///
/// The calculator-style wrapper over a compiled expression: hand it text
/// or a compiled object, then sample values. `evaluate_at` never fails -
/// every failure mode, including non-finite math, collapses to NaN.
pub struct Evaluator {
    compiler: Rc<Compiler>,
    compiled: Option<CompiledExpression>,
}

impl Evaluator {
    pub fn new(compiler: Rc<Compiler>) -> Self {
        Self {
            compiler,
            compiled: None,
        }
    }

    /// Sets the expression to evaluate.
    ///
    /// Raw text is compiled through the shared compiler; `variables`
    /// passes through to it (None = auto-detect). Errors only when the
    /// text itself is empty.
    pub fn set_expression(
        &mut self,
        source: impl Into<ExprSource>,
        variables: Option<&[String]>,
    ) -> Result<(), ExprError> {
        self.compiled = Some(match source.into() {
            ExprSource::Raw(text) => self.compiler.parse(&text, variables)?,
            ExprSource::Compiled(compiled) => compiled,
        });
        Ok(())
    }

    /// The current compiled expression, if any.
    pub fn expression(&self) -> Option<&CompiledExpression> {
        self.compiled.as_ref()
    }

    pub fn clear(&mut self) {
        self.compiled = None;
    }

    /// Evaluates at the given scope; NaN for every failure mode.
    pub fn evaluate_at(&self, scope: &Scope) -> f64 {
        let Some(compiled) = &self.compiled else {
            return f64::NAN;
        };
        match compiled.try_evaluate(scope) {
            Ok(value) if value.is_finite() => value,
            _ => f64::NAN,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
