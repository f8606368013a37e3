//! Expression compiler.
//!
//! The validation and classification surface the rest of the pipeline
//! talks to: variable detection, single-variable and assignment checks,
//! and `Compiler::parse` which turns text into `CompiledExpression`
//! objects through a bounded cache.
//!
//! Failure policy (deliberate): once a variable set can be established,
//! nothing here errors - bad syntax comes back as an *invalid* compiled
//! object with the message attached, so callers store and display it
//! instead of unwinding. Only empty input is a hard error.

use crate::expr::ast::{Expr, constant_value};
use crate::expr::cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ExpressionCache};
use crate::expr::eval::{self, EvalError, Scope};
use crate::expr::parser::parse_expression;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

/// The primary plotting variable. Every plottable expression uses it.
pub const PRIMARY_VAR: &str = "x";
/// The secondary plotting variable.
pub const SECONDARY_VAR: &str = "y";
/// Both reserved plotting variables.
pub const RESERVED_VARS: [&str; 2] = [PRIMARY_VAR, SECONDARY_VAR];

// =============================================================================
// Errors
// =============================================================================

/// Failures from the fallible parse surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("Expression is empty")]
    Empty,
    #[error("{0}")]
    Parse(String),
    #[error("Expression must use the variable '{0}'")]
    MissingVariable(String),
}

// =============================================================================
// Compiled expression
// =============================================================================

/// A compiled expression, valid or not.
///
/// Invalid ones carry their error message and evaluate to NaN; callers
/// branch on `is_valid` instead of handling a Result at every use site.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    /// The source text (trimmed).
    pub text: String,
    /// Variables the expression was compiled against.
    pub declared_variables: Vec<String>,
    /// Every free symbol actually present, first-appearance order.
    pub used_variables: Vec<String>,
    pub is_valid: bool,
    /// Parse/detection failure message when `is_valid` is false.
    pub error: Option<String>,
    pub ast: Option<Rc<Expr>>,
}

impl CompiledExpression {
    /// Builds the invalid variant: NaN evaluator, message attached.
    pub(crate) fn invalid(text: &str, message: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            declared_variables: Vec::new(),
            used_variables: Vec::new(),
            is_valid: false,
            error: Some(message.into()),
            ast: None,
        }
    }

    /// Evaluates against a scope; evaluation failures collapse to NaN.
    ///
    /// Non-finite numeric results pass through unchanged - the caller
    /// decides what an infinity means.
    pub fn evaluate(&self, scope: &Scope) -> f64 {
        self.try_evaluate(scope).unwrap_or(f64::NAN)
    }

    /// Evaluates against a scope, surfacing structural failures.
    ///
    /// An invalid expression yields Ok(NaN): its problem was already
    /// reported at compile time and is not an evaluation error.
    pub fn try_evaluate(&self, scope: &Scope) -> Result<f64, EvalError> {
        match &self.ast {
            Some(ast) => eval::evaluate(ast, scope),
            None => Ok(f64::NAN),
        }
    }
}

// =============================================================================
// Variable detection
// =============================================================================

/// Detects the plotting variables an expression declares.
///
/// Returns `[x]` or `[x, y]` in canonical order regardless of appearance
/// order in the source. Fails when the primary variable is absent or the
/// text does not parse.
pub fn detect_variables(text: &str) -> Result<Vec<String>, ExprError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExprError::Empty);
    }
    let parsed = parse_expression(trimmed).map_err(ExprError::Parse)?;
    let free = parsed.free_symbols();
    if !free.iter().any(|s| s == PRIMARY_VAR) {
        return Err(ExprError::MissingVariable(PRIMARY_VAR.to_string()));
    }
    let mut variables = vec![PRIMARY_VAR.to_string()];
    if free.iter().any(|s| s == SECONDARY_VAR) {
        variables.push(SECONDARY_VAR.to_string());
    }
    Ok(variables)
}

/// Every free symbol in the text; empty on any parse problem.
pub fn get_all_variables(text: &str) -> Vec<String> {
    parse_expression(text.trim())
        .map(|parsed| parsed.free_symbols())
        .unwrap_or_default()
}

// =============================================================================
// Classification
// =============================================================================

/// Result of the single-variable check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SingleVariable {
    pub is_variable: bool,
    /// Set exactly when `is_variable` is true.
    pub name: Option<String>,
}

/// True when the trimmed text is exactly one free symbol.
///
/// Reserved plotting variables and recognized constants do not count.
pub fn is_single_variable(text: &str) -> SingleVariable {
    let Ok(parsed) = parse_expression(text.trim()) else {
        return SingleVariable::default();
    };
    match parsed {
        Expr::Symbol(name)
            if !RESERVED_VARS.contains(&name.as_str()) && constant_value(&name).is_none() =>
        {
            SingleVariable {
                is_variable: true,
                name: Some(name),
            }
        }
        _ => SingleVariable::default(),
    }
}

/// Result of the assignment check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assignment {
    pub is_assignment: bool,
    /// Set exactly when `is_assignment` is true.
    pub name: Option<String>,
    /// Set exactly when `is_assignment` is true; always finite.
    pub value: Option<f64>,
}

/// Recognizes `name = numeric-expression` statements.
///
/// The left side must be a bare non-reserved, non-constant symbol; the
/// right side must evaluate to a finite number with no free symbols.
/// Anything else is "not an assignment", never an error.
pub fn is_assignment_expression(text: &str) -> Assignment {
    let Some((lhs, rhs)) = text.split_once('=') else {
        return Assignment::default();
    };
    // `==` and other compound forms are not assignments.
    if rhs.starts_with('=') {
        return Assignment::default();
    }

    let SingleVariable {
        is_variable: true,
        name: Some(name),
    } = is_single_variable(lhs)
    else {
        return Assignment::default();
    };

    let Ok(parsed) = parse_expression(rhs.trim()) else {
        return Assignment::default();
    };
    if !parsed.free_symbols().is_empty() {
        return Assignment::default();
    }
    match eval::evaluate(&parsed, &Scope::new()) {
        Ok(value) if value.is_finite() => Assignment {
            is_assignment: true,
            name: Some(name),
            value: Some(value),
        },
        _ => Assignment::default(),
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Turns expression text into `CompiledExpression`s through a cache.
///
/// Shared as `Rc<Compiler>` across the pipeline so every consumer sees
/// the same cache; interior mutability keeps `parse(&self)` callable
/// from anywhere the Rc reaches.
pub struct Compiler {
    cache: RefCell<ExpressionCache>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            cache: RefCell::new(ExpressionCache::with_capacity(capacity)),
        }
    }

    /// Compiles text against a declared variable set.
    ///
    /// `None` auto-detects via [`detect_variables`]; a detection failure
    /// comes back as an invalid object, not an error. `Err` is reserved
    /// for empty text. Unknown symbols outside the declared set are a
    /// non-fatal warning and land in `used_variables`.
    pub fn parse(
        &self,
        text: &str,
        variables: Option<&[String]>,
    ) -> Result<CompiledExpression, ExprError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ExprError::Empty);
        }

        let declared: Vec<String> = match variables {
            Some(vars) => vars.to_vec(),
            None => match detect_variables(trimmed) {
                Ok(vars) => vars,
                Err(err) => return Ok(CompiledExpression::invalid(trimmed, err.to_string())),
            },
        };

        let key = ExpressionCache::key(trimmed, &declared);
        if let Some(hit) = self.cache.borrow_mut().get(&key) {
            return Ok(hit);
        }

        let compiled = compile_uncached(trimmed, declared);
        self.cache.borrow_mut().insert(key, compiled.clone());
        Ok(compiled)
    }

    /// Cache statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// The cache-miss path: parse, collect symbols, warn on undeclared ones.
fn compile_uncached(text: &str, declared: Vec<String>) -> CompiledExpression {
    match parse_expression(text) {
        Ok(parsed) => {
            let used = parsed.free_symbols();
            let unknown: Vec<&String> = used.iter().filter(|s| !declared.contains(s)).collect();
            if !unknown.is_empty() {
                warn!(
                    expression = %text,
                    symbols = ?unknown,
                    "expression references symbols outside its declared variables"
                );
            }
            CompiledExpression {
                text: text.to_string(),
                declared_variables: declared,
                used_variables: used,
                is_valid: true,
                error: None,
                ast: Some(Rc::new(parsed)),
            }
        }
        Err(message) => {
            let mut compiled = CompiledExpression::invalid(text, message);
            compiled.declared_variables = declared;
            compiled
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // detect_variables
    // =========================================================================

    #[test]
    fn test_detect_variables_primary_only() {
        assert_eq!(detect_variables("x^2+1").unwrap(), vars(&["x"]));
        assert_eq!(detect_variables("sin(x)").unwrap(), vars(&["x"]));
    }

    #[test]
    fn test_detect_variables_canonical_order() {
        // y appears first in source, canonical order still [x, y]
        assert_eq!(detect_variables("y + x").unwrap(), vars(&["x", "y"]));
    }

    #[test]
    fn test_detect_variables_missing_primary() {
        assert_eq!(
            detect_variables("a+b").unwrap_err(),
            ExprError::MissingVariable("x".to_string())
        );
        // y alone does not satisfy the primary requirement
        assert!(matches!(
            detect_variables("y*2"),
            Err(ExprError::MissingVariable(_))
        ));
    }

    #[test]
    fn test_detect_variables_parse_failures() {
        assert_eq!(detect_variables("").unwrap_err(), ExprError::Empty);
        assert_eq!(detect_variables("   ").unwrap_err(), ExprError::Empty);
        assert!(matches!(
            detect_variables("2x"),
            Err(ExprError::Parse(_))
        ));
    }

    #[test]
    fn test_detect_variables_ignores_constants() {
        // pi is a constant; only x is a variable here
        assert_eq!(detect_variables("pi*x").unwrap(), vars(&["x"]));
    }

    // =========================================================================
    // get_all_variables
    // =========================================================================

    #[test]
    fn test_get_all_variables() {
        assert_eq!(get_all_variables("a*sin(b*x)"), vars(&["a", "b", "x"]));
        assert_eq!(get_all_variables("2+2"), Vec::<String>::new());
    }

    #[test]
    fn test_get_all_variables_swallows_errors() {
        assert_eq!(get_all_variables("2x"), Vec::<String>::new());
        assert_eq!(get_all_variables(""), Vec::<String>::new());
    }

    // =========================================================================
    // is_single_variable
    // =========================================================================

    #[test]
    fn test_is_single_variable() {
        let got = is_single_variable("  a ");
        assert!(got.is_variable);
        assert_eq!(got.name.as_deref(), Some("a"));

        assert!(!is_single_variable("x").is_variable);
        assert!(!is_single_variable("y").is_variable);
        assert!(!is_single_variable("pi").is_variable);
        assert!(!is_single_variable("a+b").is_variable);
        assert!(!is_single_variable("2").is_variable);
        assert!(!is_single_variable("").is_variable);
    }

    // =========================================================================
    // is_assignment_expression
    // =========================================================================

    #[test]
    fn test_assignment_basic() {
        let got = is_assignment_expression("a = 5");
        assert!(got.is_assignment);
        assert_eq!(got.name.as_deref(), Some("a"));
        assert_eq!(got.value, Some(5.0));
    }

    #[test]
    fn test_assignment_numeric_expression_rhs() {
        let got = is_assignment_expression("freq = 2*pi");
        assert!(got.is_assignment);
        assert!((got.value.unwrap() - std::f64::consts::TAU).abs() < 1e-12);

        let got = is_assignment_expression("k = sin(2)");
        assert!(got.is_assignment);
        assert!((got.value.unwrap() - 2.0_f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_assignment_rejections() {
        // Reserved variable on the left
        assert!(!is_assignment_expression("x = 5").is_assignment);
        // Constant on the left
        assert!(!is_assignment_expression("pi = 3").is_assignment);
        // Free symbol on the right
        assert!(!is_assignment_expression("a = b+1").is_assignment);
        // Non-finite right side
        assert!(!is_assignment_expression("a = 1/0").is_assignment);
        // Comparison, not assignment
        assert!(!is_assignment_expression("a == 5").is_assignment);
        // No equals sign at all
        assert!(!is_assignment_expression("sin(x)").is_assignment);
        // Unparseable sides
        assert!(!is_assignment_expression("a = ").is_assignment);
        assert!(!is_assignment_expression(" = 5").is_assignment);
    }

    // =========================================================================
    // Compiler::parse
    // =========================================================================

    #[test]
    fn test_parse_empty_is_the_only_error() {
        let compiler = Compiler::new();
        assert_eq!(compiler.parse("", None).unwrap_err(), ExprError::Empty);
        assert_eq!(compiler.parse("  ", None).unwrap_err(), ExprError::Empty);
    }

    #[test]
    fn test_parse_valid_expression() {
        let compiler = Compiler::new();
        let compiled = compiler.parse("a*sin(x)", Some(&vars(&["x"]))).unwrap();
        assert!(compiled.is_valid);
        assert_eq!(compiled.error, None);
        assert_eq!(compiled.declared_variables, vars(&["x"]));
        assert_eq!(compiled.used_variables, vars(&["a", "x"]));

        let mut scope = Scope::new();
        scope.insert("a".to_string(), 2.0);
        scope.insert("x".to_string(), std::f64::consts::FRAC_PI_2);
        assert!((compiled.evaluate(&scope) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_auto_detects_variables() {
        let compiler = Compiler::new();
        let compiled = compiler.parse("x + y", None).unwrap();
        assert!(compiled.is_valid);
        assert_eq!(compiled.declared_variables, vars(&["x", "y"]));
    }

    #[test]
    fn test_parse_detection_failure_is_data() {
        let compiler = Compiler::new();
        // No x anywhere: invalid object, not Err
        let compiled = compiler.parse("a+b", None).unwrap();
        assert!(!compiled.is_valid);
        assert!(compiled.error.as_deref().unwrap().contains("'x'"));
        assert!(compiled.evaluate(&Scope::new()).is_nan());
    }

    #[test]
    fn test_parse_syntax_failure_is_data() {
        let compiler = Compiler::new();
        let compiled = compiler.parse("2x", Some(&vars(&["x"]))).unwrap();
        assert!(!compiled.is_valid);
        assert!(compiled.error.is_some());
        assert!(compiled.ast.is_none());
        // try_evaluate on an invalid expression is Ok(NaN), not an error
        assert!(compiled.try_evaluate(&Scope::new()).unwrap().is_nan());
    }

    #[test]
    fn test_parse_uses_cache() {
        let compiler = Compiler::new();
        compiler.parse("x^2", None).unwrap();
        compiler.parse("x^2", None).unwrap();
        compiler.parse("x^3", None).unwrap();

        let stats = compiler.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 2);
    }

    #[test]
    fn test_parse_cache_distinguishes_variable_sets() {
        let compiler = Compiler::new();
        compiler.parse("x+1", Some(&vars(&["x"]))).unwrap();
        compiler.parse("x+1", Some(&vars(&["x", "y"]))).unwrap();
        assert_eq!(compiler.stats().size, 2);
        assert_eq!(compiler.stats().hits, 0);
    }

    #[test]
    fn test_clear_cache() {
        let compiler = Compiler::new();
        compiler.parse("x", None).unwrap();
        compiler.clear_cache();
        assert_eq!(compiler.stats().size, 0);
    }
}
