//! `nom` parser for plot expressions.
//!
//! The grammar supports:
//! - numeric literals and identifiers
//! - unary negation
//! - binary `+ - * / ^` with conventional precedence (`^` right-associative)
//! - function calls
//! - parentheses, whitespace everywhere
//!
//! There is no implicit multiplication (`2x` is a syntax error, `2*x` is
//! not) and `=` is not an operator; assignment detection is a separate
//! statement-level check, not part of the grammar.

use crate::expr::ast::{BinOp, Expr, UnaryOp};
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::{VerboseError, VerboseErrorKind, context},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
};

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Parses a complete expression.
///
/// `all_consuming` ensures trailing garbage is treated as a syntax error.
pub fn parse_expression(source: &str) -> Result<Expr, String> {
    match all_consuming(ws(expr)).parse(source) {
        Ok((_, parsed)) => Ok(parsed),
        Err(err) => Err(parse_error_message(err)),
    }
}

/// Converts a `nom` verbose error into a user-facing message.
fn parse_error_message(err: nom::Err<VerboseError<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "Incomplete expression".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // The outermost frame carries the most readable context.
            if let Some((rest, kind)) = e.errors.last() {
                match kind {
                    VerboseErrorKind::Context(ctx) => format!("Syntax error: expected {ctx}"),
                    VerboseErrorKind::Char(c) => format!("Syntax error: expected '{c}'"),
                    VerboseErrorKind::Nom(_) if !rest.is_empty() => {
                        let tail: String = rest.chars().take(16).collect();
                        format!("Syntax error near '{tail}'")
                    }
                    VerboseErrorKind::Nom(kind) => format!("Syntax error near {kind:?}"),
                }
            } else {
                "Syntax error".to_string()
            }
        }
    }
}

/// Top-level expression parser.
fn expr(input: &str) -> PResult<'_, Expr> {
    parse_add_sub(input)
}

/// Parses left-associative `+`/`-`.
fn parse_add_sub(input: &str) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_mul_div(input)?;
    loop {
        let (next, op) = opt(alt((ws_char('+'), ws_char('-')))).parse(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = parse_mul_div(next)?;
        let op = if op_char == '+' {
            BinOp::Add
        } else {
            BinOp::Sub
        };
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `*`/`/`.
fn parse_mul_div(input: &str) -> PResult<'_, Expr> {
    let (mut input, mut left) = parse_unary(input)?;
    loop {
        let (next, op) = opt(alt((ws_char('*'), ws_char('/')))).parse(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a/b/c` becomes `(a/b)/c`.
        let (next, right) = parse_unary(next)?;
        let op = if op_char == '*' {
            BinOp::Mul
        } else {
            BinOp::Div
        };
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = next;
    }
    Ok((input, left))
}

/// Parses unary operators.
fn parse_unary(input: &str) -> PResult<'_, Expr> {
    // Unary minus is parsed recursively to support chains like `---x`,
    // and binds looser than `^` so `-x^2` means `-(x^2)`.
    if let Ok((input, _)) = ws_char('-').parse(input) {
        let (input, inner) = parse_unary(input)?;
        return Ok((input, Expr::Unary(UnaryOp::Neg, Box::new(inner))));
    }
    parse_power(input)
}

/// Parses right-associative `^`.
fn parse_power(input: &str) -> PResult<'_, Expr> {
    let (input, base) = parse_primary(input)?;
    // The exponent re-enters at unary level: `2^3^2` is `2^(3^2)`,
    // `2^-3` is legal.
    let (input, exponent) = opt(preceded(ws_char('^'), parse_unary)).parse(input)?;
    match exponent {
        Some(exponent) => Ok((
            input,
            Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)),
        )),
        None => Ok((input, base)),
    }
}

/// Parses expression atoms.
fn parse_primary(input: &str) -> PResult<'_, Expr> {
    alt((parse_parenthesized, parse_number, parse_ident_or_call)).parse(input)
}

/// Parses parenthesized expressions.
fn parse_parenthesized(input: &str) -> PResult<'_, Expr> {
    delimited(ws_char('('), expr, context("')'", ws_char(')'))).parse(input)
}

/// Parses numeric literal expressions.
fn parse_number(input: &str) -> PResult<'_, Expr> {
    map(
        ws(map_res(recognize_float, |s: &str| s.parse::<f64>())),
        Expr::Number,
    )
    .parse(input)
}

/// Parses either identifier or function call expression.
fn parse_ident_or_call(input: &str) -> PResult<'_, Expr> {
    let (input, name) = ws(identifier).parse(input)?;
    let (input, args) = opt(delimited(
        ws_char('('),
        separated_list0(ws_char(','), expr),
        context("')'", ws_char(')')),
    ))
    .parse(input)?;

    // A name followed by `(...)` is parsed as call, otherwise symbol.
    let parsed = if let Some(args) = args {
        Expr::Call(name, args)
    } else {
        Expr::Symbol(name)
    };

    Ok((input, parsed))
}

/// Parses identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
fn identifier(input: &str) -> PResult<'_, String> {
    map(
        recognize(pair(
            take_while1(is_ident_start),
            take_while(is_ident_continue),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

/// Returns whether a char can start an identifier.
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns whether a char can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Skips zero-or-more whitespace.
fn ws0(input: &str) -> PResult<'_, ()> {
    value((), multispace0).parse(input)
}

/// Wraps a parser with leading/trailing whitespace skipping.
fn ws<'a, O, P>(mut parser: P) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    P: FnMut(&'a str) -> PResult<'a, O>,
{
    move |input| delimited(ws0, &mut parser, ws0)(input)
}

/// Parses a specific character token with surrounding whitespace.
fn ws_char<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    ws(char(c))
}

// =============================================================================
// Tests
// =============================================================================
