//! Parser for equations and constraint predicates using chumsky.
//!
//! Accepted syntax
//! - Numbers: `3`, `0.25`, `.5`, `6.02e23`, `1E-3`.
//! - Symbols: ASCII identifiers with digits and underscores (`E`, `nu`, `C_11`); `pi` is the constant.
//! - Arithmetic: `+ - * /`, power `^` (alias `**`, right associative), unary `-` and `+`.
//! - Calls: `sqrt exp ln log log10 sin cos tan asin acos atan abs`, one argument each.
//! - Predicates: `< <= > >= == !=`, negation `!`, conjunction `&&`, disjunction `||`.
//! - Equations: `lhs = rhs`; a bare expression `e` stands for `e = 0`.
//!
//! Precedence, loosest first: `||` < `&&` < `!` < comparisons < `+ -` < `* /` < unary `-` < `^` < atoms.
use std::str::FromStr;

use chumsky::prelude::*;

use crate::{
    error::ExprError,
    expr::{BinaryOp, CompareOp, Equation, Expr, Function, LogicOp},
};

type ParserExtra<'src> = extra::Err<Rich<'src, char>>;

fn identifier<'src>() -> impl Parser<'src, &'src str, &'src str, ParserExtra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .labelled("identifier")
}

fn number<'src>() -> impl Parser<'src, &'src str, f64, ParserExtra<'src>> + Clone {
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(text::digits(10));

    let mantissa = text::digits(10)
        .then(just('.').then(text::digits(10).or_not()).or_not())
        .ignored()
        .or(just('.').then(text::digits(10)).ignored());

    mantissa
        .then(exponent.or_not())
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<f64>()
                .map_err(|e| Rich::custom(span, format!("invalid number `{s}`: {e}")))
        })
        .labelled("number")
}

fn expr_parser<'src>() -> impl Parser<'src, &'src str, Expr, ParserExtra<'src>> + Clone {
    recursive(|expr| {
        // Function calls; unknown names are reported but parsing continues.
        let call = identifier()
            .then(
                expr.clone()
                    .separated_by(just(',').padded())
                    .collect::<Vec<_>>()
                    .delimited_by(just('(').padded(), just(')').padded()),
            )
            .validate(|(name, args): (&str, Vec<Expr>), e, emitter| {
                match Function::from_str(name) {
                    Ok(func) if args.len() == 1 => Expr::Call(func, args),
                    Ok(func) => {
                        emitter.emit(Rich::custom(
                            e.span(),
                            format!(
                                "function `{func}` expects 1 argument, found {}",
                                args.len()
                            ),
                        ));
                        Expr::Call(func, args)
                    }
                    Err(_) => {
                        emitter.emit(Rich::custom(
                            e.span(),
                            format!("unknown function `{name}`"),
                        ));
                        Expr::Number(f64::NAN)
                    }
                }
            })
            .labelled("call");

        let symbol = identifier().map(|name: &str| match name {
            "pi" => Expr::Pi,
            _ => Expr::symbol(name),
        });

        let atom = number()
            .map(Expr::Number)
            .or(call)
            .or(symbol)
            .or(expr.clone().delimited_by(just('('), just(')')))
            .padded()
            .labelled("atom");

        let pow_op = just("**").or(just("^")).padded();

        // Unary minus binds looser than `^`, so `-x^2` is `-(x^2)` while `2^-1` is allowed.
        let unary = recursive(|unary| {
            let power = atom
                .then(pow_op.ignore_then(unary.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => Expr::binary(BinaryOp::Pow, base, exponent),
                    None => base,
                });

            just('-')
                .padded()
                .ignore_then(unary.clone())
                .map(|inner| Expr::Neg(Box::new(inner)))
                .or(just('+').padded().ignore_then(unary))
                .or(power)
        });

        let product = unary.clone().foldl(
            choice((
                just('*').to(BinaryOp::Mul),
                just('/').to(BinaryOp::Div),
            ))
            .padded()
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let sum = product.clone().foldl(
            choice((
                just('+').to(BinaryOp::Add),
                just('-').to(BinaryOp::Sub),
            ))
            .padded()
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let compare_op = choice((
            just("<=").to(CompareOp::Le),
            just(">=").to(CompareOp::Ge),
            just("==").to(CompareOp::Eq),
            just("!=").to(CompareOp::Ne),
            just("<").to(CompareOp::Lt),
            just(">").to(CompareOp::Gt),
        ))
        .padded();

        let comparison = sum
            .clone()
            .then(compare_op.then(sum).or_not())
            .map(|(lhs, rhs)| match rhs {
                Some((op, rhs)) => Expr::Compare(op, Box::new(lhs), Box::new(rhs)),
                None => lhs,
            })
            .labelled("comparison");

        let negation = just('!')
            .padded()
            .repeated()
            .foldr(comparison, |_, inner| Expr::Not(Box::new(inner)));

        let conjunction = negation.clone().foldl(
            just("&&").padded().ignore_then(negation).repeated(),
            |lhs, rhs| Expr::Logic(LogicOp::And, Box::new(lhs), Box::new(rhs)),
        );

        conjunction.clone().foldl(
            just("||").padded().ignore_then(conjunction).repeated(),
            |lhs, rhs| Expr::Logic(LogicOp::Or, Box::new(lhs), Box::new(rhs)),
        )
    })
}

fn into_expr_error(errors: Vec<Rich<'_, char>>) -> ExprError {
    ExprError::Parse(
        errors
            .into_iter()
            .map(|e| format!("parse error: {e}"))
            .collect(),
    )
}

/// Parse a numeric or boolean expression.
///
/// Example
/// ```
/// use std::collections::BTreeMap;
/// use pnexpr::parser::parse_expr;
///
/// let e = parse_expr("9 * K * G / (3 * K + G)").unwrap();
/// let values = BTreeMap::from([("K".to_string(), 160.0), ("G".to_string(), 80.0)]);
/// assert!((e.eval(&values).unwrap() - 205.7142857142857).abs() < 1e-9);
/// ```
pub fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    expr_parser()
        .padded()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(into_expr_error)
}

/// Parse an equation `lhs = rhs` (or a bare expression meaning `expr = 0`).
///
/// Both sides must be numeric; predicates are rejected.
pub fn parse_equation(src: &str) -> Result<Equation, ExprError> {
    let (lhs, rhs) = expr_parser()
        .then(just('=').padded().ignore_then(expr_parser()).or_not())
        .padded()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(into_expr_error)?;

    let equation = Equation::new(lhs, rhs.unwrap_or(Expr::Number(0.0)));
    for side in [&equation.lhs, &equation.rhs] {
        if side.is_boolean() {
            return Err(ExprError::TypeMismatch {
                expected: "number",
                expr: side.to_string(),
            });
        }
    }

    Ok(equation)
}
