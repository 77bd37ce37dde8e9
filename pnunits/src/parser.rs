//! Unit expression syntax.
//!
//! - Names: letters and underscores (`m`, `GPa`, `electron_volt`, `µm`, `Å`), or `%`.
//! - Products: `*` or juxtaposition (`N m`); quotients: `/`, left associative.
//! - Powers: `^` or `**` followed by a signed integer (`s^-2`, `cm ** 3`).
//! - Parentheses, a numeric scale anywhere a name can appear (`1e9 Pa`) and `[]` for "no dimension".
use chumsky::prelude::*;

type ParserExtra<'src> = extra::Err<Rich<'src, char>>;

/// Parsed unit expression, resolved against a registry afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitExpr {
    Scale(f64),
    Name(String),
    Dimensionless,
    Mul(Box<UnitExpr>, Box<UnitExpr>),
    Div(Box<UnitExpr>, Box<UnitExpr>),
    Pow(Box<UnitExpr>, i32),
}

fn name<'src>() -> impl Parser<'src, &'src str, String, ParserExtra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_alphabetic() || *c == '_')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(str::to_string)
        .or(just('%').to("%".to_string()))
        .labelled("unit name")
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

fn integer<'src>() -> impl Parser<'src, &'src str, i32, ParserExtra<'src>> + Clone {
    one_of("+-")
        .or_not()
        .then(text::digits(10))
        .to_slice()
        .then_ignore(just('.').not())
        .try_map(|s: &str, span| {
            s.parse::<i32>()
                .map_err(|e| Rich::custom(span, format!("invalid exponent `{s}`: {e}")))
        })
        .labelled("integer exponent")
}

fn unit_parser<'src>() -> impl Parser<'src, &'src str, UnitExpr, ParserExtra<'src>> + Clone {
    recursive(|expr| {
        let atom = number()
            .map(UnitExpr::Scale)
            .or(name().map(UnitExpr::Name))
            .or(just('[').padded().then(just(']')).to(UnitExpr::Dimensionless))
            .or(expr.delimited_by(just('('), just(')')))
            .padded();

        let pow_op = just("**").or(just("^")).padded();
        let power = atom
            .then(pow_op.ignore_then(integer().padded()).or_not())
            .map(|(base, exp)| match exp {
                Some(exp) => UnitExpr::Pow(Box::new(base), exp),
                None => base,
            });

        #[derive(Clone, Copy)]
        enum Op {
            Mul,
            Div,
        }

        let op = choice((just('*').to(Op::Mul), just('/').to(Op::Div))).padded();

        power.clone().foldl(
            op.or_not().then(power).repeated(),
            |lhs, (op, rhs)| match op {
                Some(Op::Div) => UnitExpr::Div(Box::new(lhs), Box::new(rhs)),
                Some(Op::Mul) | None => UnitExpr::Mul(Box::new(lhs), Box::new(rhs)),
            },
        )
    })
}

/// Parse a unit expression. Empty text is the dimensionless unit.
pub fn parse_unit_expr(src: &str) -> Result<UnitExpr, Vec<String>> {
    if src.trim().is_empty() {
        return Ok(UnitExpr::Dimensionless);
    }

    unit_parser()
        .padded()
        .then_ignore(end())
        .parse(src)
        .into_result()
        .map_err(|errors| {
            errors
                .into_iter()
                .map(|e| format!("parse error: {e}"))
                .collect()
        })
}
