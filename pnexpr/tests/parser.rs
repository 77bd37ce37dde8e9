use std::collections::BTreeMap;

use float_cmp::approx_eq;
use pnexpr::{
    error::ExprError,
    expr::{BinaryOp, CompareOp, Expr, Function, LogicOp},
    parser::{parse_equation, parse_expr},
};

fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn eval(src: &str, pairs: &[(&str, f64)]) -> f64 {
    parse_expr(src)
        .expect("expression parses")
        .eval(&values(pairs))
        .expect("expression evaluates")
}

#[test]
fn arithmetic_precedence_and_associativity() {
    assert!(approx_eq!(f64, eval("1 + 2 * 3", &[]), 7.0));
    assert!(approx_eq!(f64, eval("(1 + 2) * 3", &[]), 9.0));
    assert!(approx_eq!(f64, eval("8 / 4 / 2", &[]), 1.0));
    assert!(approx_eq!(f64, eval("10 - 4 - 3", &[]), 3.0));
    assert!(approx_eq!(f64, eval("2 ^ 3 ^ 2", &[]), 512.0));
    assert!(approx_eq!(f64, eval("-2 ^ 2", &[]), -4.0));
    assert!(approx_eq!(f64, eval("2 ^ -1", &[]), 0.5));
}

#[test]
fn double_star_is_power() {
    assert_eq!(
        parse_expr("x ** 2").unwrap(),
        parse_expr("x ^ 2").unwrap()
    );
}

#[test]
fn numbers_in_all_notations() {
    assert!(approx_eq!(f64, eval(".5", &[]), 0.5));
    assert!(approx_eq!(f64, eval("6.02e23", &[]), 6.02e23));
    assert!(approx_eq!(f64, eval("1E-3", &[]), 1e-3));
    assert!(approx_eq!(f64, eval("3.", &[]), 3.0));
}

#[test]
fn symbols_and_functions() {
    let e = parse_expr("sqrt(C_11) + ln(x)").unwrap();
    assert_eq!(
        e,
        Expr::binary(
            BinaryOp::Add,
            Expr::Call(Function::Sqrt, vec![Expr::symbol("C_11")]),
            Expr::Call(Function::Ln, vec![Expr::symbol("x")]),
        )
    );
    assert!(approx_eq!(
        f64,
        eval("log(exp(2))", &[]),
        2.0,
        epsilon = 1e-12
    ));
    assert!(approx_eq!(f64, eval("cos(pi)", &[]), -1.0));
}

#[test]
fn function_name_without_call_is_a_symbol() {
    assert_eq!(parse_expr("exp").unwrap(), Expr::symbol("exp"));
}

#[test]
fn unknown_function_is_rejected() {
    let err = parse_expr("frobnicate(x)").unwrap_err();
    let ExprError::Parse(messages) = err else {
        panic!("expected a parse error");
    };
    assert!(messages.iter().any(|m| m.contains("frobnicate")));
}

#[test]
fn wrong_arity_is_rejected() {
    assert!(parse_expr("sqrt(a, b)").unwrap_err().is_parse());
}

#[test]
fn predicates() {
    let e = parse_expr("K > 0 && !(G <= 0) || x == 1").unwrap();
    assert!(matches!(e, Expr::Logic(LogicOp::Or, _, _)));
    assert!(e.eval_bool(&values(&[("K", 1.0), ("G", 2.0), ("x", 0.0)])).unwrap());
    assert!(!e.eval_bool(&values(&[("K", -1.0), ("G", 2.0), ("x", 0.0)])).unwrap());

    let c = parse_expr("x >= 2").unwrap();
    assert!(matches!(c, Expr::Compare(CompareOp::Ge, _, _)));
}

#[test]
fn numeric_and_boolean_do_not_mix() {
    let e = parse_expr("x > 0").unwrap();
    assert!(e.eval(&values(&[("x", 1.0)])).unwrap_err().is_type_mismatch());

    let n = parse_expr("x + 1").unwrap();
    assert!(n.eval_bool(&values(&[("x", 1.0)])).unwrap_err().is_type_mismatch());
}

#[test]
fn display_reparses_to_same_tree() {
    for src in [
        "9 * K * G / (3 * K + G)",
        "(3 * K - 2 * G) / (2 * (3 * K + G))",
        "n ^ 4 * Eg",
        "a - (b - c)",
        "-(x + 1) ^ 2",
        "!(a > 0 && b < 1) || c != 2",
    ] {
        let parsed = parse_expr(src).unwrap();
        let printed = parsed.to_string();
        assert_eq!(parse_expr(&printed).unwrap(), parsed, "{src} -> {printed}");
    }
}

#[test]
fn equation_forms() {
    let eq = parse_equation("E = 9 * K * G / (3 * K + G)").unwrap();
    assert_eq!(eq.lhs, Expr::symbol("E"));
    assert_eq!(
        eq.free_symbols().into_iter().collect::<Vec<_>>(),
        ["E", "G", "K"]
    );

    let bare = parse_equation("n ^ 4 * Eg - 95").unwrap();
    assert_eq!(bare.rhs, Expr::Number(0.0));
    assert_eq!(bare.residual(), bare.lhs);
}

#[test]
fn equation_rejects_predicates_and_garbage() {
    assert!(parse_equation("x > 1 = y").unwrap_err().is_type_mismatch());
    assert!(parse_equation("x = = y").unwrap_err().is_parse());
    assert!(parse_equation("x = y = z").unwrap_err().is_parse());
    assert!(parse_expr("3 +").unwrap_err().is_parse());
    assert!(parse_expr("").unwrap_err().is_parse());
}
