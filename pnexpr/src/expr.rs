//! Expression tree for model equations and constraints.
//!
//! Role
//! - [`Expr`] is a small owned AST covering arithmetic, elementary functions, comparisons
//!   and boolean connectives. Equations are built from two expressions (see [`Equation`]).
//! - Numeric evaluation is explicit: [`Expr::eval`] produces an `f64`, [`Expr::eval_bool`]
//!   produces a `bool`. Mixing the two is a [`ExprError::TypeMismatch`].
//! - [`Expr::substitute`] replaces known symbols by numbers and folds every subtree that
//!   became constant, which is what the solver works on.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::ExprError;

/// Numeric binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div => 4,
            BinaryOp::Pow => 6,
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, ExprError> {
        let out = match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => {
                if rhs == 0.0 {
                    return Err(ExprError::Domain("division by zero".to_string()));
                }
                lhs / rhs
            }
            BinaryOp::Pow => lhs.powf(rhs),
        };

        if out.is_finite() {
            Ok(out)
        } else {
            Err(ExprError::Domain(format!(
                "`{lhs} {} {rhs}` is not a finite number",
                self.symbol()
            )))
        }
    }
}

/// Comparison operators, only valid in boolean position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

/// Elementary functions callable from expressions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Function {
    Sqrt,
    Exp,
    #[strum(serialize = "ln", serialize = "log")]
    Ln,
    Log10,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Abs,
}

impl Function {
    fn apply(self, x: f64) -> Result<f64, ExprError> {
        let out = match self {
            Function::Sqrt => x.sqrt(),
            Function::Exp => x.exp(),
            Function::Ln => x.ln(),
            Function::Log10 => x.log10(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Abs => x.abs(),
        };

        if out.is_finite() {
            Ok(out)
        } else {
            Err(ExprError::Domain(format!("{self}({x}) is not a finite number")))
        }
    }
}

/// Expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    /// The constant `pi`.
    Pi,
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Logic(LogicOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Returns the number if this expression is a literal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            Expr::Pi => Some(std::f64::consts::PI),
            _ => None,
        }
    }

    /// All symbol names referenced by this expression.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) | Expr::Pi => {}
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) | Expr::Not(inner) => inner.collect_symbols(out),
            Expr::Binary(_, lhs, rhs) | Expr::Compare(_, lhs, rhs) | Expr::Logic(_, lhs, rhs) => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.collect_symbols(out)),
        }
    }

    /// Number of times `symbol` occurs in the tree.
    pub fn occurrences(&self, symbol: &str) -> usize {
        match self {
            Expr::Number(_) | Expr::Pi => 0,
            Expr::Symbol(name) => usize::from(name == symbol),
            Expr::Neg(inner) | Expr::Not(inner) => inner.occurrences(symbol),
            Expr::Binary(_, lhs, rhs) | Expr::Compare(_, lhs, rhs) | Expr::Logic(_, lhs, rhs) => {
                lhs.occurrences(symbol) + rhs.occurrences(symbol)
            }
            Expr::Call(_, args) => args.iter().map(|arg| arg.occurrences(symbol)).sum(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.occurrences(symbol) > 0
    }

    /// True for nodes that produce a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Expr::Not(_) | Expr::Compare(..) | Expr::Logic(..))
    }

    /// Evaluate as a number. Every symbol must be bound in `values`.
    pub fn eval(&self, values: &BTreeMap<String, f64>) -> Result<f64, ExprError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Pi => Ok(std::f64::consts::PI),
            Expr::Symbol(name) => values
                .get(name)
                .copied()
                .ok_or_else(|| ExprError::UnknownSymbol(name.clone())),
            Expr::Neg(inner) => Ok(-inner.eval(values)?),
            Expr::Binary(op, lhs, rhs) => op.apply(lhs.eval(values)?, rhs.eval(values)?),
            Expr::Call(func, args) => {
                if args.len() != 1 {
                    return Err(ExprError::Arity {
                        function: func.to_string(),
                        expected: 1,
                        found: args.len(),
                    });
                }
                func.apply(args[0].eval(values)?)
            }
            Expr::Not(_) | Expr::Compare(..) | Expr::Logic(..) => Err(ExprError::TypeMismatch {
                expected: "number",
                expr: self.to_string(),
            }),
        }
    }

    /// Evaluate as a boolean predicate.
    pub fn eval_bool(&self, values: &BTreeMap<String, f64>) -> Result<bool, ExprError> {
        match self {
            Expr::Not(inner) => Ok(!inner.eval_bool(values)?),
            Expr::Compare(op, lhs, rhs) => Ok(op.apply(lhs.eval(values)?, rhs.eval(values)?)),
            Expr::Logic(LogicOp::And, lhs, rhs) => {
                Ok(lhs.eval_bool(values)? && rhs.eval_bool(values)?)
            }
            Expr::Logic(LogicOp::Or, lhs, rhs) => {
                Ok(lhs.eval_bool(values)? || rhs.eval_bool(values)?)
            }
            _ => Err(ExprError::TypeMismatch {
                expected: "boolean",
                expr: self.to_string(),
            }),
        }
    }

    /// Replace bound symbols by their value and fold constant subtrees.
    ///
    /// Subtrees whose evaluation fails (e.g. `sqrt(-1)`) are kept unfolded so that the
    /// failure surfaces when the caller evaluates the final expression.
    pub fn substitute(&self, values: &BTreeMap<String, f64>) -> Expr {
        let folded = match self {
            Expr::Number(_) | Expr::Pi => return self.clone(),
            Expr::Symbol(name) => {
                return match values.get(name) {
                    Some(value) => Expr::Number(*value),
                    None => self.clone(),
                };
            }
            Expr::Neg(inner) => Expr::Neg(Box::new(inner.substitute(values))),
            Expr::Not(inner) => Expr::Not(Box::new(inner.substitute(values))),
            Expr::Binary(op, lhs, rhs) => {
                Expr::binary(*op, lhs.substitute(values), rhs.substitute(values))
            }
            Expr::Compare(op, lhs, rhs) => Expr::Compare(
                *op,
                Box::new(lhs.substitute(values)),
                Box::new(rhs.substitute(values)),
            ),
            Expr::Logic(op, lhs, rhs) => Expr::Logic(
                *op,
                Box::new(lhs.substitute(values)),
                Box::new(rhs.substitute(values)),
            ),
            Expr::Call(func, args) => {
                Expr::Call(*func, args.iter().map(|arg| arg.substitute(values)).collect())
            }
        };

        if folded.is_boolean() || !folded.free_symbols().is_empty() {
            return folded;
        }

        match folded.eval(&BTreeMap::new()) {
            Ok(value) => Expr::Number(value),
            Err(_) => folded,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Logic(LogicOp::Or, ..) => 0,
            Expr::Logic(LogicOp::And, ..) => 1,
            Expr::Compare(..) => 2,
            Expr::Binary(op, ..) => op.precedence(),
            Expr::Neg(_) | Expr::Not(_) => 5,
            Expr::Number(n) if *n < 0.0 => 5,
            _ => 7,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: u8, strict: bool) -> fmt::Result {
        let own = self.precedence();
        if own < parent || (strict && own == parent) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Symbol(name) => write!(f, "{name}"),
            Expr::Pi => write!(f, "pi"),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.fmt_child(f, 5, false)
            }
            Expr::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_child(f, 5, true)
            }
            Expr::Binary(op, lhs, rhs) => {
                let prec = op.precedence();
                // `^` is right associative, the others associate to the left.
                let (left_strict, right_strict) = match op {
                    BinaryOp::Pow => (true, false),
                    _ => (false, true),
                };
                lhs.fmt_child(f, prec, left_strict)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_child(f, prec, right_strict)
            }
            Expr::Compare(op, lhs, rhs) => {
                lhs.fmt_child(f, 2, true)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_child(f, 2, true)
            }
            Expr::Logic(op, lhs, rhs) => {
                let (symbol, prec) = match op {
                    LogicOp::And => ("&&", 1),
                    LogicOp::Or => ("||", 0),
                };
                lhs.fmt_child(f, prec, false)?;
                write!(f, " {symbol} ")?;
                rhs.fmt_child(f, prec, true)
            }
            Expr::Call(func, args) => {
                write!(f, "{func}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An equation `lhs = rhs`. A bare expression `e` is read as `e = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }

    /// The residual `lhs - rhs`, zero whenever the equation holds.
    pub fn residual(&self) -> Expr {
        match self.rhs.as_number() {
            Some(n) if n == 0.0 => self.lhs.clone(),
            _ => Expr::binary(BinaryOp::Sub, self.lhs.clone(), self.rhs.clone()),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = self.lhs.free_symbols();
        out.extend(self.rhs.free_symbols());
        out
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}
