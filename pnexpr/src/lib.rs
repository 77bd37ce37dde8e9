//! Small symbolic/numeric expression language used by derivation models.
//!
//! - [`parser`] turns equation and predicate text into [`expr::Expr`] trees.
//! - [`expr`] evaluates, substitutes and prints those trees.
//! - [`solve`] determines unknown symbols from a set of equations.
pub mod error;
pub mod expr;
pub mod parser;
pub mod solve;

pub use error::ExprError;
pub use expr::{Equation, Expr};
pub use parser::{parse_equation, parse_expr};
pub use solve::{SolverSettings, solve_system};
