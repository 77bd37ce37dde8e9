use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, EnumIs, Error)]
pub enum ExprError {
    /// The source text could not be parsed. Holds one diagnostic per problem found.
    #[error("Failed to parse expression: {}", .0.join("; "))]
    Parse(Vec<String>),

    /// A symbol was evaluated without being bound to a value.
    #[error("Symbol `{0}` has no value.")]
    UnknownSymbol(String),

    /// A call names a function the language does not provide.
    #[error("Unknown function `{0}`.")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("Function `{function}` expects {expected} argument(s), found {found}.")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    /// A numeric expression was used where a boolean is required, or the reverse.
    #[error("Expected a {expected} expression, found `{expr}`.")]
    TypeMismatch { expected: &'static str, expr: String },

    /// Evaluation left the real domain (division by zero, log of a negative number, ...).
    #[error("Domain error: {0}")]
    Domain(String),
}
