use strum::EnumIs;
use thiserror::Error;

use crate::dimension::Dimension;

#[derive(Debug, Clone, PartialEq, EnumIs, Error)]
pub enum UnitError {
    /// The unit expression is not syntactically valid.
    #[error("Failed to parse unit `{text}`: {}", .messages.join("; "))]
    Parse { text: String, messages: Vec<String> },

    /// A name in the unit expression is neither a registered unit nor a prefixed one.
    #[error("Unknown unit `{0}`.")]
    UnknownUnit(String),

    /// Conversion between units of different dimensions.
    #[error("Cannot convert from `{from}` ({from_dim}) to `{to}` ({to_dim}).")]
    Incompatible {
        from: String,
        from_dim: Dimension,
        to: String,
        to_dim: Dimension,
    },

    /// A power or product pushes a base dimension exponent outside `-128..=127`.
    #[error("Unit `{text}` has a dimension exponent out of range.")]
    ExponentOverflow { text: String },

    /// A user supplied definition is invalid (bad name, already defined, ...).
    #[error("Invalid definition of unit `{name}`: {reason}")]
    InvalidDefinition { name: String, reason: String },
}
