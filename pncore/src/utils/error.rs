use pnexpr::ExprError;
use pnunits::UnitError;
use strum::{Display, EnumIs};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to the direct caller of a catalog, configuration or graph operation.
#[derive(Debug, Error, EnumIs)]
pub enum PnError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to serialize configuration to '{file}': {source}")]
    ConfigSerializeError {
        source: toml::ser::Error,
        file: String,
    },

    /// No Material node carries the requested identity.
    #[error("Material '{0}' not found in the property graph")]
    NotFound(Uuid),

    /// More than one Material node carries the same identity. The graph is corrupted.
    #[error("Material '{material}' matches {count} nodes in the property graph")]
    AmbiguousIdentity { material: Uuid, count: usize },

    #[error("Property type '{0}' is not part of the catalog")]
    UnknownPropertyType(String),

    /// A value does not fit its property type (shape or unit dimension).
    #[error("Invalid value for property type '{property}': {reason}")]
    InvalidValue { property: String, reason: String },

    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),
}

pub type PnResult<T> = Result<T, PnError>;

/// Kind of catalog entry a descriptor defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum EntryKind {
    #[strum(serialize = "property type")]
    PropertyType,
    #[strum(serialize = "model")]
    Model,
}

/// A catalog entry that was skipped during loading. Never fatal: the entry is logged and
/// the remaining descriptors still load.
#[derive(Debug, Clone, PartialEq, Error, EnumIs)]
pub enum CatalogLoadError {
    #[error("Failed to read descriptor '{file}': {message}")]
    Io { file: String, message: String },

    #[error("Failed to parse descriptor '{file}': {message}")]
    Parse { file: String, message: String },

    /// The `name` inside a property type descriptor differs from its file stem.
    #[error("Descriptor '{file}' declares name '{name}' but its file stem is '{stem}'")]
    NameMismatch {
        file: String,
        name: String,
        stem: String,
    },

    /// A second, different definition for a name already in the catalog. The first one wins.
    #[error("Duplicate {kind} '{name}' in '{file}'; keeping the first definition")]
    Duplicate {
        kind: EntryKind,
        name: String,
        file: String,
    },

    #[error("Property type '{property}' has an invalid unit: {source}")]
    InvalidUnit { property: String, source: UnitError },

    #[error("Invalid property type '{property}': {reason}")]
    InvalidPropertyType { property: String, reason: String },

    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Model '{model}' has an invalid equation or constraint `{text}`: {source}")]
    InvalidEquation {
        model: String,
        text: String,
        source: ExprError,
    },

    #[error("Model '{model}' maps symbol '{symbol}' to unknown property type '{property}'")]
    UnknownPropertyType {
        model: String,
        symbol: String,
        property: String,
    },

    #[error("Model '{model}' references unknown custom rule '{key}'")]
    UnknownCustomRule { model: String, key: String },
}

/// Outcome of a failed model evaluation. Local to one attempt; a derivation pass records
/// it and moves on.
#[derive(Debug, Clone, PartialEq, Error, EnumIs)]
pub enum EvaluationFailure {
    /// The supplied symbols do not cover the inputs of any connection of the model.
    #[error("The {model} model cannot generate any outputs for these inputs: {}", .symbols.join(", "))]
    UnsupportedInputs { model: String, symbols: Vec<String> },

    /// Unit conversion, solving or a custom rule failed.
    #[error("Evaluation of model '{model}' failed: {message}")]
    Evaluation { model: String, message: String },
}
