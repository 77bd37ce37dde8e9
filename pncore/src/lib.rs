//! Property derivation engine for materials.
//!
//! A [`Catalog`] of property types and models is loaded once from TOML descriptors.
//! Materials and their measured values are added to a [`PropertyGraph`] built over that
//! catalog, and [`PropertyGraph::evaluate`] runs one bounded derivation pass producing new
//! property instances from every applicable model.
//!
//! Use [`SharedPropertyGraph`] when the graph is reached from several threads.

pub mod catalog;
pub mod config;
pub mod derivation;
pub mod evaluator;
pub mod graph;
pub mod magic;
pub mod shared;
pub mod utils;

pub use catalog::{Catalog, CatalogBuilder, CatalogLoadReport, DescriptorSource};
pub use config::EngineConfig;
pub use derivation::DerivationReport;
pub use evaluator::{EvaluationOutcome, SymbolInput};
pub use graph::{
    PropertyGraph,
    instance::PropertyInstance,
    material::Material,
    node::{Edge, Node, NodeKind},
};
pub use shared::SharedPropertyGraph;
pub use utils::error::{CatalogLoadError, EvaluationFailure, PnError, PnResult};

pub extern crate pnexpr;
pub extern crate pnunits;
