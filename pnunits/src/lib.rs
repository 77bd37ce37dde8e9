//! Physical units and unit-tagged quantities.
//!
//! The engine only ever needs three things from this crate: parse a unit from its
//! textual form ([`UnitRegistry::parse`]), move a magnitude between two compatible
//! units ([`convert`]) and attach a unit to a bare magnitude ([`tag`]).
//!
//! Units are multiplicative (a factor over SI base units and a [`Dimension`]);
//! offset scales such as degrees Celsius are not supported.
pub mod dimension;
pub mod error;
pub mod parser;
pub mod quantity;
pub mod registry;
pub mod unit;

pub use dimension::{BaseDimension, Dimension};
pub use error::UnitError;
pub use quantity::{Quantity, Value, convert, tag};
pub use registry::UnitRegistry;
pub use unit::Unit;
