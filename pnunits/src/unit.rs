use std::fmt;

use float_cmp::approx_eq;

use crate::dimension::Dimension;

/// A multiplicative unit: `factor` SI base units of `dimension`.
///
/// `text` keeps the spelling the unit was parsed from and is only used for display.
/// Two units are equal when they describe the same dimension with the same factor,
/// whatever their spelling (`GPa == 1e9 Pa`).
#[derive(Debug, Clone)]
pub struct Unit {
    pub factor: f64,
    pub dimension: Dimension,
    pub text: String,
}

impl Unit {
    pub fn new(factor: f64, dimension: Dimension, text: impl Into<String>) -> Self {
        Self {
            factor,
            dimension,
            text: text.into(),
        }
    }

    pub fn dimensionless() -> Self {
        Self::new(1.0, Dimension::DIMENSIONLESS, "dimensionless")
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Multiplier taking a magnitude in `self` to a magnitude in `target`.
    pub(crate) fn ratio_to(&self, target: &Unit) -> f64 {
        self.factor / target.factor
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension && approx_eq!(f64, self.factor, other.factor, ulps = 8)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
