use std::fmt;

use float_cmp::approx_eq;
use nalgebra::DMatrix;
use strum::{EnumIs, EnumTryAs};

use crate::{error::UnitError, unit::Unit};

/// Magnitude of a quantity: a plain number or a matrix (tensor properties in Voigt form).
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs)]
pub enum Value {
    Scalar(f64),
    Matrix(DMatrix<f64>),
}

impl Value {
    pub fn scale(&self, factor: f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(x * factor),
            Value::Matrix(m) => Value::Matrix(m * factor),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Matrix(_) => None,
        }
    }

    /// Shape of the value: `[1]` for scalars, `[rows, cols]` for matrices.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Value::Scalar(_) => vec![1],
            Value::Matrix(m) => vec![m.nrows(), m.ncols()],
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Value::Scalar(x) => x.is_finite(),
            Value::Matrix(m) => m.iter().all(|x| x.is_finite()),
        }
    }

    /// Element-wise comparison with a relative tolerance (absolute near zero).
    pub fn relative_eq(&self, other: &Value, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| {
            let scale = a.abs().max(b.abs()).max(1.0);
            approx_eq!(f64, a, b, epsilon = tolerance * scale)
        };

        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => close(*a, *b),
            (Value::Matrix(a), Value::Matrix(b)) => {
                a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| close(*x, *y))
            }
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<DMatrix<f64>> for Value {
    fn from(value: DMatrix<f64>) -> Self {
        Value::Matrix(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{x}"),
            Value::Matrix(m) => {
                write!(f, "[")?;
                for (r, row) in m.row_iter().enumerate() {
                    if r > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[")?;
                    for (c, x) in row.iter().enumerate() {
                        if c > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{x}")?;
                    }
                    write!(f, "]")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A value tagged with its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: Value,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: impl Into<Value>, unit: Unit) -> Self {
        Self {
            value: value.into(),
            unit,
        }
    }

    pub fn magnitude(&self) -> &Value {
        &self.value
    }

    /// The same quantity expressed in `target`.
    pub fn to(&self, target: &Unit) -> Result<Quantity, UnitError> {
        Ok(Quantity::new(self.magnitude_in(target)?, target.clone()))
    }

    /// The bare magnitude of this quantity expressed in `target`.
    pub fn magnitude_in(&self, target: &Unit) -> Result<Value, UnitError> {
        convert(&self.value, &self.unit, target)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_dimensionless() && self.unit.factor == 1.0 {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit)
        }
    }
}

/// Convert a magnitude expressed in `from` into a magnitude expressed in `to`.
pub fn convert(value: &Value, from: &Unit, to: &Unit) -> Result<Value, UnitError> {
    if !from.is_compatible(to) {
        return Err(UnitError::Incompatible {
            from: from.text.clone(),
            from_dim: from.dimension,
            to: to.text.clone(),
            to_dim: to.dimension,
        });
    }

    if from == to {
        return Ok(value.clone());
    }

    Ok(value.scale(from.ratio_to(to)))
}

/// Attach `unit` to a bare magnitude.
pub fn tag(value: impl Into<Value>, unit: &Unit) -> Quantity {
    Quantity::new(value, unit.clone())
}
