use nalgebra::DMatrix;
use pnunits::{Unit, UnitRegistry, Value};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs};

use crate::utils::error::CatalogLoadError;

/// Whether a property type describes the material itself or the environment it is measured in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIs, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    #[default]
    Property,
    Condition,
}

/// Literal value as written in a descriptor: a number or a rectangular table of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRepr {
    Scalar(f64),
    Matrix(Vec<Vec<f64>>),
}

impl ValueRepr {
    pub fn to_value(&self) -> Result<Value, String> {
        match self {
            ValueRepr::Scalar(x) => Ok(Value::Scalar(*x)),
            ValueRepr::Matrix(rows) => {
                let nrows = rows.len();
                let ncols = rows.first().map_or(0, Vec::len);
                if nrows == 0 || ncols == 0 {
                    return Err("matrix literal is empty".to_string());
                }
                if rows.iter().any(|row| row.len() != ncols) {
                    return Err("matrix literal rows have different lengths".to_string());
                }
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                Ok(Value::Matrix(DMatrix::from_row_slice(nrows, ncols, &flat)))
            }
        }
    }
}

fn scalar_shape() -> Vec<usize> {
    vec![1]
}

/// On-disk form of a property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyTypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub display_names: Vec<String>,
    #[serde(default)]
    pub display_symbols: Vec<String>,
    #[serde(default = "scalar_shape")]
    pub dimension: Vec<usize>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub test_value: Option<ValueRepr>,
}

/// A canonical kind of physical quantity, e.g. the Young's modulus in GPa.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyType {
    pub name: String,
    pub unit: Unit,
    pub display_names: Vec<String>,
    pub display_symbols: Vec<String>,
    /// `[1]` for scalars, `[rows, cols]` for tensors.
    pub shape: Vec<usize>,
    pub comment: String,
    pub category: Category,
    pub test_value: Option<Value>,
}

impl PropertyType {
    pub fn from_descriptor(
        desc: PropertyTypeDescriptor,
        units: &UnitRegistry,
    ) -> Result<Self, CatalogLoadError> {
        let invalid = |reason: String| CatalogLoadError::InvalidPropertyType {
            property: desc.name.clone(),
            reason,
        };

        if desc.name.is_empty() {
            return Err(invalid("name is empty".to_string()));
        }

        let unit = units
            .parse(&desc.units)
            .map_err(|source| CatalogLoadError::InvalidUnit {
                property: desc.name.clone(),
                source,
            })?;

        let shape_ok = match desc.dimension.as_slice() {
            [1] => true,
            [rows, cols] => *rows > 0 && *cols > 0,
            _ => false,
        };
        if !shape_ok {
            return Err(invalid(format!(
                "unsupported dimension {:?}, expected [1] or [rows, cols]",
                desc.dimension
            )));
        }

        let test_value = desc
            .test_value
            .as_ref()
            .map(ValueRepr::to_value)
            .transpose()
            .map_err(invalid)?;

        let property = Self {
            name: desc.name.clone(),
            unit,
            display_names: desc.display_names,
            display_symbols: desc.display_symbols,
            shape: desc.dimension,
            comment: desc.comment,
            category: desc.category,
            test_value,
        };

        if let Some(value) = &property.test_value
            && !property.accepts(value)
        {
            return Err(CatalogLoadError::InvalidPropertyType {
                property: property.name,
                reason: format!("test value of shape {:?} does not fit", value.shape()),
            });
        }

        Ok(property)
    }

    /// Human readable name, falling back to the canonical one.
    pub fn display_name(&self) -> &str {
        self.display_names
            .first()
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape == [1]
    }

    /// True when `value` has the shape declared by this property type.
    pub fn accepts(&self, value: &Value) -> bool {
        value.shape() == self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(src: &str) -> PropertyTypeDescriptor {
        toml::from_str(src).expect("descriptor parses")
    }

    #[test]
    fn tensor_property_accepts_matching_matrices() {
        let units = UnitRegistry::default();
        let p = PropertyType::from_descriptor(
            descriptor(
                r#"
                name = "stiffness"
                units = "GPa"
                dimension = [6, 6]
                "#,
            ),
            &units,
        )
        .unwrap();

        assert!(!p.is_scalar());
        assert!(p.accepts(&Value::Matrix(DMatrix::zeros(6, 6))));
        assert!(!p.accepts(&Value::Matrix(DMatrix::zeros(3, 3))));
        assert!(!p.accepts(&Value::Scalar(1.0)));
        assert_eq!(p.display_name(), "stiffness");
    }

    #[test]
    fn bad_units_and_shapes_are_rejected() {
        let units = UnitRegistry::default();
        let err = PropertyType::from_descriptor(
            descriptor("name = \"x\"\nunits = \"furlong\""),
            &units,
        )
        .unwrap_err();
        assert!(err.is_invalid_unit());

        let err = PropertyType::from_descriptor(
            descriptor("name = \"x\"\ndimension = [2, 3, 4]"),
            &units,
        )
        .unwrap_err();
        assert!(err.is_invalid_property_type());

        let err = PropertyType::from_descriptor(
            descriptor("name = \"x\"\ndimension = [2, 2]\ntest_value = 3.0"),
            &units,
        )
        .unwrap_err();
        assert!(err.is_invalid_property_type());
    }

    #[test]
    fn category_defaults_to_property() {
        let d = descriptor("name = \"temperature\"\nunits = \"K\"\ncategory = \"condition\"");
        assert!(d.category.is_condition());
        assert!(descriptor("name = \"x\"").category.is_property());
    }
}
