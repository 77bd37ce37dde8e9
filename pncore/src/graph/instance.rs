use std::fmt;

use pnunits::Quantity;
use uuid::Uuid;

/// A concrete value of a property type, optionally owned by a material.
///
/// Instances are never edited: a newer value is a new instance with a new id.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInstance {
    pub id: Uuid,
    /// Canonical name of the property type.
    pub property: String,
    pub value: Quantity,
    /// Owning material, absent for values not tied to a single material.
    pub material: Option<Uuid>,
}

impl PropertyInstance {
    pub fn new(property: impl Into<String>, value: Quantity) -> Self {
        Self {
            id: Uuid::new_v4(),
            property: property.into(),
            value,
            material: None,
        }
    }

    pub fn owned_by(mut self, material: Uuid) -> Self {
        self.material = Some(material);
        self
    }
}

impl fmt::Display for PropertyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.property, self.value)
    }
}
