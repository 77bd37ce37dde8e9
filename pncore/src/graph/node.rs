use std::{fmt, sync::Arc};

use strum::{Display, EnumDiscriminants, EnumIs, EnumTryAs};
use uuid::Uuid;

use crate::{catalog::model::Model, graph::instance::PropertyInstance};

/// Node of a property graph.
///
/// Identity keys: material id, property type name, instance id, model name.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(NodeKind), derive(Hash, PartialOrd, Ord, Display))]
pub enum Node {
    Material(Uuid),
    PropertyType(String),
    Instance(PropertyInstance),
    Model(Arc<Model>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        NodeKind::from(self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Material(id) => write!(f, "Material({id})"),
            Node::PropertyType(name) => write!(f, "PropertyType({name})"),
            Node::Instance(instance) => write!(f, "Instance({instance})"),
            Node::Model(model) => write!(f, "Model({})", model.name),
        }
    }
}

/// Edge of a property graph.
///
/// Parallel edges between the same two nodes are legal; `connection` tells the model
/// connections apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, Display)]
pub enum Edge {
    /// PropertyType -> Model: the type feeds an input symbol of connection `connection`.
    Consumes { connection: usize },
    /// Model -> PropertyType: connection `connection` produces the type.
    Produces { connection: usize },
    /// Material -> PropertyInstance.
    Owns,
    /// PropertyInstance -> PropertyType.
    ClassifiedAs,
}
