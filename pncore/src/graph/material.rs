use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use pnunits::Quantity;
use uuid::Uuid;

use crate::graph::{
    instance::PropertyInstance,
    node::{Edge, Node},
};

/// A material and the property instances it owns.
///
/// The material keeps its own small graph (Material -> Instance -> PropertyType) that
/// mirrors what it contributes to a [`PropertyGraph`](crate::graph::PropertyGraph). Once
/// added to a property graph, [`Material::parent`] names that graph.
#[derive(Debug, Clone)]
pub struct Material {
    id: Uuid,
    parent: Option<Uuid>,
    graph: StableDiGraph<Node, Edge>,
    root: NodeIndex,
    types: HashMap<String, NodeIndex>,
    instances: HashMap<Uuid, NodeIndex>,
    order: Vec<Uuid>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

impl Material {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Node::Material(id));
        Self {
            id,
            parent: None,
            graph,
            root,
            types: HashMap::new(),
            instances: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Id of the property graph this material was added to, if any.
    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Uuid>) {
        self.parent = parent;
    }

    /// Record a value of `property` owned by this material. Returns the instance id.
    pub fn add_property(&mut self, property: impl Into<String>, value: Quantity) -> Uuid {
        self.add_instance(PropertyInstance::new(property, value))
    }

    /// Take ownership of `instance`. An instance already owned by this material is kept as is.
    pub fn add_instance(&mut self, instance: PropertyInstance) -> Uuid {
        let id = instance.id;
        if self.instances.contains_key(&id) {
            return id;
        }

        let instance = instance.owned_by(self.id);
        let type_node = match self.types.get(&instance.property) {
            Some(idx) => *idx,
            None => {
                let idx = self
                    .graph
                    .add_node(Node::PropertyType(instance.property.clone()));
                self.types.insert(instance.property.clone(), idx);
                idx
            }
        };

        let node = self.graph.add_node(Node::Instance(instance));
        self.graph.add_edge(self.root, node, Edge::Owns);
        self.graph.add_edge(node, type_node, Edge::ClassifiedAs);
        self.instances.insert(id, node);
        self.order.push(id);
        id
    }

    pub fn instance(&self, id: Uuid) -> Option<&PropertyInstance> {
        let idx = self.instances.get(&id)?;
        self.graph[*idx].try_as_instance_ref()
    }

    /// Owned instances in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyInstance> {
        self.order.iter().filter_map(|id| self.instance(*id))
    }

    /// Owned instances of one property type, in insertion order.
    pub fn properties_of<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a PropertyInstance> + 'a {
        self.properties().filter(move |p| p.property == property)
    }

    pub fn property_count(&self) -> usize {
        self.order.len()
    }

    /// The mirror graph rooted at this material's node.
    pub fn graph(&self) -> &StableDiGraph<Node, Edge> {
        &self.graph
    }
}
