//! The property graph: a typed directed multigraph over materials, property types,
//! property instances and models.
//!
//! Edges
//! - PropertyType -> Model ([`Edge::Consumes`]) and Model -> PropertyType ([`Edge::Produces`]),
//!   one per symbol per connection, created from the catalog when the graph is built.
//! - Material -> PropertyInstance ([`Edge::Owns`]).
//! - PropertyInstance -> PropertyType ([`Edge::ClassifiedAs`]), exactly one per instance.
//!
//! Backed by a `StableDiGraph` so removing materials does not invalidate other indices.
pub mod instance;
pub mod material;
pub mod node;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use log::{debug, info, warn};
use petgraph::{
    Direction,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::EdgeRef,
};
use pnunits::Quantity;
use uuid::Uuid;

use crate::{
    catalog::{Catalog, model::Model},
    graph::{
        instance::PropertyInstance,
        material::Material,
        node::{Edge, Node, NodeKind},
    },
    utils::error::{PnError, PnResult},
};

#[derive(Debug, Clone)]
pub struct PropertyGraph {
    id: Uuid,
    catalog: Arc<Catalog>,
    graph: StableDiGraph<Node, Edge>,
    type_index: BTreeMap<String, NodeIndex>,
    model_index: BTreeMap<String, NodeIndex>,
    /// Instance id -> insertion sequence number.
    instance_index: HashMap<Uuid, u64>,
    /// Insertion sequence number -> node, iterated in insertion order.
    instance_order: BTreeMap<u64, NodeIndex>,
    next_seq: u64,
}

impl PropertyGraph {
    /// Build the static part of the graph from `catalog`: one node per property type and
    /// model, and the consumed/produced edges of every model connection.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut graph = StableDiGraph::new();

        let mut type_index = BTreeMap::new();
        for property in catalog.property_types() {
            let idx = graph.add_node(Node::PropertyType(property.name.clone()));
            type_index.insert(property.name.clone(), idx);
        }

        let mut model_index = BTreeMap::new();
        for model in catalog.models() {
            let model_node = graph.add_node(Node::Model(Arc::clone(model)));
            model_index.insert(model.name.clone(), model_node);

            for (connection, conn) in model.connections.iter().enumerate() {
                for symbol in &conn.inputs {
                    if let Some(ty) = model.property_of(symbol).and_then(|p| type_index.get(p)) {
                        graph.add_edge(*ty, model_node, Edge::Consumes { connection });
                    }
                }
                for symbol in &conn.outputs {
                    if let Some(ty) = model.property_of(symbol).and_then(|p| type_index.get(p)) {
                        graph.add_edge(model_node, *ty, Edge::Produces { connection });
                    }
                }
            }
        }

        debug!(
            "Built property graph with {} property types and {} models",
            type_index.len(),
            model_index.len()
        );

        Self {
            id: Uuid::new_v4(),
            catalog,
            graph,
            type_index,
            model_index,
            instance_index: HashMap::new(),
            instance_order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Locate the unique Material node with identity `id`.
    pub(crate) fn find_material(&self, id: Uuid) -> PnResult<NodeIndex> {
        let mut matches = self
            .graph
            .node_indices()
            .filter(|idx| matches!(&self.graph[*idx], Node::Material(m) if *m == id));

        match (matches.next(), matches.next()) {
            (None, _) => Err(PnError::NotFound(id)),
            (Some(idx), None) => Ok(idx),
            (Some(_), Some(_)) => Err(PnError::AmbiguousIdentity {
                material: id,
                count: 2 + matches.count(),
            }),
        }
    }

    /// Check that `value` can be a value of `property`.
    pub(crate) fn validate_value(&self, property: &str, value: &Quantity) -> PnResult<()> {
        let Some(ty) = self.catalog.property_type(property) else {
            return Err(PnError::UnknownPropertyType(property.to_string()));
        };

        if !ty.accepts(&value.value) {
            return Err(PnError::InvalidValue {
                property: property.to_string(),
                reason: format!(
                    "shape {:?} does not match the declared {:?}",
                    value.value.shape(),
                    ty.shape
                ),
            });
        }

        if !value.unit.is_compatible(&ty.unit) {
            return Err(PnError::InvalidValue {
                property: property.to_string(),
                reason: format!("unit `{}` is not compatible with `{}`", value.unit, ty.unit),
            });
        }

        Ok(())
    }

    /// Add an instance node with its classification edge, and an ownership edge if `owner` is given.
    pub(crate) fn insert_instance(
        &mut self,
        instance: PropertyInstance,
        owner: Option<NodeIndex>,
    ) -> PnResult<NodeIndex> {
        let Some(type_node) = self.type_index.get(&instance.property).copied() else {
            return Err(PnError::UnknownPropertyType(instance.property));
        };

        let id = instance.id;
        let node = self.graph.add_node(Node::Instance(instance));
        self.graph.add_edge(node, type_node, Edge::ClassifiedAs);
        if let Some(owner) = owner {
            self.graph.add_edge(owner, node, Edge::Owns);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.instance_index.insert(id, seq);
        self.instance_order.insert(seq, node);
        Ok(node)
    }

    fn instance_node(&self, id: Uuid) -> Option<NodeIndex> {
        let seq = self.instance_index.get(&id)?;
        self.instance_order.get(seq).copied()
    }

    /// Merge `material` and its owned instances into the graph.
    ///
    /// Adding a material that is already present reuses its node and only adds the
    /// instances the graph does not know yet. Every instance is validated against the
    /// catalog before anything is inserted.
    pub fn add_material(&mut self, material: &mut Material) -> PnResult<()> {
        for instance in material.properties() {
            self.validate_value(&instance.property, &instance.value)?;
        }

        let material_node = match self.find_material(material.id()) {
            Ok(idx) => idx,
            Err(PnError::NotFound(_)) => self.graph.add_node(Node::Material(material.id())),
            Err(e) => return Err(e),
        };

        let mut added = 0;
        for instance in material.properties() {
            match self.instance_node(instance.id) {
                Some(existing) => {
                    if self.graph.find_edge(material_node, existing).is_none() {
                        self.graph.add_edge(material_node, existing, Edge::Owns);
                    }
                }
                None => {
                    self.insert_instance(instance.clone(), Some(material_node))?;
                    added += 1;
                }
            }
        }

        material.set_parent(Some(self.id));
        debug!(
            "Added material {} with {added} new property instances",
            material.id()
        );
        Ok(())
    }

    /// Insert `instance` without an owning material. Returns its id.
    ///
    /// Inserting an instance id the graph already holds does nothing.
    pub fn add_instance(&mut self, mut instance: PropertyInstance) -> PnResult<Uuid> {
        let id = instance.id;
        if self.instance_node(id).is_some() {
            return Ok(id);
        }

        self.validate_value(&instance.property, &instance.value)?;
        instance.material = None;
        self.insert_instance(instance, None)?;
        Ok(id)
    }

    /// Shorthand for [`PropertyGraph::add_instance`] with a fresh instance.
    pub fn add_value(&mut self, property: &str, value: Quantity) -> PnResult<Uuid> {
        self.add_instance(PropertyInstance::new(property, value))
    }

    /// Remove `material` and every property instance it owns.
    ///
    /// An owned instance is removed even if another material also owns it; such cases
    /// are logged with `warn!`.
    pub fn remove_material(&mut self, material: &mut Material) -> PnResult<()> {
        let material_node = self.find_material(material.id())?;

        let owned: Vec<NodeIndex> = self
            .graph
            .edges_directed(material_node, Direction::Outgoing)
            .filter(|e| e.weight().is_owns())
            .map(|e| e.target())
            .collect();

        for node in &owned {
            let other_owners = self
                .graph
                .edges_directed(*node, Direction::Incoming)
                .filter(|e| e.weight().is_owns() && e.source() != material_node)
                .count();
            if other_owners > 0 {
                warn!(
                    "Removing {} owned by material {} although {other_owners} other material(s) also own it",
                    self.graph[*node],
                    material.id()
                );
            }
        }

        for node in owned {
            if let Some(Node::Instance(instance)) = self.graph.remove_node(node)
                && let Some(seq) = self.instance_index.remove(&instance.id)
            {
                self.instance_order.remove(&seq);
            }
        }
        self.graph.remove_node(material_node);

        material.set_parent(None);
        info!("Removed material {} from property graph {}", material.id(), self.id);
        Ok(())
    }

    /// All nodes of one kind, in graph index order.
    pub fn nodes_by_kind(&self, kind: NodeKind) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(|idx| (idx, &self.graph[idx]))
            .filter(move |(_, node)| node.kind() == kind)
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Neighbors of `idx` in `direction`, with the connecting edge.
    pub fn neighbors(
        &self,
        idx: NodeIndex,
        direction: Direction,
    ) -> impl Iterator<Item = (NodeIndex, &Edge)> {
        self.graph
            .edges_directed(idx, direction)
            .map(move |e| match direction {
                Direction::Outgoing => (e.target(), e.weight()),
                Direction::Incoming => (e.source(), e.weight()),
            })
    }

    /// Every edge going from `a` to `b`.
    pub fn edges_between(&self, a: NodeIndex, b: NodeIndex) -> impl Iterator<Item = &Edge> {
        self.graph.edges_connecting(a, b).map(|e| e.weight())
    }

    pub fn material_node(&self, id: Uuid) -> PnResult<NodeIndex> {
        self.find_material(id)
    }

    pub fn property_type_node(&self, name: &str) -> Option<NodeIndex> {
        self.type_index.get(name).copied()
    }

    pub fn model_node(&self, name: &str) -> Option<NodeIndex> {
        self.model_index.get(name).copied()
    }

    pub fn instance(&self, id: Uuid) -> Option<&PropertyInstance> {
        let node = self.instance_node(id)?;
        self.graph[node].try_as_instance_ref()
    }

    pub(crate) fn instance_at(&self, node: NodeIndex) -> Option<&PropertyInstance> {
        self.graph.node_weight(node)?.try_as_instance_ref()
    }

    /// Instance nodes in insertion order.
    pub(crate) fn instance_nodes(&self) -> impl Iterator<Item = NodeIndex> {
        self.instance_order.values().copied()
    }

    /// Instance nodes owned by `material_node`, in insertion order.
    pub(crate) fn owned_instance_nodes(&self, material_node: NodeIndex) -> Vec<NodeIndex> {
        let owned: BTreeSet<NodeIndex> = self
            .graph
            .edges_directed(material_node, Direction::Outgoing)
            .filter(|e| e.weight().is_owns())
            .map(|e| e.target())
            .collect();

        self.instance_nodes()
            .filter(|idx| owned.contains(idx))
            .collect()
    }

    /// Every property instance, in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = &PropertyInstance> {
        self.instance_nodes()
            .filter_map(|idx| self.instance_at(idx))
    }

    pub fn instance_count(&self) -> usize {
        self.instance_order.len()
    }

    /// Instances of one property type, in insertion order.
    pub fn instances_of<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a PropertyInstance> + 'a {
        self.instances().filter(move |i| i.property == property)
    }

    /// Instances owned by the material with identity `material`, in insertion order.
    pub fn instances_owned_by(&self, material: Uuid) -> PnResult<Vec<&PropertyInstance>> {
        let node = self.find_material(material)?;
        Ok(self
            .owned_instance_nodes(node)
            .into_iter()
            .filter_map(|idx| self.instance_at(idx))
            .collect())
    }

    /// Models with at least one input symbol of type `property`, in catalog order.
    pub fn models_consuming(&self, property: &str) -> Vec<&Arc<Model>> {
        let Some(type_node) = self.property_type_node(property) else {
            return Vec::new();
        };

        let models: BTreeSet<NodeIndex> = self
            .graph
            .edges_directed(type_node, Direction::Outgoing)
            .filter(|e| e.weight().is_consumes())
            .map(|e| e.target())
            .collect();

        models
            .into_iter()
            .filter_map(|idx| self.graph[idx].try_as_model_ref())
            .collect()
    }
}
