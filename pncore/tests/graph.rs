use std::sync::Arc;

use pncore::{
    Catalog, Edge, Material, NodeKind, PnError, PropertyGraph,
    pnunits::{Quantity, UnitRegistry},
};
use petgraph::Direction;

fn builtin_graph() -> PropertyGraph {
    let (catalog, report) = Catalog::builtin();
    assert!(report.is_clean());
    PropertyGraph::new(Arc::new(catalog))
}

fn quantity(x: f64, unit: &str) -> Quantity {
    Quantity::new(x, UnitRegistry::default().parse(unit).unwrap())
}

#[test]
fn static_nodes_come_from_the_catalog() {
    let graph = builtin_graph();
    let catalog = graph.catalog().clone();

    assert_eq!(
        graph.nodes_by_kind(NodeKind::PropertyType).count(),
        catalog.property_types().count()
    );
    assert_eq!(
        graph.nodes_by_kind(NodeKind::Model).count(),
        catalog.models().count()
    );
    assert_eq!(graph.nodes_by_kind(NodeKind::Material).count(), 0);
    assert_eq!(graph.nodes_by_kind(NodeKind::Instance).count(), 0);

    // isotropic_elastic_moduli: K and G feed connection 0, E and nu feed connection 1.
    let bulk = graph.property_type_node("bulk_modulus").unwrap();
    let moduli = graph.model_node("isotropic_elastic_moduli").unwrap();
    let edges: Vec<&Edge> = graph.edges_between(bulk, moduli).collect();
    assert_eq!(edges, [&Edge::Consumes { connection: 0 }]);
    let edges: Vec<&Edge> = graph.edges_between(moduli, bulk).collect();
    assert_eq!(edges, [&Edge::Produces { connection: 1 }]);

    let consumers: Vec<&str> = graph
        .models_consuming("shear_modulus")
        .into_iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(consumers, ["isotropic_elastic_moduli", "pugh_ratio"]);
}

#[test]
fn add_material_merges_and_sets_parent() {
    let mut graph = builtin_graph();
    let mut material = Material::new();
    let k = material.add_property("bulk_modulus", quantity(160.0, "GPa"));

    graph.add_material(&mut material).unwrap();
    assert_eq!(material.parent(), Some(graph.id()));
    assert_eq!(graph.nodes_by_kind(NodeKind::Material).count(), 1);
    assert_eq!(graph.instance(k).unwrap().material, Some(material.id()));

    let node = graph.material_node(material.id()).unwrap();
    let owned: Vec<_> = graph
        .neighbors(node, Direction::Outgoing)
        .filter(|(_, edge)| edge.is_owns())
        .collect();
    assert_eq!(owned.len(), 1);

    // Adding again only brings in the new instance.
    material.add_property("shear_modulus", quantity(80.0, "GPa"));
    graph.add_material(&mut material).unwrap();
    assert_eq!(graph.nodes_by_kind(NodeKind::Material).count(), 1);
    assert_eq!(graph.instance_count(), 2);
    assert_eq!(graph.instances_owned_by(material.id()).unwrap().len(), 2);
}

#[test]
fn add_material_validates_before_mutating() {
    let mut graph = builtin_graph();
    let before = graph.node_count();

    let mut material = Material::new();
    material.add_property("bulk_modulus", quantity(160.0, "GPa"));
    material.add_property("melting_point", quantity(1800.0, "K"));

    let err = graph.add_material(&mut material).unwrap_err();
    assert!(matches!(err, PnError::UnknownPropertyType(ref name) if name == "melting_point"));
    assert_eq!(graph.node_count(), before);
    assert_eq!(material.parent(), None);

    let mut material = Material::new();
    material.add_property("density", quantity(3.0, "GPa"));
    assert!(graph.add_material(&mut material).unwrap_err().is_invalid_value());
}

#[test]
fn removal_cascades_to_owned_instances() {
    let mut graph = builtin_graph();
    let before = graph.node_count();

    let mut material = Material::new();
    let x = material.add_property("density", quantity(7.874, "g/cm^3"));
    graph.add_material(&mut material).unwrap();
    assert!(graph.instance(x).is_some());

    graph.remove_material(&mut material).unwrap();
    assert!(graph.instance(x).is_none());
    assert_eq!(graph.node_count(), before);
    assert_eq!(material.parent(), None);

    let err = graph.remove_material(&mut material).unwrap_err();
    assert!(matches!(err, PnError::NotFound(id) if id == material.id()));
}

#[test]
fn removal_deletes_instances_shared_with_other_materials() {
    let mut graph = builtin_graph();

    let mut first = Material::new();
    let shared = first.add_property("band_gap", quantity(1.1, "eV"));
    graph.add_material(&mut first).unwrap();

    let mut second = Material::new();
    second.add_instance(first.instance(shared).unwrap().clone());
    graph.add_material(&mut second).unwrap();
    assert_eq!(graph.instance_count(), 1);

    graph.remove_material(&mut first).unwrap();
    assert!(graph.instance(shared).is_none());
    assert!(graph.instances_owned_by(second.id()).unwrap().is_empty());
}
