use std::{collections::BTreeSet, sync::Arc};

use pncore::{
    Catalog, DescriptorSource, Material, PropertyGraph, PropertyInstance,
    pnunits::{Quantity, Unit},
};

const TYPES: [&str; 3] = ["t1", "t2", "t3"];

const DOUBLE: &str = r#"
name = "double"
equations = ["y = 2 * x"]

[symbol_mapping]
x = "t1"
y = "t2"

[[connections]]
inputs = ["x"]
outputs = ["y"]
"#;

const POSITIVE_DOUBLE: &str = r#"
name = "positive_double"
equations = ["y = 2 * x"]

[symbol_mapping]
x = "t1"
y = "t2"

[[connections]]
inputs = ["x"]
outputs = ["y"]

[constraints]
x = "x > 0"
"#;

const PRODUCT: &str = r#"
name = "product"
equations = ["c = a * b"]

[symbol_mapping]
a = "t1"
b = "t2"
c = "t3"

[[connections]]
inputs = ["a", "b"]
outputs = ["c"]
"#;

const SUM: &str = r#"
name = "sum"
equations = ["s = a + b"]

[symbol_mapping]
a = "t1"
b = "t1"
s = "t2"

[[connections]]
inputs = ["a", "b"]
outputs = ["s"]
"#;

const TRIPLE: &str = r#"
name = "triple"
equations = ["z = 3 * w"]

[symbol_mapping]
w = "t2"
z = "t3"

[[connections]]
inputs = ["w"]
outputs = ["z"]
"#;

fn graph_with(models: &[&str]) -> PropertyGraph {
    let types = TYPES.iter().map(|name| {
        DescriptorSource::property_type(
            format!("{name}.toml"),
            format!("name = \"{name}\"\nunits = \"dimensionless\"\n"),
        )
    });
    let models = models
        .iter()
        .enumerate()
        .map(|(i, text)| DescriptorSource::model(format!("model_{i}.toml"), *text));

    let (catalog, report) = Catalog::builder()
        .add_sources(types)
        .add_sources(models)
        .build();
    assert!(report.is_clean(), "{:?}", report.errors);
    PropertyGraph::new(Arc::new(catalog))
}

fn number(x: f64) -> Quantity {
    Quantity::new(x, Unit::dimensionless())
}

fn values_of(graph: &PropertyGraph, property: &str) -> Vec<f64> {
    let mut values: Vec<f64> = graph
        .instances_of(property)
        .filter_map(|i| i.value.magnitude().as_scalar())
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

#[test]
fn no_feedback_and_no_deduplication() {
    let mut graph = graph_with(&[DOUBLE, TRIPLE]);
    graph.add_value("t1", number(3.0)).unwrap();

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(values_of(&graph, "t2"), [6.0]);
    // The new t2 instance is not fed to `triple` within the same pass.
    assert!(values_of(&graph, "t3").is_empty());
    assert_eq!(report.candidate_models, ["double"]);

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(values_of(&graph, "t2"), [6.0, 6.0]);
    assert_eq!(values_of(&graph, "t3"), [18.0]);
    assert_eq!(report.created.len(), 2);
    assert_eq!(graph.instance_count(), 4);
}

#[test]
fn scoped_pass_only_touches_the_scope_material() {
    let mut graph = graph_with(&[DOUBLE]);

    let mut m1 = Material::new();
    m1.add_property("t1", number(1.0));
    let mut m2 = Material::new();
    m2.add_property("t1", number(2.0));
    graph.add_material(&mut m1).unwrap();
    graph.add_material(&mut m2).unwrap();

    let report = graph.evaluate(Some(&mut m1), None).unwrap();
    assert_eq!(report.created.len(), 1);

    let derived = graph.instance(report.created[0]).unwrap();
    assert_eq!(derived.property, "t2");
    assert_eq!(derived.material, Some(m1.id()));
    assert_eq!(derived.value.magnitude().as_scalar(), Some(2.0));

    // Mirrored into the material's own subgraph and owned in the global graph.
    assert_eq!(m1.properties_of("t2").count(), 1);
    assert_eq!(graph.instances_owned_by(m1.id()).unwrap().len(), 2);
    assert_eq!(m2.property_count(), 1);
    assert_eq!(graph.instances_owned_by(m2.id()).unwrap().len(), 1);

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(report.created.len(), 2);
    for id in &report.created {
        assert_eq!(graph.instance(*id).unwrap().material, None);
    }
    assert_eq!(values_of(&graph, "t2"), [2.0, 2.0, 4.0]);
    assert_eq!(m1.property_count(), 2);
}

#[test]
fn scope_material_must_be_in_the_graph() {
    let mut graph = graph_with(&[DOUBLE]);
    let mut stranger = Material::new();
    let err = graph.evaluate(Some(&mut stranger), None).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn missing_input_type_produces_nothing() {
    let mut graph = graph_with(&[PRODUCT]);
    graph.add_value("t1", number(2.0)).unwrap();

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(report.candidate_models, ["product"]);
    assert_eq!(report.assignments, 0);
    assert!(report.is_noop());
    assert!(report.failures.is_empty());
    assert_eq!(graph.instance_count(), 1);
}

#[test]
fn constraint_excludes_candidates() {
    let mut graph = graph_with(&[POSITIVE_DOUBLE]);
    for x in [-1.0, 0.0, 3.0] {
        graph.add_value("t1", number(x)).unwrap();
    }

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(report.assignments, 1);
    assert_eq!(values_of(&graph, "t2"), [6.0]);
}

#[test]
fn same_instance_may_fill_several_symbols() {
    let mut graph = graph_with(&[SUM]);
    graph.add_value("t1", number(1.0)).unwrap();
    graph.add_value("t1", number(2.0)).unwrap();

    let report = graph.evaluate(None, None).unwrap();
    assert_eq!(report.assignments, 4);
    assert_eq!(values_of(&graph, "t2"), [2.0, 3.0, 3.0, 4.0]);
}

#[test]
fn type_filter_restricts_active_instances() {
    let mut graph = graph_with(&[DOUBLE, TRIPLE]);
    graph.add_value("t1", number(1.0)).unwrap();
    graph.add_value("t2", number(5.0)).unwrap();

    let filter = BTreeSet::from(["t2".to_string()]);
    let report = graph.evaluate(None, Some(&filter)).unwrap();
    assert_eq!(report.candidate_models, ["triple"]);
    assert_eq!(values_of(&graph, "t2"), [5.0]);
    assert_eq!(values_of(&graph, "t3"), [15.0]);
}

#[test]
fn externally_added_instance_is_unowned() {
    let mut graph = graph_with(&[DOUBLE]);
    let owner = Material::new();
    let instance = PropertyInstance::new("t1", number(4.0)).owned_by(owner.id());
    let id = graph.add_instance(instance.clone()).unwrap();

    assert_eq!(graph.instance(id).unwrap().material, None);
    // Adding the same instance again changes nothing.
    graph.add_instance(instance).unwrap();
    assert_eq!(graph.instance_count(), 1);
}

#[test]
fn empty_graph_pass_is_a_noop() {
    let mut graph = graph_with(&[DOUBLE]);
    let before = graph.node_count();
    let report = graph.evaluate(None, None).unwrap();
    assert!(report.is_noop());
    assert!(report.candidate_models.is_empty());
    assert_eq!(graph.node_count(), before);
}
