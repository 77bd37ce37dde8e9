use std::fs;

use pncore::{Catalog, CatalogLoadError, DescriptorSource, catalog::property::Category};

const WIDGET: &str = "name = \"widget\"\nunits = \"m\"\n";

const STRETCH: &str = r#"
name = "stretch"
equations = ["b = 2 * a"]

[symbol_mapping]
a = "widget"
b = "widget"

[[connections]]
inputs = ["a"]
outputs = ["b"]
"#;

#[test]
fn builtin_catalog_loads_cleanly() {
    let (catalog, report) = Catalog::builtin();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(catalog.property_types().count(), 13);
    assert_eq!(catalog.models().count(), 5);

    let temperature = catalog.property_type("temperature").unwrap();
    assert_eq!(temperature.category, Category::Condition);
    assert!(temperature.is_scalar());
    assert_eq!(catalog.property_type("elastic_tensor_voigt").unwrap().shape, [6, 6]);

    let moduli = catalog.model("isotropic_elastic_moduli").unwrap();
    assert_eq!(moduli.connections.len(), 2);
    assert_eq!(moduli.property_of("nu"), Some("poisson_ratio"));
    assert_eq!(moduli.unit_of("E").unwrap().to_string(), "GPa");
    assert!(moduli.unit_of("nu").unwrap().is_dimensionless());
    assert!(moduli.unit_of("missing").is_none());
}

#[test]
fn loading_twice_gives_the_same_catalog() {
    let (once, _) = Catalog::builtin();
    let (twice, report) = Catalog::builder().add_builtin().add_builtin().build();

    assert!(report.is_clean());
    assert_eq!(once, twice);
}

#[test]
fn builtin_models_pass_their_test_data() {
    let (catalog, _) = Catalog::builtin();
    for model in catalog.models() {
        assert!(!model.test_data.is_empty(), "{} has no test data", model.name);
        assert!(model.self_test(catalog.solver()), "{} fails its test data", model.name);
    }
}

#[test]
fn model_ids_are_short_and_distinct() {
    let (catalog, _) = Catalog::builtin();
    let mut ids: Vec<String> = catalog.models().map(|m| m.model_id()).collect();
    assert!(ids.iter().all(|id| id.len() == 4));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

#[test]
fn model_tags_are_counted() {
    let (catalog, _) = Catalog::builtin();
    let tags = catalog.model_tags();
    assert_eq!(tags.get("mechanical"), Some(&3));
    assert_eq!(tags.get("optical"), Some(&1));
    assert_eq!(tags.get("tensor"), Some(&1));
}

#[test]
fn differing_duplicate_is_reported_and_first_kept() {
    let (catalog, report) = Catalog::builder()
        .add_source(DescriptorSource::property_type("widget.toml", WIDGET))
        .add_source(DescriptorSource::property_type(
            "other/widget.toml",
            "name = \"widget\"\nunits = \"s\"\n",
        ))
        .build();

    assert_eq!(report.len(), 1);
    assert!(report.errors[0].is_duplicate());
    assert_eq!(catalog.property_type("widget").unwrap().unit.to_string(), "m");
}

#[test]
fn name_must_match_file_stem() {
    let (catalog, report) = Catalog::builder()
        .add_source(DescriptorSource::property_type("gadget.toml", WIDGET))
        .build();

    assert!(catalog.property_type("widget").is_none());
    assert_eq!(
        report.errors,
        [CatalogLoadError::NameMismatch {
            file: "gadget.toml".to_string(),
            name: "widget".to_string(),
            stem: "gadget".to_string(),
        }]
    );
}

#[test]
fn bad_entries_are_skipped() {
    let broken_model = STRETCH.replace("\"widget\"", "\"gizmo\"");
    let (catalog, report) = Catalog::builder()
        .add_source(DescriptorSource::model("stretch.toml", STRETCH))
        .add_source(DescriptorSource::model("broken.toml", broken_model.replace("stretch", "broken")))
        .add_source(DescriptorSource::model("garbage.toml", "name = [1, 2"))
        .add_source(DescriptorSource::property_type(
            "lumen.toml",
            "name = \"lumen\"\nunits = \"furlong\"\n",
        ))
        .add_source(DescriptorSource::property_type("widget.toml", WIDGET))
        .build();

    assert_eq!(catalog.models().count(), 1);
    assert!(catalog.model("stretch").is_some());
    assert_eq!(catalog.property_types().count(), 1);

    assert_eq!(report.len(), 3);
    assert!(report.iter().any(|e| e.is_unknown_property_type()));
    assert!(report.iter().any(|e| e.is_parse()));
    assert!(report.iter().any(|e| e.is_invalid_unit()));
}

#[test]
fn out_of_range_unit_exponent_is_an_invalid_unit() {
    let (catalog, report) = Catalog::builder()
        .add_source(DescriptorSource::property_type(
            "weird.toml",
            "name = \"weird\"\nunits = \"m^100 m^100\"\n",
        ))
        .add_source(DescriptorSource::property_type("widget.toml", WIDGET))
        .build();

    assert!(catalog.property_type("weird").is_none());
    assert!(catalog.property_type("widget").is_some());
    assert_eq!(report.len(), 1);
    match &report.errors[0] {
        CatalogLoadError::InvalidUnit { property, source } => {
            assert_eq!(property, "weird");
            assert!(source.is_exponent_overflow());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn models_are_validated() {
    let cases = [
        // Symbol used in an equation but not mapped.
        STRETCH.replace("2 * a", "2 * a + c"),
        // No connection.
        STRETCH.replace("[[connections]]\ninputs = [\"a\"]\noutputs = [\"b\"]\n", ""),
        // Unknown custom rule and equations at the same time.
        format!("custom = \"nope\"\n{STRETCH}"),
        // Constraint that is not a predicate.
        format!("{STRETCH}\n[constraints]\na = \"a + 1\"\n"),
    ];

    for text in cases {
        let (catalog, report) = Catalog::builder()
            .add_source(DescriptorSource::property_type("widget.toml", WIDGET))
            .add_source(DescriptorSource::model("stretch.toml", text.as_str()))
            .build();
        assert!(catalog.model("stretch").is_none(), "accepted:\n{text}");
        assert_eq!(report.len(), 1, "{text}");
    }
}

#[test]
fn load_dir_reads_symbols_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = dir.path().join("symbols").join("nested");
    let models = dir.path().join("models");
    fs::create_dir_all(&symbols).unwrap();
    fs::create_dir_all(&models).unwrap();

    fs::write(symbols.join("widget.toml"), WIDGET).unwrap();
    fs::write(symbols.join("notes.txt"), "not a descriptor").unwrap();
    fs::write(models.join("stretch.toml"), STRETCH).unwrap();

    let (catalog, report) = Catalog::load_dir(dir.path()).unwrap();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert!(catalog.property_type("widget").is_some());
    assert!(catalog.model("stretch").is_some());
}

#[test]
fn load_dir_requires_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    assert!(Catalog::load_dir(&missing).unwrap_err().is_io_error());

    let file = dir.path().join("file.toml");
    fs::write(&file, WIDGET).unwrap();
    assert!(Catalog::load_dir(&file).unwrap_err().is_io_error());
}
