use float_cmp::approx_eq;
use nalgebra::DMatrix;
use pnunits::{BaseDimension, Dimension, Quantity, UnitError, UnitRegistry, Value, convert, tag};

#[test]
fn density_spellings_agree() {
    let reg = UnitRegistry::default();
    let a = reg.parse("1.0 gram / centimeter ** 3").unwrap();
    let b = reg.parse("g/cm^3").unwrap();
    let c = reg.parse("g / cc").unwrap();
    let si = reg.parse("kg / m^3").unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    let in_si = convert(&Value::Scalar(1.0), &b, &si).unwrap();
    assert!(approx_eq!(f64, in_si.as_scalar().unwrap(), 1000.0, ulps = 4));
}

#[test]
fn round_trip_recovers_value() {
    let reg = UnitRegistry::default();
    for text in ["GPa", "g/cm^3", "eV", "dimensionless", "1 / GPa", "cm^3/mol", "K"] {
        let unit = reg.parse(text).unwrap();
        for x in [0.0, 1.5, -273.15, 6.02e23, 1e-12] {
            let q = tag(x, &unit);
            let back = tag(convert(&q.value, &unit, &unit).unwrap(), &unit);
            assert_eq!(back, q, "{x} {text}");
            assert_eq!(back.value, Value::Scalar(x));
        }
    }
}

#[test]
fn conversion_between_prefixes() {
    let reg = UnitRegistry::default();
    let q = Quantity::new(200.0, reg.parse("GPa").unwrap());
    let mpa = q.to(&reg.parse("MPa").unwrap()).unwrap();
    assert!(approx_eq!(f64, mpa.value.as_scalar().unwrap(), 200_000.0, ulps = 4));
    assert_eq!(mpa.unit.text, "MPa");

    let ev = Quantity::new(1.0, reg.parse("eV").unwrap());
    let joule = ev.magnitude_in(&reg.parse("J").unwrap()).unwrap();
    assert!(approx_eq!(f64, joule.as_scalar().unwrap(), 1.602176634e-19, ulps = 4));
}

#[test]
fn incompatible_dimensions_fail() {
    let reg = UnitRegistry::default();
    let q = Quantity::new(1.0, reg.parse("GPa").unwrap());
    let err = q.to(&reg.parse("g/cm^3").unwrap()).unwrap_err();
    assert!(err.is_incompatible());
    assert!(err.to_string().contains("GPa"));
}

#[test]
fn matrices_scale_elementwise() {
    let reg = UnitRegistry::default();
    let m = DMatrix::from_diagonal_element(6, 6, 100.0);
    let q = Quantity::new(m, reg.parse("GPa").unwrap());
    let pa = q.magnitude_in(&reg.parse("Pa").unwrap()).unwrap();

    let Value::Matrix(pa) = pa else {
        panic!("matrix expected");
    };
    assert_eq!(pa.shape(), (6, 6));
    assert!(approx_eq!(f64, pa[(2, 2)], 1e11, ulps = 4));
    assert_eq!(pa[(0, 1)], 0.0);
}

#[test]
fn dimensionless_forms() {
    let reg = UnitRegistry::default();
    let none = reg.parse("").unwrap();
    assert!(none.is_dimensionless());
    assert_eq!(none, reg.parse("dimensionless").unwrap());
    assert_eq!(none, reg.parse("atom").unwrap());
    assert_eq!(none.text, "dimensionless");

    let pct = reg.parse("%").unwrap();
    let half = convert(&Value::Scalar(50.0), &pct, &none).unwrap();
    assert!(approx_eq!(f64, half.as_scalar().unwrap(), 0.5, ulps = 4));
}

#[test]
fn molar_volume_dimension() {
    let reg = UnitRegistry::default();
    let unit = reg.parse("cm^3/mol").unwrap();
    assert_eq!(unit.dimension.exponent(BaseDimension::Length), 3);
    assert_eq!(unit.dimension.exponent(BaseDimension::Amount), -1);
    assert_ne!(unit.dimension, Dimension::DIMENSIONLESS);
}

#[test]
fn unknown_and_malformed_units() {
    let reg = UnitRegistry::default();
    assert!(reg.parse("furlong").unwrap_err().is_unknown_unit());
    assert!(reg.parse("m^").unwrap_err().is_parse());
    assert!(reg.parse("(m").unwrap_err().is_parse());
}

#[test]
fn exponent_overflow_is_an_error() {
    let reg = UnitRegistry::default();
    let err = reg.parse("m^100 m^100").unwrap_err();
    assert_eq!(
        err,
        UnitError::ExponentOverflow {
            text: "m^100 m^100".to_string()
        }
    );
    assert!(reg.parse("m^256").unwrap_err().is_exponent_overflow());
    assert!(reg.parse("kg^-100 / kg^100").unwrap_err().is_exponent_overflow());
}
