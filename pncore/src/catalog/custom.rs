//! Custom evaluation rules for models whose logic is not a set of scalar equations.
//!
//! Rules are registered explicitly in [`CUSTOM_RULES`]; a model descriptor selects one by
//! key through its `custom` field. Inputs and outputs are bare magnitudes already
//! expressed in the model's units.
use std::{collections::BTreeMap, fmt};

use phf::phf_map;
use pnunits::Value;

pub type CustomRuleFn = fn(&BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>, String>;

static CUSTOM_RULES: phf::Map<&'static str, CustomRuleFn> = phf_map! {
    "elastic_compliance_voigt" => elastic_compliance_voigt as CustomRuleFn,
};

/// A registered custom rule. Compared by key.
#[derive(Clone, Copy)]
pub struct CustomRule {
    pub key: &'static str,
    pub func: CustomRuleFn,
}

impl CustomRule {
    pub fn lookup(key: &str) -> Option<Self> {
        CUSTOM_RULES
            .get_entry(key)
            .map(|(key, func)| CustomRule {
                key: *key,
                func: *func,
            })
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        CUSTOM_RULES.keys().copied()
    }

    pub fn apply(&self, inputs: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>, String> {
        (self.func)(inputs)
    }
}

impl PartialEq for CustomRule {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomRule").field(&self.key).finish()
    }
}

/// Voigt stiffness tensor `C` <-> compliance tensor `S`; each is the inverse of the other.
fn elastic_compliance_voigt(
    inputs: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, String> {
    let (given, wanted) = if inputs.contains_key("C") {
        ("C", "S")
    } else if inputs.contains_key("S") {
        ("S", "C")
    } else {
        return Err("expected a `C` or `S` tensor".to_string());
    };

    let Some(Value::Matrix(matrix)) = inputs.get(given) else {
        return Err(format!("`{given}` must be a matrix"));
    };
    if !matrix.is_square() {
        return Err(format!(
            "`{given}` must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        ));
    }

    let inverse = matrix
        .clone()
        .try_inverse()
        .ok_or_else(|| format!("`{given}` is singular"))?;

    Ok(BTreeMap::from([(wanted.to_string(), Value::Matrix(inverse))]))
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;

    #[test]
    fn registered_rules_are_found_by_key() {
        let rule = CustomRule::lookup("elastic_compliance_voigt").expect("registered");
        assert_eq!(rule.key, "elastic_compliance_voigt");
        assert!(CustomRule::lookup("nope").is_none());
        assert!(CustomRule::keys().any(|k| k == "elastic_compliance_voigt"));
    }

    #[test]
    fn voigt_inverse_both_ways() {
        let c = DMatrix::from_diagonal_element(6, 6, 100.0);
        let out = elastic_compliance_voigt(&BTreeMap::from([(
            "C".to_string(),
            Value::Matrix(c),
        )]))
        .unwrap();
        let Value::Matrix(s) = &out["S"] else {
            panic!("matrix expected");
        };
        assert!((s[(0, 0)] - 0.01).abs() < 1e-15);

        let singular = DMatrix::zeros(6, 6);
        assert!(
            elastic_compliance_voigt(&BTreeMap::from([(
                "S".to_string(),
                Value::Matrix(singular)
            )]))
            .is_err()
        );
        assert!(
            elastic_compliance_voigt(&BTreeMap::from([("C".to_string(), Value::Scalar(1.0))]))
                .is_err()
        );
    }
}
