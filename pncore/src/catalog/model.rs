use std::{collections::BTreeMap, sync::Arc};

use log::trace;
use pnexpr::{Equation, Expr, SolverSettings, parse_equation, parse_expr};
use pnunits::{Quantity, Unit, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{EnumIs, EnumTryAs};

use crate::{
    catalog::{
        custom::CustomRule,
        property::{PropertyType, ValueRepr},
    },
    evaluator::{EvaluationOutcome, SymbolInput},
    magic::{MODEL_ID_LEN, SELF_TEST_TOLERANCE},
    utils::error::CatalogLoadError,
};

/// One admissible grouping of a model's symbols: given `inputs`, the model produces `outputs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCaseDescriptor {
    pub inputs: BTreeMap<String, ValueRepr>,
    pub outputs: BTreeMap<String, ValueRepr>,
}

fn default_title() -> String {
    "undefined".to_string()
}

/// On-disk form of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub symbol_mapping: BTreeMap<String, String>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
    #[serde(default)]
    pub equations: Vec<String>,
    #[serde(default)]
    pub custom: Option<String>,
    #[serde(default)]
    pub test_data: Vec<TestCaseDescriptor>,
}

/// Predicate restricting the values a symbol may take, written over the symbol itself
/// (e.g. `K > 0`) and evaluated on the magnitude in the model's unit for that symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub symbol: String,
    pub expr: Expr,
}

/// How a model computes its outputs.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs)]
pub enum EvaluationRule {
    Equations(Vec<Equation>),
    Custom(CustomRule),
}

/// Known inputs and expected outputs, as magnitudes in model units.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub inputs: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, Value>,
}

/// A declarative rule relating property types through local symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub title: String,
    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub description: String,
    /// Local symbol -> canonical property type name.
    pub symbol_mapping: BTreeMap<String, String>,
    /// Local symbol -> unit of its property type.
    pub unit_mapping: BTreeMap<String, Unit>,
    pub connections: Vec<Connection>,
    pub constraints: BTreeMap<String, Constraint>,
    pub rule: EvaluationRule,
    pub test_data: Vec<TestCase>,
}

impl Model {
    /// Validate a descriptor against the property types of the catalog.
    ///
    /// Every symbol used by connections, equations, constraints and test data must be
    /// mapped, every mapped property type must exist, and exactly one evaluation rule
    /// (equations or a registered custom rule) must be given.
    pub fn from_descriptor(
        desc: ModelDescriptor,
        property_types: &BTreeMap<String, Arc<PropertyType>>,
    ) -> Result<Self, CatalogLoadError> {
        let name = desc.name.clone();
        let invalid = |reason: String| CatalogLoadError::InvalidModel {
            model: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty".to_string()));
        }

        let mut unit_mapping = BTreeMap::new();
        for (symbol, property) in &desc.symbol_mapping {
            let Some(ty) = property_types.get(property) else {
                return Err(CatalogLoadError::UnknownPropertyType {
                    model: name.clone(),
                    symbol: symbol.clone(),
                    property: property.clone(),
                });
            };
            unit_mapping.insert(symbol.clone(), ty.unit.clone());
        }

        let check_mapped = |symbol: &str, used_in: &str| {
            if desc.symbol_mapping.contains_key(symbol) {
                Ok(())
            } else {
                Err(invalid(format!(
                    "symbol '{symbol}' used in {used_in} is missing from symbol_mapping"
                )))
            }
        };

        if desc.connections.is_empty() {
            return Err(invalid("no connections declared".to_string()));
        }
        for (idx, connection) in desc.connections.iter().enumerate() {
            if connection.inputs.is_empty() || connection.outputs.is_empty() {
                return Err(invalid(format!(
                    "connection {idx} needs at least one input and one output"
                )));
            }
            for symbol in connection.inputs.iter().chain(&connection.outputs) {
                check_mapped(symbol.as_str(), "connections")?;
            }
        }

        let rule = match (desc.equations.is_empty(), &desc.custom) {
            (false, None) => {
                let mut equations = Vec::with_capacity(desc.equations.len());
                for text in &desc.equations {
                    let equation =
                        parse_equation(text).map_err(|source| CatalogLoadError::InvalidEquation {
                            model: name.clone(),
                            text: text.clone(),
                            source,
                        })?;
                    for symbol in equation.free_symbols() {
                        check_mapped(symbol.as_str(), "equations")?;
                    }
                    equations.push(equation);
                }
                EvaluationRule::Equations(equations)
            }
            (true, Some(key)) => match CustomRule::lookup(key) {
                Some(rule) => EvaluationRule::Custom(rule),
                None => {
                    return Err(CatalogLoadError::UnknownCustomRule {
                        model: name.clone(),
                        key: key.clone(),
                    });
                }
            },
            (false, Some(_)) => {
                return Err(invalid(
                    "both equations and a custom rule are given".to_string(),
                ));
            }
            (true, None) => {
                return Err(invalid(
                    "neither equations nor a custom rule are given".to_string(),
                ));
            }
        };

        let mut constraints = BTreeMap::new();
        for (symbol, text) in &desc.constraints {
            check_mapped(symbol.as_str(), "constraints")?;
            let expr = parse_expr(text).map_err(|source| CatalogLoadError::InvalidEquation {
                model: name.clone(),
                text: text.clone(),
                source,
            })?;
            if !expr.is_boolean() {
                return Err(invalid(format!(
                    "constraint on '{symbol}' is not a predicate: `{text}`"
                )));
            }
            if expr.free_symbols().iter().any(|s| s != symbol) {
                return Err(invalid(format!(
                    "constraint on '{symbol}' may only reference '{symbol}': `{text}`"
                )));
            }
            constraints.insert(
                symbol.clone(),
                Constraint {
                    symbol: symbol.clone(),
                    expr,
                },
            );
        }

        let mut test_data = Vec::with_capacity(desc.test_data.len());
        for case in &desc.test_data {
            let convert = |values: &BTreeMap<String, ValueRepr>| {
                values
                    .iter()
                    .map(|(symbol, repr)| -> Result<(String, Value), CatalogLoadError> {
                        check_mapped(symbol.as_str(), "test_data")?;
                        let value = repr.to_value().map_err(&invalid)?;
                        Ok((symbol.clone(), value))
                    })
                    .collect::<Result<BTreeMap<_, _>, CatalogLoadError>>()
            };
            test_data.push(TestCase {
                inputs: convert(&case.inputs)?,
                outputs: convert(&case.outputs)?,
            });
        }

        Ok(Self {
            name: desc.name,
            title: desc.title,
            tags: desc.tags,
            references: desc.references,
            description: desc.description,
            symbol_mapping: desc.symbol_mapping,
            unit_mapping,
            connections: desc.connections,
            constraints,
            rule,
            test_data,
        })
    }

    /// Short stable identifier: the first hex characters of the SHA-256 of the name.
    pub fn model_id(&self) -> String {
        let digest = Sha256::digest(self.name.as_bytes());
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        hex[..MODEL_ID_LEN].to_string()
    }

    /// Canonical property type of a local symbol.
    pub fn property_of(&self, symbol: &str) -> Option<&str> {
        self.symbol_mapping.get(symbol).map(String::as_str)
    }

    /// Unit the model's equations expect for a local symbol.
    pub fn unit_of(&self, symbol: &str) -> Option<&Unit> {
        self.unit_mapping.get(symbol)
    }

    /// Whether `value` passes the constraint declared for `symbol`.
    ///
    /// Symbols without a constraint accept everything. Values that cannot be expressed
    /// as a scalar in the model unit, or whose predicate fails to evaluate, are rejected.
    pub fn satisfies_constraint(&self, symbol: &str, value: &Quantity) -> bool {
        let Some(constraint) = self.constraints.get(symbol) else {
            return true;
        };
        let Some(unit) = self.unit_of(symbol) else {
            return false;
        };

        let magnitude = match value.magnitude_in(unit) {
            Ok(Value::Scalar(x)) => x,
            Ok(Value::Matrix(_)) => return false,
            Err(e) => {
                trace!("{}: constraint on '{symbol}' rejects value: {e}", self.name);
                return false;
            }
        };

        let bindings = BTreeMap::from([(constraint.symbol.clone(), magnitude)]);
        constraint.expr.eval_bool(&bindings).unwrap_or(false)
    }

    /// Replay `test_data` through the evaluation rule.
    ///
    /// Returns true when every case produces all of its expected outputs within a
    /// relative tolerance. A model without test data passes.
    pub fn self_test(&self, settings: &SolverSettings) -> bool {
        self.test_data.iter().all(|case| {
            let inputs: BTreeMap<String, SymbolInput> = case
                .inputs
                .iter()
                .map(|(symbol, value)| (symbol.clone(), SymbolInput::Bare(value.clone())))
                .collect();

            match self.evaluate(&inputs, settings) {
                EvaluationOutcome::Success(outputs) => {
                    case.outputs.iter().all(|(symbol, expected)| {
                        outputs.get(symbol).is_some_and(|actual| {
                            actual.value.relative_eq(expected, SELF_TEST_TOLERANCE)
                        })
                    })
                }
                EvaluationOutcome::Failure(_) => false,
            }
        })
    }
}
