//! Evaluation of a single model on a set of symbol values.
//!
//! The evaluator never fails: conversion errors, unsolvable systems and custom rule
//! errors all come back as an [`EvaluationOutcome::Failure`].
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use pnexpr::{SolverSettings, solve_system};
use pnunits::{Quantity, Value};
use strum::{EnumIs, EnumTryAs};

use crate::{
    catalog::model::{EvaluationRule, Model},
    utils::error::EvaluationFailure,
};

/// Value supplied for one model symbol.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum SymbolInput {
    /// Converted to the model unit of the symbol before use.
    Quantity(Quantity),
    /// Taken as already expressed in the model unit.
    Bare(Value),
}

impl From<Quantity> for SymbolInput {
    fn from(value: Quantity) -> Self {
        SymbolInput::Quantity(value)
    }
}

impl From<Value> for SymbolInput {
    fn from(value: Value) -> Self {
        SymbolInput::Bare(value)
    }
}

impl From<f64> for SymbolInput {
    fn from(value: f64) -> Self {
        SymbolInput::Bare(Value::Scalar(value))
    }
}

#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs)]
pub enum EvaluationOutcome {
    /// Output symbol -> value tagged with the model unit of that symbol.
    Success(BTreeMap<String, Quantity>),
    Failure(EvaluationFailure),
}

impl Model {
    fn failure(&self, message: impl Into<String>) -> EvaluationOutcome {
        EvaluationOutcome::Failure(EvaluationFailure::Evaluation {
            model: self.name.clone(),
            message: message.into(),
        })
    }

    /// True when `symbols` covers the inputs of at least one connection.
    pub fn accepts_symbols<'a>(&self, symbols: impl IntoIterator<Item = &'a str>) -> bool {
        let symbols: BTreeSet<&str> = symbols.into_iter().collect();
        self.connections.iter().any(|connection| {
            connection
                .inputs
                .iter()
                .all(|input| symbols.contains(input.as_str()))
        })
    }

    /// Evaluate the model.
    ///
    /// 1. Quantities are converted to the model unit of their symbol; bare values pass through.
    /// 2. The supplied symbols must cover the inputs of some connection, otherwise the
    ///    outcome is [`EvaluationFailure::UnsupportedInputs`].
    /// 3. The custom rule or the equation system is run. Unknowns without a solution are
    ///    omitted from the outputs.
    /// 4. Every output is tagged with the model unit of its symbol.
    pub fn evaluate(
        &self,
        inputs: &BTreeMap<String, SymbolInput>,
        settings: &SolverSettings,
    ) -> EvaluationOutcome {
        let mut values = BTreeMap::new();
        for (symbol, input) in inputs {
            let Some(unit) = self.unit_of(symbol) else {
                debug!("{}: ignoring unknown symbol '{symbol}'", self.name);
                continue;
            };

            let value = match input {
                SymbolInput::Quantity(q) => match q.magnitude_in(unit) {
                    Ok(value) => value,
                    Err(e) => return self.failure(format!("symbol '{symbol}': {e}")),
                },
                SymbolInput::Bare(value) => value.clone(),
            };
            values.insert(symbol.clone(), value);
        }

        if !self.accepts_symbols(values.keys().map(String::as_str)) {
            return EvaluationOutcome::Failure(EvaluationFailure::UnsupportedInputs {
                model: self.name.clone(),
                symbols: inputs.keys().cloned().collect(),
            });
        }

        let outputs = match &self.rule {
            EvaluationRule::Custom(rule) => match rule.apply(&values) {
                Ok(outputs) => outputs,
                Err(message) => return self.failure(message),
            },
            EvaluationRule::Equations(equations) => {
                let mut known = BTreeMap::new();
                for (symbol, value) in &values {
                    let Some(x) = value.as_scalar() else {
                        return self.failure(format!(
                            "symbol '{symbol}' is not a scalar and cannot enter equations"
                        ));
                    };
                    known.insert(symbol.clone(), x);
                }

                match solve_system(equations, &known, settings) {
                    Ok(solved) => solved
                        .into_iter()
                        .map(|(symbol, x)| (symbol, Value::Scalar(x)))
                        .collect(),
                    Err(e) => return self.failure(e.to_string()),
                }
            }
        };

        let mut tagged = BTreeMap::new();
        for (symbol, value) in outputs {
            if values.contains_key(&symbol) {
                continue;
            }
            let Some(unit) = self.unit_of(&symbol) else {
                debug!("{}: dropping output for unmapped symbol '{symbol}'", self.name);
                continue;
            };
            if !value.is_finite() {
                debug!("{}: dropping non-finite output '{symbol}'", self.name);
                continue;
            }
            trace!("{}: {symbol} = {value} {unit}", self.name);
            tagged.insert(symbol, Quantity::new(value, unit.clone()));
        }

        EvaluationOutcome::Success(tagged)
    }
}
