//! Single-pass derivation of new property instances from the models of the catalog.
pub mod assignments;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use either::Either;
use log::{debug, info, trace};
use petgraph::stable_graph::NodeIndex;
use uuid::Uuid;

use crate::{
    catalog::model::Model,
    derivation::assignments::Assignments,
    evaluator::{EvaluationOutcome, SymbolInput},
    graph::{PropertyGraph, instance::PropertyInstance, material::Material},
    utils::error::{EvaluationFailure, PnResult},
};

/// Summary of one derivation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationReport {
    /// Names of the models reachable from the active property types.
    pub candidate_models: Vec<String>,
    /// Number of input assignments handed to the evaluator.
    pub assignments: usize,
    /// Ids of the instances created by the pass, in creation order.
    pub created: Vec<Uuid>,
    /// Failed evaluation attempts. None of them aborted the pass.
    pub failures: Vec<EvaluationFailure>,
}

impl DerivationReport {
    /// True when the pass left the graph unchanged.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

impl PropertyGraph {
    /// Run one derivation pass over the graph.
    ///
    /// The active instances are those owned by `material` (every instance of the graph if
    /// `None`), restricted to the types in `type_filter` when given. Every model consuming
    /// an active type is evaluated on every combination of active instances covering the
    /// inputs of one of its connections. Each output becomes a new instance, owned by
    /// `material` when the pass is scoped.
    ///
    /// Instances created by the pass are not used as inputs during the same pass, and
    /// nothing is deduplicated: running the pass twice on the same data creates the same
    /// values twice.
    ///
    /// Only a scope material that cannot be uniquely located is an error. Failed model
    /// evaluations are recorded in the report.
    pub fn evaluate(
        &mut self,
        mut material: Option<&mut Material>,
        type_filter: Option<&BTreeSet<String>>,
    ) -> PnResult<DerivationReport> {
        let scope = match material.as_deref() {
            Some(m) => Some(self.find_material(m.id())?),
            None => None,
        };

        let mut report = DerivationReport::default();
        let pending = self.derive(scope, type_filter, &mut report);

        for instance in pending {
            let id = instance.id;
            match material.as_deref_mut() {
                Some(m) => {
                    let instance = instance.owned_by(m.id());
                    self.insert_instance(instance.clone(), scope)?;
                    m.add_instance(instance);
                }
                None => {
                    self.insert_instance(instance, None)?;
                }
            }
            report.created.push(id);
        }

        info!(
            "Derivation pass: {} candidate models, {} assignments, {} new instances, {} failures",
            report.candidate_models.len(),
            report.assignments,
            report.created.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Read-only half of a pass: compute every new instance without touching the graph.
    fn derive(
        &self,
        scope: Option<NodeIndex>,
        type_filter: Option<&BTreeSet<String>>,
        report: &mut DerivationReport,
    ) -> Vec<PropertyInstance> {
        let active = match scope {
            Some(node) => Either::Left(self.owned_instance_nodes(node).into_iter()),
            None => Either::Right(self.instance_nodes()),
        };

        // Property type -> active instances of that type, in insertion order.
        let mut index: BTreeMap<&str, Vec<&PropertyInstance>> = BTreeMap::new();
        for instance in active.filter_map(|node| self.instance_at(node)) {
            if type_filter.is_some_and(|filter| !filter.contains(&instance.property)) {
                continue;
            }
            index
                .entry(instance.property.as_str())
                .or_default()
                .push(instance);
        }

        let candidates: BTreeMap<&str, &Arc<Model>> = index
            .keys()
            .flat_map(|ty| self.models_consuming(ty))
            .map(|model| (model.name.as_str(), model))
            .collect();
        report.candidate_models = candidates.keys().map(|name| name.to_string()).collect();

        let mut pending = Vec::new();
        for model in candidates.values() {
            self.derive_with(model, &index, report, &mut pending);
        }
        pending
    }

    fn derive_with(
        &self,
        model: &Model,
        index: &BTreeMap<&str, Vec<&PropertyInstance>>,
        report: &mut DerivationReport,
        pending: &mut Vec<PropertyInstance>,
    ) {
        let settings = self.catalog().solver();

        for (n, connection) in model.connections.iter().enumerate() {
            let lists: Vec<Vec<&PropertyInstance>> = connection
                .inputs
                .iter()
                .map(|symbol| {
                    let Some(candidates) = model.property_of(symbol).and_then(|ty| index.get(ty))
                    else {
                        return Vec::new();
                    };
                    candidates
                        .iter()
                        .copied()
                        .filter(|instance| model.satisfies_constraint(symbol, &instance.value))
                        .collect()
                })
                .collect();

            let assignments = Assignments::new(&lists);
            if assignments.is_empty() {
                trace!("{}: connection {n} has no applicable inputs", model.name);
                continue;
            }
            debug!(
                "{}: connection {n} has {} input assignments",
                model.name,
                assignments.total()
            );

            for tuple in assignments {
                report.assignments += 1;
                let inputs: BTreeMap<String, SymbolInput> = connection
                    .inputs
                    .iter()
                    .zip(tuple.iter())
                    .map(|(symbol, instance)| {
                        (symbol.clone(), SymbolInput::Quantity(instance.value.clone()))
                    })
                    .collect();
                trace!(
                    "{}: evaluating with {}",
                    model.name,
                    tuple
                        .iter()
                        .map(|i| i.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );

                match model.evaluate(&inputs, settings) {
                    EvaluationOutcome::Success(outputs) => {
                        for (symbol, value) in outputs {
                            let Some(property) = model.property_of(&symbol) else {
                                continue;
                            };
                            if let Err(e) = self.validate_value(property, &value) {
                                report.failures.push(EvaluationFailure::Evaluation {
                                    model: model.name.clone(),
                                    message: e.to_string(),
                                });
                                continue;
                            }
                            pending.push(PropertyInstance::new(property, value));
                        }
                    }
                    EvaluationOutcome::Failure(failure) => {
                        debug!("{failure}");
                        report.failures.push(failure);
                    }
                }
            }
        }
    }
}
