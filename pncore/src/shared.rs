//! Thread-safe handle to a property graph.
//!
//! Every mutation holds the write lock for its whole duration, so a derivation pass
//! never interleaves with another pass or with material insertion and removal. Readers
//! either borrow the graph under the read lock or take an owned snapshot.
use std::{collections::BTreeSet, sync::Arc};

use parking_lot::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    derivation::DerivationReport,
    graph::{PropertyGraph, instance::PropertyInstance, material::Material},
    utils::error::PnResult,
};

#[derive(Debug, Clone)]
pub struct SharedPropertyGraph {
    inner: Arc<RwLock<PropertyGraph>>,
}

impl SharedPropertyGraph {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::from(PropertyGraph::new(catalog))
    }

    pub fn add_material(&self, material: &mut Material) -> PnResult<()> {
        self.inner.write().add_material(material)
    }

    pub fn remove_material(&self, material: &mut Material) -> PnResult<()> {
        self.inner.write().remove_material(material)
    }

    pub fn add_instance(&self, instance: PropertyInstance) -> PnResult<Uuid> {
        self.inner.write().add_instance(instance)
    }

    /// See [`PropertyGraph::evaluate`].
    pub fn evaluate(
        &self,
        material: Option<&mut Material>,
        type_filter: Option<&BTreeSet<String>>,
    ) -> PnResult<DerivationReport> {
        self.inner.write().evaluate(material, type_filter)
    }

    /// Owned copy of the current graph.
    pub fn snapshot(&self) -> PropertyGraph {
        self.inner.read().clone()
    }

    /// Run `f` with shared access to the graph.
    pub fn read<R>(&self, f: impl FnOnce(&PropertyGraph) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the graph.
    pub fn write<R>(&self, f: impl FnOnce(&mut PropertyGraph) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn read_guard(&self) -> RwLockReadGuard<'_, PropertyGraph> {
        self.inner.read()
    }
}

impl From<PropertyGraph> for SharedPropertyGraph {
    fn from(graph: PropertyGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }
}
