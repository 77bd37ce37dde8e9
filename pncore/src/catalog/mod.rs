//! Immutable catalog of property types and models.
//!
//! Descriptors are TOML documents. A catalog is assembled once through a
//! [`CatalogBuilder`] from any mix of the shipped descriptors ([`Catalog::builtin`]),
//! descriptor directories ([`Catalog::load_dir`]) and in-memory sources. Property types
//! are resolved before models, whatever order the sources were added in.
//!
//! Loading never aborts on a bad entry: each problem becomes a [`CatalogLoadError`] in the
//! returned [`CatalogLoadReport`], is logged with `warn!`, and the entry is skipped.
pub mod builtin;
pub mod custom;
pub mod model;
pub mod property;

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info, warn};
use pnexpr::SolverSettings;
use pnunits::UnitRegistry;

use crate::{
    catalog::{
        model::{Model, ModelDescriptor},
        property::{PropertyType, PropertyTypeDescriptor},
    },
    magic::{DESCRIPTOR_EXTENSION, MODELS_DIR, SYMBOLS_DIR},
    utils::error::{CatalogLoadError, EntryKind, PnResult},
};

/// Text of one descriptor together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorSource {
    pub kind: EntryKind,
    /// Path or logical name; its file stem must match the name of a property type.
    pub origin: String,
    pub text: String,
}

impl DescriptorSource {
    pub fn property_type(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::PropertyType,
            origin: origin.into(),
            text: text.into(),
        }
    }

    pub fn model(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Model,
            origin: origin.into(),
            text: text.into(),
        }
    }

    fn stem(&self) -> Option<&str> {
        Path::new(&self.origin).file_stem().and_then(|s| s.to_str())
    }
}

/// Problems met while building a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogLoadReport {
    pub errors: Vec<CatalogLoadError>,
}

impl CatalogLoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogLoadError> {
        self.errors.iter()
    }

    fn record(&mut self, error: CatalogLoadError) {
        warn!("Skipping catalog entry: {error}");
        self.errors.push(error);
    }
}

/// Read-only set of property types and models keyed by canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    units: Arc<UnitRegistry>,
    property_types: BTreeMap<String, Arc<PropertyType>>,
    models: BTreeMap<String, Arc<Model>>,
    solver: SolverSettings,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Catalog of the descriptors shipped with this crate.
    pub fn builtin() -> (Self, CatalogLoadReport) {
        Self::builder().add_builtin().build()
    }

    /// Catalog of the descriptors found under `dir` (`symbols/**/*.toml`, `models/*.toml`).
    pub fn load_dir(dir: impl AsRef<Path>) -> PnResult<(Self, CatalogLoadReport)> {
        Ok(Self::builder().add_dir(dir)?.build())
    }

    pub fn units(&self) -> &Arc<UnitRegistry> {
        &self.units
    }

    pub fn solver(&self) -> &SolverSettings {
        &self.solver
    }

    pub fn property_type(&self, name: &str) -> Option<&Arc<PropertyType>> {
        self.property_types.get(name)
    }

    pub fn property_types(&self) -> impl Iterator<Item = &Arc<PropertyType>> {
        self.property_types.values()
    }

    pub fn model(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.get(name)
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.values()
    }

    /// Number of models using each tag.
    pub fn model_tags(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.models.values().flat_map(|m| &m.tags) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Collects descriptor sources and resolves them into a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    sources: Vec<DescriptorSource>,
    units: Option<UnitRegistry>,
    solver: SolverSettings,
    pending: Vec<CatalogLoadError>,
}

impl CatalogBuilder {
    pub fn add_source(mut self, source: DescriptorSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn add_sources(mut self, sources: impl IntoIterator<Item = DescriptorSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn add_builtin(self) -> Self {
        self.add_sources(builtin::sources())
    }

    /// Queue every descriptor under `dir`. Only an unreadable `dir` itself is an error;
    /// unreadable files are reported when the catalog is built.
    pub fn add_dir(mut self, dir: impl AsRef<Path>) -> PnResult<Self> {
        let dir = dir.as_ref();
        if !fs::metadata(dir)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", dir.display()),
            )
            .into());
        }

        let mut symbol_files = Vec::new();
        let symbols_dir = dir.join(SYMBOLS_DIR);
        if symbols_dir.is_dir() {
            collect_descriptor_files(&symbols_dir, true, &mut symbol_files)?;
        }

        let mut model_files = Vec::new();
        let models_dir = dir.join(MODELS_DIR);
        if models_dir.is_dir() {
            collect_descriptor_files(&models_dir, false, &mut model_files)?;
        }

        debug!(
            "Found {} property type and {} model descriptors in {}",
            symbol_files.len(),
            model_files.len(),
            dir.display()
        );

        for (kind, files) in [
            (EntryKind::PropertyType, symbol_files),
            (EntryKind::Model, model_files),
        ] {
            for file in files {
                let origin = file.display().to_string();
                match fs::read_to_string(&file) {
                    Ok(text) => self.sources.push(DescriptorSource { kind, origin, text }),
                    Err(e) => self.pending.push(CatalogLoadError::Io {
                        file: origin,
                        message: e.to_string(),
                    }),
                }
            }
        }

        Ok(self)
    }

    pub fn with_units(mut self, units: UnitRegistry) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn build(self) -> (Catalog, CatalogLoadReport) {
        let units = self.units.unwrap_or_default();
        let mut report = CatalogLoadReport::default();
        for error in self.pending {
            report.record(error);
        }

        let (type_sources, model_sources): (Vec<_>, Vec<_>) = self
            .sources
            .into_iter()
            .partition(|s| s.kind == EntryKind::PropertyType);

        let mut property_types: BTreeMap<String, Arc<PropertyType>> = BTreeMap::new();
        for source in &type_sources {
            match load_property_type(source, &units) {
                Ok(property) => insert_unique(
                    &mut property_types,
                    property.name.clone(),
                    property,
                    source,
                    &mut report,
                ),
                Err(e) => report.record(e),
            }
        }

        let mut models: BTreeMap<String, Arc<Model>> = BTreeMap::new();
        for source in &model_sources {
            match load_model(source, &property_types) {
                Ok(model) => insert_unique(
                    &mut models,
                    model.name.clone(),
                    model,
                    source,
                    &mut report,
                ),
                Err(e) => report.record(e),
            }
        }

        info!(
            "Loaded catalog with {} property types and {} models ({} entries skipped)",
            property_types.len(),
            models.len(),
            report.len()
        );

        let catalog = Catalog {
            units: Arc::new(units),
            property_types,
            models,
            solver: self.solver,
        };
        (catalog, report)
    }
}

/// Insert `entry` unless its name is taken. Re-adding an identical entry is silent.
fn insert_unique<T: PartialEq>(
    map: &mut BTreeMap<String, Arc<T>>,
    key: String,
    entry: T,
    source: &DescriptorSource,
    report: &mut CatalogLoadReport,
) {
    match map.get(&key) {
        None => {
            map.insert(key, Arc::new(entry));
        }
        Some(existing) if **existing == entry => {
            debug!("Ignoring identical redefinition of '{key}' from {}", source.origin);
        }
        Some(_) => report.record(CatalogLoadError::Duplicate {
            kind: source.kind,
            name: key,
            file: source.origin.clone(),
        }),
    }
}

fn load_property_type(
    source: &DescriptorSource,
    units: &UnitRegistry,
) -> Result<PropertyType, CatalogLoadError> {
    let desc: PropertyTypeDescriptor =
        toml::from_str(&source.text).map_err(|e| CatalogLoadError::Parse {
            file: source.origin.clone(),
            message: e.to_string(),
        })?;

    if let Some(stem) = source.stem()
        && stem != desc.name
    {
        return Err(CatalogLoadError::NameMismatch {
            file: source.origin.clone(),
            name: desc.name,
            stem: stem.to_string(),
        });
    }

    PropertyType::from_descriptor(desc, units)
}

fn load_model(
    source: &DescriptorSource,
    property_types: &BTreeMap<String, Arc<PropertyType>>,
) -> Result<Model, CatalogLoadError> {
    let desc: ModelDescriptor =
        toml::from_str(&source.text).map_err(|e| CatalogLoadError::Parse {
            file: source.origin.clone(),
            message: e.to_string(),
        })?;

    Model::from_descriptor(desc, property_types)
}

/// Collect `*.toml` files under `dir`, sorted by path, descending into sub-directories
/// when `recursive` is set.
fn collect_descriptor_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> PnResult<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                collect_descriptor_files(&path, true, out)?;
            }
        } else if path.extension().is_some_and(|ext| ext == DESCRIPTOR_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}
