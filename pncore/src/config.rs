use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use log::info;
use pnexpr::SolverSettings;
use pnunits::UnitRegistry;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Catalog, CatalogLoadReport},
    magic::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_CONFIG_PATH},
    utils::error::{PnError, PnResult},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let settings = SolverSettings::default();
        Self {
            tolerance: settings.tolerance,
            max_iterations: settings.max_iterations,
        }
    }
}

impl From<&SolverConfig> for SolverSettings {
    fn from(config: &SolverConfig) -> Self {
        SolverSettings {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

/// Extra units, each defined by a unit expression over already known units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    pub definitions: BTreeMap<String, String>,
}

/// Engine configuration.
///
/// ```toml
/// descriptor_dirs = ["/opt/propnet/descriptors"]
/// include_builtin = true
///
/// [solver]
/// tolerance = 1e-10
/// max_iterations = 200
///
/// [units.definitions]
/// kbar = "1000 bar"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Descriptor directories loaded after the builtin descriptors, in order.
    pub descriptor_dirs: Vec<PathBuf>,
    pub include_builtin: bool,
    pub solver: SolverConfig,
    pub units: UnitsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            descriptor_dirs: Vec::new(),
            include_builtin: true,
            solver: SolverConfig::default(),
            units: UnitsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Get the default path to the engine configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push(CONFIG_DIR_NAME);
        path.push(CONFIG_FILE_NAME);
        path
    }

    pub fn load_from_toml(path: &Path) -> PnResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        toml::from_str(&toml_str).map_err(|e| PnError::ConfigParseError {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Save the configuration, creating parent directories as needed.
    pub fn save_to_toml(&self, path: &Path) -> PnResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| PnError::ConfigSerializeError {
            source: e,
            file: path.display().to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings::from(&self.solver)
    }

    /// Default unit registry extended with the configured definitions.
    pub fn unit_registry(&self) -> PnResult<UnitRegistry> {
        let mut units = UnitRegistry::default();
        for (name, expr) in &self.units.definitions {
            units.define(name, expr)?;
        }
        Ok(units)
    }

    /// Build the catalog this configuration describes.
    ///
    /// Fails only if the unit definitions are invalid or a descriptor directory cannot be
    /// read. Skipped descriptors are listed in the returned report.
    pub fn build_catalog(&self) -> PnResult<(Catalog, CatalogLoadReport)> {
        let mut builder = Catalog::builder()
            .with_units(self.unit_registry()?)
            .with_solver(self.solver_settings());

        if self.include_builtin {
            builder = builder.add_builtin();
        }
        for dir in &self.descriptor_dirs {
            builder = builder.add_dir(dir)?;
        }

        let (catalog, report) = builder.build();
        info!(
            "Engine catalog ready ({} skipped descriptors)",
            report.len()
        );
        Ok((catalog, report))
    }
}
