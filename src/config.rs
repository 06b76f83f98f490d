use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::geo::{GeoBounds, GeoProjector};
use crate::data::handle::DatasetHandle;
use crate::data::loader::ColumnNames;
use crate::error::ConfigError;

/// Dashboard settings, read from an optional TOML file. Every field has a
/// default, so an empty file (or no file) is valid.
///
/// ```toml
/// [data]
/// path = "salud_pacientes.csv"
///
/// [columns]
/// visits = "NumVisitas"
///
/// [geo.bounds]
/// min_lat = -4.2
/// max_lat = 12.5
///
/// [view]
/// preview_rows = 10
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub columns: ColumnNames,
    pub geo: GeoConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            path: PathBuf::from("salud_pacientes.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub bounds: GeoBounds,
    /// `[latitude, longitude]` used when there are no points to centre on.
    pub center: [f64; 2],
}

impl Default for GeoConfig {
    fn default() -> Self {
        GeoConfig {
            bounds: GeoBounds::WORLD,
            center: [4.6, -74.1],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub preview_rows: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig { preview_rows: 5 }
    }
}

impl DashboardConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A handle for the configured source with the configured headers.
    pub fn handle(&self) -> DatasetHandle {
        DatasetHandle::with_names(&self.data.path, self.columns.clone())
    }

    pub fn projector(&self) -> GeoProjector {
        GeoProjector::new(self.geo.bounds, self.columns.clone())
    }
}
