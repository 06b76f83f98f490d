//! Data layer behind the patient dashboard.
//!
//! Load a patient source once through a [`DatasetHandle`], then derive the
//! dashboard's views from the resulting [`Table`]: value counts and
//! descriptive statistics ([`data::aggregate`]), single-column selections
//! ([`data::filter`]) and map points ([`data::geo`]). Nothing here renders.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::DashboardConfig;
pub use data::aggregate::{count_by, describe, DescriptiveStats, GroupSummary, Overview, Share};
pub use data::filter::{by_equality, selection_options, Selection};
pub use data::geo::{centroid, project, project_within, GeoBounds, GeoPoint, GeoProjection, GeoProjector};
pub use data::handle::DatasetHandle;
pub use data::loader::{load, load_with, ColumnNames, LoadedDataset, RowWarning};
pub use data::model::{Column, ColumnKind, Record, Table, Value};
pub use error::{AggregateError, ConfigError, LoadError};
pub use state::DashboardState;
