//! Error types for the dashboard data layer.
//!
//! Fatal problems are `Err` values. Row-level parse problems are not errors
//! at all: they become [`RowWarning`](crate::data::loader::RowWarning)s next
//! to the loaded table.

use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::Column;

/// Fatal load-time failures. Nothing can be rendered after one of these.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("cannot read {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
}

/// Caller errors from the aggregation functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("column '{0}' is not numeric")]
    NotNumeric(Column),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
