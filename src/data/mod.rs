//! Data layer: schema, loading, aggregation, filtering and map projection.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌───────────────┐
//!   │ loader/handle │  parse + validate once → LoadedDataset (Table + warnings)
//!   └───────────────┘
//!        │
//!        ├──────────────────────┐
//!        ▼                      ▼
//!   ┌───────────┐         ┌──────────┐
//!   │ aggregate │         │  filter  │  Selection → narrowed Table
//!   └───────────┘         └──────────┘
//!   counts, stats               │
//!                               ▼
//!                         ┌──────────┐
//!                         │   geo    │  Table → Vec<GeoPoint>
//!                         └──────────┘
//! ```

pub mod aggregate;
pub mod filter;
pub mod geo;
pub mod handle;
pub mod loader;
pub mod model;
