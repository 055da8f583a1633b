//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - The weather record model and its invariants
//! - A pure query engine (filter, sort, group, aggregate) over record slices
//! - Field-selective export to JSON and `;`-separated CSV
//! - Configuration and the Open-Meteo provider that feeds the pipeline
//!
//! It is used by `meteo-cli`, but the query and export stages do no terminal I/O and
//! can be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod export;
pub mod fields;
pub mod model;
pub mod provider;
pub mod query;

pub use config::{Config, ExportConfig, LocationConfig};
pub use error::MeteoError;
pub use export::{ExportFormat, encode, export_to_path};
pub use fields::{Field, FieldValue, Projection};
pub use model::{
    Condition, Coordinates, DayPeriod, ForecastRequest, ForecastSet, Location, WeatherRecord, Zone,
};
pub use provider::{WeatherProvider, provider_from_config};
pub use query::{Aggregate, Page, SortOrder, WeatherQueryExt};
