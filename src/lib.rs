//! Labelled training catalogues for X-ray source classification.
//!
//! Stacks labelled catalogues, cross-matches them against an X-ray catalogue,
//! AllWISE and Gaia, and derives flux-ratio, colour and astrometric features.

pub mod config;
pub mod data;
pub mod photometry;
pub mod pipeline;

pub use config::{CatalogueSpec, Config, ConfigError};
pub use data::model::{Column, ColumnKind, Table, TableError};
pub use pipeline::crossmatch::{CrossMatcher, MatchError, MatchJob, Stilts};
pub use pipeline::{Pipeline, RunPaths, Stage};
