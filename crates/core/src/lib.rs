//! Shared domain types and configuration for macroquery.
//!
//! This crate stays free of I/O: it holds the configuration model, the table
//! schema descriptors and dynamically typed row values the data layer
//! produces, and the markdown fence-stripping helper the pipeline applies to
//! LLM output.

pub mod config;
pub mod markdown;
pub mod schema;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use schema::{schema_text, ColumnSpec, ColumnType, DataSource, Row, Value};
