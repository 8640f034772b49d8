pub mod ask;
pub mod query;
pub mod schema;
pub mod validate;

use anyhow::{Context, Result};
use macroquery_core::config::AppConfig;
use macroquery_core::schema::world_bank_2025_descriptions;
use macroquery_db::{SqliteDataProvider, StoreLocation};

/// Builds the provider every command shares: CSV from config, file-backed or
/// in-memory store, and the canonical World Bank column descriptions (columns
/// absent from the CSV are simply not matched).
pub(crate) async fn open_provider(config: &AppConfig) -> Result<SqliteDataProvider> {
    let store = match &config.data.db_path {
        Some(path) => StoreLocation::File(path.clone()),
        None => StoreLocation::InMemory,
    };
    SqliteDataProvider::connect(&config.data.csv_path, store, &world_bank_2025_descriptions())
        .await
        .with_context(|| {
            format!("could not load data from `{}`", config.data.csv_path.display())
        })
}
