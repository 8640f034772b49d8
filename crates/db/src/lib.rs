mod loader;
pub mod provider;

pub use provider::{DataError, DataProvider, SqliteDataProvider, StoreLocation};
