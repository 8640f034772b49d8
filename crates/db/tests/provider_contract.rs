use std::path::PathBuf;
use std::sync::Arc;

use macroquery_core::schema::Value;
use macroquery_db::{DataError, DataProvider, SqliteDataProvider, StoreLocation};
use tempfile::TempDir;

fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write CSV fixture");
    path
}

async fn test_provider(dir: &TempDir) -> SqliteDataProvider {
    let csv = write_csv(dir, "test_data.csv", "country_name,year,gdp\nTestland,2023,1000.0\n");
    let db = StoreLocation::File(dir.path().join("test.db"));
    SqliteDataProvider::connect(&csv, db, &[]).await.expect("provider connects")
}

#[tokio::test]
async fn fetch_returns_every_loaded_row_with_every_column() {
    let dir = TempDir::new().expect("temp dir");
    let csv = write_csv(
        &dir,
        "economies.csv",
        "country_name,year,gdp\nTestland,2023,1000.0\nOtherland,2023,2000.0\nTestland,2022,900.5\n",
    );
    let provider = SqliteDataProvider::connect(&csv, StoreLocation::InMemory, &[])
        .await
        .expect("provider connects");

    let rows = provider.fetch_data("SELECT * FROM economies").await.expect("fetch succeeds");

    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), 3);
    }
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn table_is_named_after_the_csv_file_stem() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    assert_eq!(provider.data_sources().len(), 1);
    assert_eq!(provider.data_sources()[0].table_name(), "test_data");
    assert!(provider.validate_query("SELECT * FROM test_data").await.expect("validate runs"));
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn validate_query_accepts_a_well_formed_query() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let verdict = provider.validate_query("SELECT * FROM test_data").await.expect("validate runs");
    assert!(verdict);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn validate_query_rejects_misspelled_keywords() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let verdict = provider.validate_query("SELEC * FROM test_data").await.expect("validate runs");
    assert!(!verdict);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn validate_query_rejects_unknown_tables() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let verdict =
        provider.validate_query("SELECT * FROM non_existent_table").await.expect("validate runs");
    assert!(!verdict);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn validate_query_rejects_unknown_columns() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let verdict = provider
        .validate_query("SELECT non_existent_column FROM test_data")
        .await
        .expect("validate runs");
    assert!(!verdict);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn validation_does_not_execute_the_statement() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    // DELETE plans fine, so the verdict is positive, but the rows must
    // still be there afterwards.
    let verdict = provider.validate_query("DELETE FROM test_data").await.expect("validate runs");
    assert!(verdict);

    let rows = provider.fetch_data("SELECT * FROM test_data").await.expect("fetch succeeds");
    assert_eq!(rows.len(), 1);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn loaded_values_round_trip_unchanged() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let rows = provider
        .fetch_data("SELECT gdp FROM test_data WHERE country_name='Testland' AND year=2023")
        .await
        .expect("fetch succeeds");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("gdp"), Some(&Value::Real(1000.0)));
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn empty_cells_come_back_as_nulls() {
    let dir = TempDir::new().expect("temp dir");
    let csv = write_csv(&dir, "sparse.csv", "country_name,gdp\nTestland,\nOtherland,2000.0\n");
    let provider = SqliteDataProvider::connect(&csv, StoreLocation::InMemory, &[])
        .await
        .expect("provider connects");

    let rows = provider
        .fetch_data("SELECT gdp FROM sparse WHERE country_name='Testland'")
        .await
        .expect("fetch succeeds");

    assert_eq!(rows[0].get("gdp"), Some(&Value::Null));
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn malformed_query_surfaces_an_execution_error() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    let result = provider.fetch_data("SELEC * FROM test_data").await;

    assert!(matches!(result, Err(DataError::QueryExecution(_))));
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn missing_source_file_fails_construction() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("nope.csv");

    let result = SqliteDataProvider::connect(&missing, StoreLocation::InMemory, &[]).await;

    assert!(matches!(result, Err(DataError::Load { .. })));
}

#[tokio::test]
async fn close_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    provider.fetch_data("SELECT * FROM test_data").await.expect("fetch succeeds");
    provider.close().await.expect("first close succeeds");
    provider.close().await.expect("second close succeeds");
}

#[tokio::test]
async fn closed_provider_refuses_further_calls() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;
    provider.close().await.expect("close succeeds");

    let fetch = provider.fetch_data("SELECT * FROM test_data").await;
    let validate = provider.validate_query("SELECT * FROM test_data").await;

    assert!(matches!(fetch, Err(DataError::ProviderClosed)));
    assert!(matches!(validate, Err(DataError::ProviderClosed)));
}

#[tokio::test]
async fn close_without_any_query_never_raises() {
    let dir = TempDir::new().expect("temp dir");
    let provider = test_provider(&dir).await;

    assert_eq!(provider.connections_opened(), 0);
    provider.close().await.expect("close succeeds with no open connection");
}

#[tokio::test]
async fn concurrent_first_fetches_share_a_single_connection() {
    let dir = TempDir::new().expect("temp dir");
    let provider = Arc::new(test_provider(&dir).await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            provider.fetch_data("SELECT * FROM test_data").await
        }));
    }

    for handle in handles {
        let rows = handle.await.expect("task joins").expect("fetch succeeds");
        assert_eq!(rows.len(), 1);
    }
    assert_eq!(provider.connections_opened(), 1);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn in_memory_store_keeps_data_until_close() {
    let dir = TempDir::new().expect("temp dir");
    let csv = write_csv(&dir, "kept.csv", "country_name,gdp\nTestland,1000.0\n");
    let provider = SqliteDataProvider::connect(&csv, StoreLocation::InMemory, &[])
        .await
        .expect("provider connects");

    // The lazy query connection is a second connection to the same
    // shared-cache database; the bulk-loaded table must be visible there.
    let rows = provider.fetch_data("SELECT * FROM kept").await.expect("fetch succeeds");
    assert_eq!(rows.len(), 1);
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn independent_in_memory_providers_do_not_share_tables() {
    let dir = TempDir::new().expect("temp dir");
    let first_csv = write_csv(&dir, "first.csv", "a\n1\n");
    let second_csv = write_csv(&dir, "second.csv", "b\n2\n");

    let first = SqliteDataProvider::connect(&first_csv, StoreLocation::InMemory, &[])
        .await
        .expect("first provider connects");
    let second = SqliteDataProvider::connect(&second_csv, StoreLocation::InMemory, &[])
        .await
        .expect("second provider connects");

    assert!(first.validate_query("SELECT * FROM first").await.expect("validate runs"));
    assert!(!first.validate_query("SELECT * FROM second").await.expect("validate runs"));
    assert!(second.validate_query("SELECT * FROM second").await.expect("validate runs"));

    first.close().await.expect("close succeeds");
    second.close().await.expect("close succeeds");
}

#[tokio::test]
async fn schema_text_carries_descriptions_and_inferred_types() {
    let dir = TempDir::new().expect("temp dir");
    let csv = write_csv(&dir, "annotated.csv", "country_name,year,gdp\nTestland,2023,1000.0\n");
    let provider = SqliteDataProvider::connect(
        &csv,
        StoreLocation::InMemory,
        &[("gdp", "GDP figure."), ("year", "Year the data refers to.")],
    )
    .await
    .expect("provider connects");

    assert_eq!(provider.dialect(), "sqlite");
    let text = provider.schema_text();
    assert!(text.contains("\"table\": \"annotated\""));
    assert!(text.contains("GDP figure."));
    assert!(text.contains("\"type\": \"FLOAT\""));
    assert!(text.contains("\"type\": \"INTEGER\""));
    assert!(text.contains("\"type\": \"STRING\""));
    provider.close().await.expect("close succeeds");
}

#[tokio::test]
async fn reloading_replaces_an_existing_table() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("persistent.db");
    let csv = write_csv(&dir, "figures.csv", "gdp\n1.0\n2.0\n");

    let provider =
        SqliteDataProvider::connect(&csv, StoreLocation::File(db_path.clone()), &[])
            .await
            .expect("first load");
    provider.close().await.expect("close succeeds");

    // Second provider against the same file replaces the table instead of
    // appending to it.
    let csv = write_csv(&dir, "figures.csv", "gdp\n3.0\n");
    let provider = SqliteDataProvider::connect(&csv, StoreLocation::File(db_path), &[])
        .await
        .expect("second load");
    let rows = provider.fetch_data("SELECT * FROM figures").await.expect("fetch succeeds");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("gdp"), Some(&Value::Real(3.0)));
    provider.close().await.expect("close succeeds");
}
