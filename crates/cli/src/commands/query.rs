use anyhow::{Context, Result};
use macroquery_core::config::AppConfig;
use macroquery_core::markdown::extract_sql;
use macroquery_db::DataProvider;

pub async fn run(config: &AppConfig, sql: &str) -> Result<String> {
    let provider = super::open_provider(config).await?;
    let sql = extract_sql(sql);
    let rows = provider.fetch_data(&sql).await;
    provider.close().await.context("could not close data provider")?;

    let rows = rows.context("query failed")?;
    serde_json::to_string_pretty(&rows).context("could not serialize rows")
}
