use anyhow::{Context, Result};
use macroquery_core::config::AppConfig;
use macroquery_core::markdown::extract_sql;
use macroquery_db::DataProvider;

pub async fn run(config: &AppConfig, sql: &str) -> Result<String> {
    let provider = super::open_provider(config).await?;
    let sql = extract_sql(sql);
    let verdict = provider.validate_query(&sql).await;
    provider.close().await.context("could not close data provider")?;

    let verdict = verdict.context("validation failed to run")?;
    Ok(if verdict { "valid".to_string() } else { "invalid".to_string() })
}
