use anyhow::{Context, Result};
use macroquery_core::config::AppConfig;
use macroquery_db::DataProvider;

pub async fn run(config: &AppConfig) -> Result<String> {
    let provider = super::open_provider(config).await?;
    let text = provider.schema_text();
    provider.close().await.context("could not close data provider")?;
    Ok(text)
}
