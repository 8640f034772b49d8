use std::sync::Arc;

use anyhow::{Context, Result};
use macroquery_agent::{OpenAiCompatClient, QueryPipeline};
use macroquery_core::config::AppConfig;
use macroquery_db::DataProvider;

pub async fn run(config: &AppConfig, question: &str) -> Result<String> {
    let provider = Arc::new(super::open_provider(config).await?);
    let llm = Arc::new(
        OpenAiCompatClient::from_config(&config.llm).context("could not build LLM client")?,
    );
    let pipeline = QueryPipeline::new(llm, provider.clone(), &config.pipeline);

    let outcome = pipeline.answer(question).await;
    provider.close().await.context("could not close data provider")?;
    let outcome = outcome.context("pipeline failed")?;

    if config.pipeline.expand_intermediate_results {
        Ok(format!(
            "{answer}\n\n-- query: {sql}\n-- rows: {rows}",
            answer = outcome.answer,
            sql = outcome.sql,
            rows = outcome.row_count,
        ))
    } else {
        Ok(outcome.answer)
    }
}
