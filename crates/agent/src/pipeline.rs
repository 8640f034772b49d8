use std::sync::Arc;

use macroquery_core::config::PipelineConfig;
use macroquery_core::markdown::extract_sql;
use macroquery_db::{DataError, DataProvider};
use thiserror::Error;

use crate::llm::LlmClient;
use crate::prompts;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("llm call failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("could not serialize result rows: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no valid query after {attempts} attempts (last candidate: `{last_sql}`)")]
    QueryRejected { attempts: u32, last_sql: String },
}

#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    pub answer: String,
    /// The query that actually ran, after fence stripping.
    pub sql: String,
    pub row_count: usize,
}

/// Sequential generation -> validation -> execution -> synthesis loop over a
/// shared data provider.
pub struct QueryPipeline {
    llm: Arc<dyn LlmClient>,
    provider: Arc<dyn DataProvider>,
    max_validation_attempts: u32,
}

impl QueryPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        provider: Arc<dyn DataProvider>,
        config: &PipelineConfig,
    ) -> Self {
        Self { llm, provider, max_validation_attempts: config.max_validation_attempts.max(1) }
    }

    pub async fn answer(&self, question: &str) -> Result<PipelineOutcome, PipelineError> {
        let dialect = self.provider.dialect();
        let schema_text = self.provider.schema_text();
        let table_names: Vec<&str> =
            self.provider.data_sources().iter().map(|source| source.table_name()).collect();

        let mut prompt = prompts::query_generation(question, dialect, &schema_text, &table_names);
        let mut last_sql = String::new();

        for attempt in 1..=self.max_validation_attempts {
            let raw = self.llm.complete(&prompt).await.map_err(PipelineError::Llm)?;
            let sql = extract_sql(&raw);
            tracing::debug!(
                event_name = "pipeline.query_generated",
                attempt,
                sql = %sql,
                "candidate query generated"
            );

            if !sql.trim().is_empty() && self.provider.validate_query(&sql).await? {
                return self.execute_and_synthesize(question, sql).await;
            }

            tracing::info!(
                event_name = "pipeline.query_rejected",
                attempt,
                sql = %sql,
                "planner rejected candidate query, regenerating"
            );
            last_sql = sql;
            prompt = prompts::query_regeneration(
                question,
                dialect,
                &schema_text,
                &table_names,
                &last_sql,
            );
        }

        Err(PipelineError::QueryRejected { attempts: self.max_validation_attempts, last_sql })
    }

    async fn execute_and_synthesize(
        &self,
        question: &str,
        sql: String,
    ) -> Result<PipelineOutcome, PipelineError> {
        let rows = self.provider.fetch_data(&sql).await?;
        let raw_data = serde_json::to_string_pretty(&rows)?;
        tracing::debug!(
            event_name = "pipeline.query_executed",
            sql = %sql,
            row_count = rows.len(),
            "query executed"
        );

        let answer = self
            .llm
            .complete(&prompts::answer_synthesis(question, &raw_data))
            .await
            .map_err(PipelineError::Llm)?;

        Ok(PipelineOutcome { answer, sql, row_count: rows.len() })
    }
}
