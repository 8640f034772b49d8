//! LLM-powered question answering over the macroquery data layer.
//!
//! The pipeline is a constrained loop around the data provider:
//! 1. **Query generation** (`prompts`) - phrase a SQL query from the question
//!    and the provider's schema text
//! 2. **Plan-only validation** - ask the provider whether the planner accepts
//!    the candidate; regenerate with feedback on a negative verdict
//! 3. **Execution** - fetch rows and serialize them to a JSON block
//! 4. **Answer synthesis** - ask the LLM to answer from the raw rows
//!
//! The LLM is strictly a translator. It never touches the database directly;
//! every query passes through the provider's validate/fetch contract.

pub mod llm;
pub mod pipeline;
pub mod prompts;

pub use llm::{LlmClient, OpenAiCompatClient};
pub use pipeline::{PipelineError, PipelineOutcome, QueryPipeline};
