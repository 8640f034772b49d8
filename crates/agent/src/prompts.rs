//! Prompt text for the three LLM roles in the pipeline.
//!
//! The schema block handed to the query-generation prompt is the provider's
//! own `schema_text` output, so the prompt and the database can never drift
//! apart on column names.

pub fn query_generation(
    question: &str,
    dialect: &str,
    schema_text: &str,
    table_names: &[&str],
) -> String {
    format!(
        "You are an experienced data analyst. Your task is to come up with a \
         single SQL query using the {dialect} SQL dialect.\n\n\
         The query should be used to answer this question from a business user:\n\n\
         {question}\n\n\
         The queryable table(s): {tables}. Each table is described below as a \
         JSON block where `columns` maps every column name to its description \
         and type:\n\n\
         ```json\n{schema_text}\n```\n\n\
         Be sure to use correct column names. Reply with only the SQL query, \
         inside a ```sql fence.",
        tables = table_names.join(", "),
    )
}

pub fn query_regeneration(
    question: &str,
    dialect: &str,
    schema_text: &str,
    table_names: &[&str],
    rejected_sql: &str,
) -> String {
    format!(
        "The previous SQL query you produced was rejected by the {dialect} \
         query planner:\n\n\
         ```sql\n{rejected_sql}\n```\n\n\
         It likely misspells a keyword or references a table or column that \
         does not exist. Write a corrected query answering the question:\n\n\
         {question}\n\n\
         The queryable table(s): {tables}, described by:\n\n\
         ```json\n{schema_text}\n```\n\n\
         Reply with only the corrected SQL query, inside a ```sql fence.",
        tables = table_names.join(", "),
    )
}

pub fn answer_synthesis(question: &str, raw_data: &str) -> String {
    format!(
        "Reply to the user question:\n\n\
         {question}\n\n\
         The context data you have access to, as JSON rows returned by the \
         database, is:\n\n\
         ```json\n{raw_data}\n```\n\n\
         Answer concisely from this data only. If the rows are empty, say the \
         data does not cover the question."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_prompt_names_dialect_table_and_schema() {
        let prompt = query_generation(
            "What was the gdp of Testland in 2023?",
            "sqlite",
            "{\"table\": \"world_bank_data_2025\"}",
            &["world_bank_data_2025"],
        );

        assert!(prompt.contains("sqlite"));
        assert!(prompt.contains("world_bank_data_2025"));
        assert!(prompt.contains("What was the gdp of Testland in 2023?"));
    }

    #[test]
    fn regeneration_prompt_quotes_the_rejected_query() {
        let prompt = query_regeneration(
            "question",
            "sqlite",
            "{}",
            &["t"],
            "SELEC * FROM t",
        );
        assert!(prompt.contains("SELEC * FROM t"));
        assert!(prompt.contains("rejected"));
    }

    #[test]
    fn answer_prompt_embeds_the_raw_rows() {
        let prompt = answer_synthesis("question", "[{\"gdp\":1000.0}]");
        assert!(prompt.contains("[{\"gdp\":1000.0}]"));
    }
}
