//! Helpers for handling raw markdown coming back from an LLM.

/// Strips a surrounding triple-backtick fence from a SQL code block.
///
/// The fence must open on the first line (` ```sql ` or bare ` ``` `) and
/// close on the last line. Input without a matching fence pair is returned
/// unchanged apart from outer whitespace trimming.
pub fn extract_sql(markdown: &str) -> String {
    let trimmed = markdown.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    let opens = lines.first().is_some_and(|line| line.trim_start().starts_with("```"));
    let closes = lines.len() >= 2 && lines.last().is_some_and(|line| line.trim() == "```");

    if opens && closes {
        lines[1..lines.len() - 1].join("\n")
    } else {
        trimmed.to_string()
    }
}
