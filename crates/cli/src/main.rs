use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    macroquery_cli::run().await
}
