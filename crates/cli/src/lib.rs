pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use macroquery_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "macroquery",
    about = "Ask natural-language questions against a macroeconomic dataset",
    after_help = "Examples:\n  macroquery ask \"What was the gdp of Switzerland in 2021?\"\n  macroquery schema\n  macroquery validate \"SELECT * FROM world_bank_data_2025\""
)]
pub struct Cli {
    /// Path to a macroquery.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV source file (overrides config; table name = file stem)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// SQLite database file (overrides config; omit for in-memory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the full question-answering pipeline")]
    Ask { question: String },
    #[command(about = "Print the schema text handed to the query generator")]
    Schema,
    #[command(about = "Run the plan-only validity check for a SQL query")]
    Validate { sql: String },
    #[command(about = "Execute a SQL query and print the rows as JSON")]
    Query { sql: String },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Ask { question } => commands::ask::run(&config, &question).await,
        Command::Schema => commands::schema::run(&config).await,
        Command::Validate { sql } => commands::validate::run(&config, &sql).await,
        Command::Query { sql } => commands::query::run(&config, &sql).await,
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, macroquery_core::ConfigError> {
    AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides {
            csv_path: cli.csv.clone(),
            db_path: cli.db.clone(),
            ..ConfigOverrides::default()
        },
    })
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
