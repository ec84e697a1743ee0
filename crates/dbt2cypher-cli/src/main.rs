use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use dbt2cypher_core::Config;
use dbt2cypher_engine::PipelineOptions;

/// Environment fallback for the project path (also read from .env)
const PROJECT_PATH_ENV: &str = "DBT2CYPHER_PROJECT_PATH";

/// dbt2cypher - Extract dbt dependencies and convert to Cypher queries
#[derive(Parser)]
#[command(name = "dbt2cypher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the dbt project directory
    project_path: Option<PathBuf>,

    /// Output file for Cypher queries (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file (default: dbt2cypher.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip column-level nodes and lineage
    #[arg(long)]
    no_columns: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("dbt2cypher.toml").exists() {
        Config::from_file(Path::new("dbt2cypher.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    // CLI argument > config file > environment
    let project_path = cli
        .project_path
        .or(config.project_path)
        .or_else(|| std::env::var(PROJECT_PATH_ENV).ok().map(PathBuf::from))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no project path given: pass it as an argument, set it in \
                 dbt2cypher.toml, or export {}",
                PROJECT_PATH_ENV
            )
        })?;

    if cli.verbose {
        eprintln!(
            "{} {}",
            "Loading dbt project from:".cyan(),
            project_path.display()
        );
    }

    let options = PipelineOptions {
        include_columns: !cli.no_columns && config.include_columns,
    };

    let outcome = dbt2cypher_engine::run_with_options(&project_path, &options)?;

    for diag in &outcome.diagnostics {
        eprintln!(
            "{} [{}] {}",
            "warning:".yellow().bold(),
            diag.code,
            diag.message
        );
    }

    match cli.output.or(config.output) {
        Some(output_path) => {
            dbt2cypher_engine::write_script(&outcome.script, &output_path)?;
            if cli.verbose {
                eprintln!(
                    "{} {}",
                    "Cypher queries written to".green(),
                    output_path.display()
                );
            }
        }
        None => print!("{}", outcome.script),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
