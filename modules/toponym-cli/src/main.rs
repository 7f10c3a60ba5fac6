use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toponym_common::{DisambiguationConfig, Document, LocationAnnotation};
use toponym_disambiguation::{Disambiguator, LocationDisambiguation, StrategyKind};

#[derive(Parser)]
#[command(name = "toponym", about = "Resolve location mentions to gazetteer entries")]
struct Cli {
    /// Path to a TOML config file (defaults plus TOPONYM_* overrides when absent)
    #[arg(long, global = true, env = "TOPONYM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Disambiguate JSON documents and print one result per document
    Disambiguate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// none, baseline or heuristic; classifier strategies need a trained model
        #[arg(long, default_value = "heuristic")]
        strategy: StrategyKind,

        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Print the JSON schema of the input document format
    Schema,
}

#[derive(Serialize)]
struct DocumentResult<'a> {
    file: String,
    strategy: StrategyKind,
    annotations: &'a [LocationAnnotation],
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("toponym=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Disambiguate {
            files,
            strategy,
            pretty,
        } => {
            config.log_summary();
            let disambiguator = Disambiguator::from_kind(strategy, &config, None)
                .with_context(|| format!("Cannot run strategy '{strategy}' from the command line"))?;
            info!(strategy = %strategy, documents = files.len(), "Disambiguating");
            for path in &files {
                let document = read_document(path)?;
                let annotations = disambiguator
                    .disambiguate(&document.text, &document.candidates)
                    .with_context(|| format!("Failed to disambiguate {}", path.display()))?;
                info!(
                    file = %path.display(),
                    mentions = document.candidates.len(),
                    annotations = annotations.len(),
                    "Document done"
                );
                let result = DocumentResult {
                    file: path.display().to_string(),
                    strategy,
                    annotations: &annotations,
                };
                let line = if pretty {
                    serde_json::to_string_pretty(&result)?
                } else {
                    serde_json::to_string(&result)?
                };
                writeln!(out, "{line}")?;
            }
        }
        Command::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            write!(out, "{rendered}")?;
        }
        Command::Schema => {
            let schema = schemars::schema_for!(Document);
            writeln!(out, "{}", serde_json::to_string_pretty(&schema)?)?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DisambiguationConfig> {
    let config = match path {
        Some(path) => {
            info!(config = %path.display(), "Loading config");
            DisambiguationConfig::load(path)?.with_env_overrides()?
        }
        None => DisambiguationConfig::from_env()?,
    };
    Ok(config)
}

fn read_document(path: &Path) -> Result<Document> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse document: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn strategy_flag_parses() {
        let cli = Cli::try_parse_from(["toponym", "disambiguate", "a.json", "--strategy", "baseline"]).unwrap();
        match cli.command {
            Command::Disambiguate { files, strategy, pretty } => {
                assert_eq!(files, vec![PathBuf::from("a.json")]);
                assert_eq!(strategy, StrategyKind::Baseline);
                assert!(!pretty);
            }
            _ => panic!("expected disambiguate"),
        }
        assert!(Cli::try_parse_from(["toponym", "disambiguate", "a.json", "--strategy", "magic"]).is_err());
        assert!(Cli::try_parse_from(["toponym", "disambiguate"]).is_err());
    }

    #[test]
    fn config_renders_as_loadable_toml() {
        let config = DisambiguationConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let back: DisambiguationConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn reads_fixture_document() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("toponym-disambiguation")
            .join("tests")
            .join("fixtures")
            .join("paris_france.json");
        let document = read_document(&path).unwrap();
        assert_eq!(document.candidates.len(), 3);
        assert!(read_document(Path::new("does/not/exist.json")).is_err());
    }
}
