//! Codemorph CLI - structural refactoring for Python source files

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use codemorph::config::{self, CodemorphConfig};
use codemorph::transform::{
    expand_function_with, extract_function_with, remove_redundant_variables_with,
};
use codemorph::ui::{self, Icons};
use codemorph::CodeGraph;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codemorph")]
#[command(version)]
#[command(about = "Inline, outline and clean up Python code through a mutable code graph")]
#[command(long_about = r#"
Codemorph parses a Python file into a graph of syntax nodes, scopes and
name tokens, applies one transform and prints the resulting source.

Example usage:
  codemorph show app.py
  codemorph inline app.py --callee helper
  codemorph extract app.py --start 2 --end 4 --within main
  codemorph dce app.py --write
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputMode,

    /// Rewrite the file in place instead of printing the result
    #[arg(short, long, global = true)]
    write: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default codemorph.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show graph statistics and the token table
    Show {
        /// Python source file
        file: PathBuf,
    },

    /// Inline a call to a function defined earlier in the file
    Inline {
        /// Python source file
        file: PathBuf,

        /// Name of the called function
        #[arg(long)]
        callee: String,

        /// Line of the call (defaults to the first call)
        #[arg(long)]
        line: Option<u32>,
    },

    /// Move a statement range into a new function
    Extract {
        /// Python source file
        file: PathBuf,

        /// Index of the first statement
        #[arg(long)]
        start: usize,

        /// Index of the last statement (inclusive)
        #[arg(long)]
        end: usize,

        /// Function whose body holds the range (defaults to the module)
        #[arg(long)]
        within: Option<String>,

        /// Name of the new function
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove assignments whose target is never read
    Dce {
        /// Python source file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    fn is_human(self) -> bool {
        self == OutputMode::Text
    }
}

/// Print a JSON envelope for a successful command
fn emit_success(command: &str, data: impl Serialize) -> anyhow::Result<()> {
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn load_graph(path: &Path) -> anyhow::Result<CodeGraph> {
    CodeGraph::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Print or write back the transformed source, followed by the outcome
fn finish(
    cli: &Cli,
    command: &str,
    path: &Path,
    graph: &CodeGraph,
    outcome: impl Serialize,
) -> anyhow::Result<()> {
    let source = graph.to_source();
    if cli.write {
        std::fs::write(path, &source)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if cli.format.is_human() {
        if cli.write {
            ui::status(Icons::MOD, "Rewrote", &path.display().to_string());
        } else {
            print!("{}", source);
        }
        Ok(())
    } else {
        let source = if cli.write { None } else { Some(source) };
        emit_success(
            command,
            serde_json::json!({
                "file": path,
                "outcome": outcome,
                "source": source,
            }),
        )
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = match &cli.command {
        Commands::Init { .. } => CodemorphConfig::default(),
        _ => config::load_config(cli.config.as_deref())?.unwrap_or_default(),
    };

    match &cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            config::write_config(&path, &settings, *force)?;
            if cli.format.is_human() {
                ui::success(&format!("Wrote {}", path.display()));
            } else {
                emit_success("init", serde_json::json!({ "config": path }))?;
            }
        }

        Commands::Show { file } => {
            let graph = load_graph(file)?;
            let stats = graph.stats();

            if cli.format.is_human() {
                ui::header(&format!("Code graph for {}", file.display()));
                let generation = stats.generation.to_string();
                let nodes = stats.nodes.to_string();
                let functions = stats.functions.to_string();
                let scopes = stats.scopes.to_string();
                let tokens = stats.tokens.to_string();
                let occurrences = stats.occurrences.to_string();
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Generation", generation.as_str()),
                        ("Nodes", nodes.as_str()),
                        ("Functions", functions.as_str()),
                        ("Scopes", scopes.as_str()),
                        ("Tokens", tokens.as_str()),
                        ("Occurrences", occurrences.as_str()),
                    ])
                );
                ui::section(&format!("{} Tokens", Icons::STATS));
                println!("{}", ui::token_table(graph.tokens(), graph.scopes()));
            } else {
                emit_success(
                    "show",
                    serde_json::json!({
                        "file": file,
                        "stats": stats,
                        "scopes": graph.scopes().iter().collect::<Vec<_>>(),
                        "tokens": graph.tokens(),
                    }),
                )?;
            }
        }

        Commands::Inline { file, callee, line } => {
            let mut graph = load_graph(file)?;
            let calls = graph.find_calls(callee);
            let call = match line {
                Some(line) => calls.into_iter().find(|call| {
                    graph
                        .ast_node(*call)
                        .map(|node| node.line == Some(*line))
                        .unwrap_or(false)
                }),
                None => calls.into_iter().next(),
            };
            let Some(call) = call else {
                anyhow::bail!("no call to {} found in {}", callee, file.display());
            };

            let outcome = expand_function_with(&mut graph, call, &settings.inline)?;
            if cli.format.is_human() {
                for warning in &outcome.warnings {
                    ui::warn(&warning.to_string());
                }
            }
            finish(&cli, "inline", file, &graph, &outcome)?;
        }

        Commands::Extract {
            file,
            start,
            end,
            within,
            name,
        } => {
            let mut graph = load_graph(file)?;
            let parent = match within {
                Some(function) => *graph
                    .find_function_defs(function)
                    .first()
                    .with_context(|| format!("no function named {} in {}", function, file.display()))?,
                None => graph.root(),
            };

            let mut extract = settings.extract.clone();
            if let Some(name) = name {
                extract.function_name = name.clone();
            }
            let outcome = extract_function_with(&mut graph, parent, *start, *end, &extract)?;
            finish(&cli, "extract", file, &graph, &outcome)?;
        }

        Commands::Dce { file } => {
            let mut graph = load_graph(file)?;
            let report = remove_redundant_variables_with(&mut graph, &settings.dead_store)?;
            if cli.format.is_human() {
                if report.is_empty() {
                    ui::info("Dead stores", "none found");
                } else {
                    ui::summary_row("Removed:", &report.removed.join(", "));
                    ui::summary_row("Statements:", &report.statements.to_string());
                }
            }
            finish(&cli, "dce", file, &graph, &report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "codemorph", "inline", "app.py", "--callee", "f", "--line", "3", "--format", "json", "-w",
        ])
        .unwrap();
        assert!(cli.write);
        assert!(cli.format == OutputMode::Json);
        assert!(matches!(
            cli.command,
            Commands::Inline { ref callee, line: Some(3), .. } if callee == "f"
        ));
    }

    #[test]
    fn test_finish_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, "x = 1\ny = 2\nprint(y)\n").unwrap();

        let cli = Cli::try_parse_from(["codemorph", "--write", "dce", "app.py"]).unwrap();
        let mut graph = load_graph(&path).unwrap();
        let report = codemorph::remove_redundant_variables(&mut graph).unwrap();
        finish(&cli, "dce", &path, &graph, &report).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "y = 2\nprint(y)\n");
    }
}
