use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::Config;
use crate::interpreter::engine::{stdlib, Block, Engine, Node, NodeRef};
use crate::interpreter::session::Session;
use crate::interpreter::tail_calls;

#[derive(Parser)]
#[command(name = "sqlscript")]
#[command(about = "sqlscript - run scripts with inline SQL on a continuation machine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Continuation stack capacity (overrides config file and env vars)
    #[arg(long, global = true)]
    pub max_frames: Option<usize>,

    /// Log filter, e.g. "sqlscript_core=debug" (RUST_LOG still wins)
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script given as a JSON syntax tree
    Run {
        /// Script file (JSON)
        file: PathBuf,

        /// Skip tail-call marking
        #[arg(long)]
        no_tail_calls: bool,
    },

    /// Read statements from stdin, one JSON node (or array of nodes) per line
    Repl,

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate before anything runs so config errors show first
    let config = Config::builder()
        .config_path(cli.config.as_deref().map(PathBuf::from))
        .max_frames(cli.max_frames)
        .log_filter(cli.log.clone())
        .build()?;
    init_tracing(&config.log.filter);

    match cli.command {
        Commands::Run {
            file,
            no_tail_calls,
        } => {
            let root = load_script(&file)?;
            let root = if no_tail_calls {
                root
            } else {
                tail_calls::optimize(&root)
            };

            let mut engine = Engine::new(config.engine.clone());
            stdlib::install(&mut engine);
            let outcome = engine.process(&root);
            engine.finish();

            // Script errors may carry non-Send values, so they travel as text
            let result = outcome
                .map_err(|e| anyhow::anyhow!("script {} failed: {}", file.display(), e))?;
            println!("{}", result);
        }

        Commands::Repl => {
            let mut session = Session::new(config.engine.clone());
            let stdin = std::io::stdin();
            for (number, line) in stdin.lock().lines().enumerate() {
                let line = line.context("failed to read stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                let statements = match parse_statements(&line) {
                    Ok(statements) => statements,
                    Err(e) => {
                        eprintln!("line {}: {:#}", number + 1, e);
                        continue;
                    }
                };
                match session.feed(statements) {
                    Ok(value) => println!("{}", value),
                    Err(e) => eprintln!("line {}: {}", number + 1, e),
                }
            }
            session.finish();
        }

        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("failed to render config")?;
            print!("{}", text);
        }
    }

    Ok(())
}

fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read a script; a top-level array is taken as the statements of a block
pub fn load_script(path: &Path) -> Result<NodeRef> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let statements =
        parse_statements(&text).with_context(|| format!("invalid script {}", path.display()))?;
    Ok(Rc::new(Node::Block(Rc::new(Block::new(statements)))))
}

fn parse_statements(text: &str) -> Result<Vec<NodeRef>> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    if json.is_array() {
        Ok(serde_json::from_value(json)?)
    } else {
        let node: NodeRef = serde_json::from_value(json)?;
        match &*node {
            Node::Block(block) => Ok(block.body.clone()),
            _ => Ok(vec![node]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_node_and_array() {
        let one = parse_statements(r#"{"t": "Int", "v": 7}"#).unwrap();
        assert_eq!(one.len(), 1);

        let many = parse_statements(r#"[{"t": "Null"}, {"t": "Str", "v": "x"}]"#).unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_block_is_flattened() {
        let stmts =
            parse_statements(r#"{"t": "Block", "body": [{"t": "Null"}, {"t": "Null"}]}"#).unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_statements("{").is_err());
        assert!(parse_statements(r#"{"t": "Nope"}"#).is_err());
    }
}
