use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::executor::{run_until_done, step, Context, RunError};
use crate::parser::{parse, Program};
use crate::tools::{GraphTool, ToolRegistry};

#[derive(Parser)]
#[command(name = "graphscript")]
#[command(about = "GraphScript - run automation scripts against graph tools", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script
    Run {
        /// Script file
        file: PathBuf,

        /// Wait for Enter before every instruction
        #[arg(long)]
        step: bool,

        /// Stop after this many instructions (overrides config)
        #[arg(long)]
        max_steps: Option<u64>,
    },

    /// Parse a script and report errors
    Check {
        /// Script file
        file: PathBuf,
    },

    /// Print the compiled instruction list as JSON
    Compile {
        /// Script file
        file: PathBuf,
    },

    /// List registered tools and their actions
    Tools,

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let max_steps = match &cli.command {
        Commands::Run { max_steps, .. } => *max_steps,
        _ => None,
    };

    // Load configuration before any command runs so errors surface first
    let config = Config::builder()
        .config_path(cli.config.clone())
        .max_steps(max_steps)
        .build()?;

    init_tracing(&config);

    let registry = ToolRegistry::global();
    if !registry.contains("graph") {
        registry.register(Arc::new(GraphTool::new()));
    }

    match cli.command {
        Commands::Run {
            file,
            step: single_step,
            ..
        } => {
            let program = load(&file).await?;
            let mut ctx = Context::with_registry(registry).on_log(|line| println!("{}", line));

            if single_step {
                run_stepping(&program, &mut ctx).await?;
            } else {
                match run_until_done(&program, &mut ctx, config.run_limits()).await {
                    Ok(executed) => {
                        tracing::debug!(executed, "run complete");
                    }
                    Err(RunError::StepLimitExceeded { limit }) => {
                        anyhow::bail!(
                            "stopped after {} instructions at line {}",
                            limit,
                            program
                                .instructions
                                .get(ctx.ip)
                                .map(|inst| inst.line)
                                .unwrap_or_default()
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Commands::Check { file } => {
            let program = load(&file).await?;
            println!(
                "✓ {}: {} instruction(s), version {}",
                file.display(),
                program.len(),
                &program.version_hash()[..12]
            );
        }

        Commands::Compile { file } => {
            let program = load(&file).await?;
            let json = serde_json::to_string_pretty(&program.instructions)?;
            println!("{}", json);
        }

        Commands::Tools => {
            let ids = registry.ids();
            if ids.is_empty() {
                println!("No tools registered");
                return Ok(());
            }
            for id in ids {
                let Some(tool) = registry.lookup(&id) else {
                    continue;
                };
                println!("{}", id);
                for action in tool.list_actions() {
                    println!(
                        "  {}({}) - {}",
                        action.name,
                        action.arg_names.join(", "),
                        action.description
                    );
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    // A host may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn load(path: &Path) -> Result<Program> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&source)
        .into_result()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Single-step mode: show each line and wait for Enter before executing it
async fn run_stepping(program: &Program, ctx: &mut Context) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while !ctx.status.is_terminal() {
        if let Some(inst) = program.instructions.get(ctx.ip) {
            let text = program
                .source
                .lines()
                .nth(inst.line.saturating_sub(1))
                .unwrap_or_default();
            eprint!("{:>4} | {}  [enter]", inst.line, text.trim_end());
            if stdin.next_line().await?.is_none() {
                eprintln!();
                ctx.pause();
                return Ok(());
            }
        }
        step(program, ctx).await?;
    }
    Ok(())
}
