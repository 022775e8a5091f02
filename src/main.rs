//! Stepwright - resumable step workflow for change requests.
//!
//! Each invocation runs the next pending step for a change-request document,
//! writes its artifact and records progress next to the document.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stepwright::core::{Config, OsFileSystem, CONFIG_ENV};
use stepwright::workflow::{ContentMode, Phase, RunOutcome, RunRequest, StepRun, Workflow};

/// Resumable step workflow for change requests
#[derive(Parser)]
#[command(name = "stepwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Change-request document to advance by one step
    document: Option<PathBuf>,

    /// Restart the workflow from the first step
    #[arg(long)]
    reset: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the discovered one
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Write placeholder artifacts instead of prompt instructions
    #[arg(long, global = true)]
    placeholder: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show workflow progress for a document
    Status {
        /// Change-request document
        document: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the workflow steps
    Steps {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the rendered prompt for a step without running it
    Prompt {
        /// Change-request document
        document: PathBuf,

        /// Step id (defaults to the next pending step)
        #[arg(short, long)]
        step: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the effective configuration to the global config file
        #[arg(long, conflicts_with = "path")]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.placeholder {
        config.workflow.content_mode = ContentMode::Placeholder;
    }

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    // Handle commands
    match cli.command {
        None => {
            let Some(document) = cli.document else {
                anyhow::bail!("No change-request document given");
            };
            cmd_run(&config, RunRequest::new(document).with_reset(cli.reset))?;
        }
        Some(Commands::Status { document, format }) => {
            cmd_status(&config, &document, &format)?;
        }
        Some(Commands::Steps { format }) => {
            cmd_steps(&config, &format)?;
        }
        Some(Commands::Prompt { document, step }) => {
            cmd_prompt(&config, &document, step.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            cmd_completions(shell);
        }
        Some(Commands::Config { path, init }) => {
            cmd_config(&config, cli.config.as_deref(), path, init)?;
        }
    }

    Ok(())
}

fn workflow(config: &Config) -> Result<Workflow> {
    Workflow::new(Arc::new(OsFileSystem), &config.workflow)
        .context("Failed to load the workflow catalogue")
}

/// Run the next pending step.
fn cmd_run(config: &Config, request: RunRequest) -> Result<()> {
    let workflow = workflow(config)?;
    let total = workflow.catalogue().len();

    match workflow.run(&request)? {
        RunOutcome::Executed(run) => print_run(&run, total),
        RunOutcome::AlreadyComplete { document, steps } => {
            println!("All {steps} steps already completed for {}", document.display());
            println!("Use --reset to start over.");
        }
    }

    Ok(())
}

fn print_run(run: &StepRun, total: usize) {
    let step = run.report.step();
    println!("Step {}/{}: {} - {}", run.index + 1, total, step.id, step.description);
    println!("  Wrote {}", run.report.artifact().display());
    if let Some(warning) = &run.marker_warning {
        println!("  Warning: {warning}");
    }
    for warning in run.report.warnings() {
        println!("  Warning: {warning}");
    }

    match run.next.pending_index() {
        Some(_) => println!("  Progress: {}/{total} steps completed", run.index + 1),
        None => println!("All steps completed."),
    }
}

/// Show progress without executing anything.
fn cmd_status(config: &Config, document: &Path, format: &str) -> Result<()> {
    let status = workflow(config)?.status(document)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&status)?;
            println!("{json}");
        }
        _ => {
            println!("Document: {}", status.document.display());
            println!("Marker:   {}", status.marker.display());
            println!("Progress: {}/{} steps completed", status.completed, status.total);
            match &status.next_step {
                Some(step) => println!("Next:     {} - {}", step.id, step.description),
                None => println!("Next:     (complete)"),
            }
            if let Some(warning) = &status.warning {
                println!("Warning:  {warning}");
            }
            println!("\nArtifacts:");
            for artifact in &status.artifacts {
                let mark = if artifact.exists { "x" } else { " " };
                println!("  [{mark}] {}", artifact.path.display());
            }
        }
    }

    Ok(())
}

/// List the catalogue.
fn cmd_steps(config: &Config, format: &str) -> Result<()> {
    let workflow = workflow(config)?;
    let steps: Vec<_> = workflow.catalogue().iter().collect();

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&steps)?;
            println!("{json}");
        }
        _ => {
            let catalogue = workflow.catalogue();
            for phase in Phase::ALL {
                println!("{}:", phase.label());
                for step in catalogue.phase_steps(phase) {
                    let index = catalogue.position(step.id).unwrap_or_default();
                    let kind = if step.is_test { "test" } else { "build" };
                    println!("  {}. {} [{kind}] - {}", index + 1, step.id, step.description);
                }
            }
            println!("\nTotal: {} steps", steps.len());
        }
    }

    Ok(())
}

/// Print a rendered prompt.
fn cmd_prompt(config: &Config, document: &Path, step: Option<&str>) -> Result<()> {
    match workflow(config)?.preview(document, step)? {
        Some(rendered) => {
            println!("# {} - {}\n", rendered.step.id, rendered.step.description);
            println!("{}", rendered.rendered_prompt);
        }
        None => println!("All steps completed for {}", document.display()),
    }

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "stepwright", &mut io::stdout());
}

/// Show configuration.
fn cmd_config(config: &Config, explicit: Option<&Path>, show_path: bool, init: bool) -> Result<()> {
    if init {
        let path = config.save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if show_path {
        match Config::resolve_path(explicit).or_else(Config::global_config_path) {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine config directory"),
        }
        return Ok(());
    }

    println!("{}", config.to_toml()?);
    Ok(())
}
