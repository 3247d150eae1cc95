//! gitdeck command-line front end.
//!
//! Drives the core engine against a running Git backend: inspect status,
//! stage and commit selected changes, pull and push, and resolve merge
//! conflicts parameter by parameter.

mod actions;
mod conflicts;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gitdeck_core::backend::HttpGitBackend;
use gitdeck_core::config::AppConfig;
use gitdeck_core::conflict::Choice;
use gitdeck_core::notify::Notifier;
use gitdeck_core::orchestrator::SyncOrchestrator;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// gitdeck command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "gitdeck",
    version,
    about = "Review, stage, commit and merge profile changes through a Git backend"
)]
struct Cli {
    /// Path to the TOML configuration file.
    /// Defaults to the platform config directory (e.g. ~/.config/gitdeck/config.toml).
    #[arg(short, long, global = true, env = "GITDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Validate,

    /// Show outgoing and incoming changes and merge state.
    Status,

    /// Stage unstaged changes.
    Stage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Unstage staged changes.
    Unstage {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Commit staged changes. Without paths, commits everything staged.
    Commit {
        /// Commit message.
        #[arg(short, long)]
        message: String,

        paths: Vec<String>,
    },

    /// Discard working-tree changes.
    Revert {
        /// Revert every outgoing change.
        #[arg(long, conflicts_with = "paths")]
        all: bool,

        #[arg(required_unless_present = "all")]
        paths: Vec<String>,
    },

    /// Pull incoming changes into the current branch.
    Pull,

    /// Push unpushed commits.
    Push,

    /// List merge conflicts, or show one in detail.
    Conflicts {
        /// Show the conflicting parameters of this file.
        file: Option<String>,
    },

    /// Choose local or incoming values for a conflict and submit them.
    Resolve {
        /// Conflicted file path.
        file: String,

        /// `<param>=<local|incoming>`; by label ("Tags: anime") or key ("tag_anime").
        #[arg(long = "choose", value_parser = conflicts::parse_choice)]
        choose: Vec<(String, Choice)>,

        /// Take this side for every parameter not named with --choose.
        #[arg(long)]
        all: Option<Choice>,
    },

    /// Complete the merge once every conflict is resolved.
    Finalize,

    /// Abandon the merge in progress.
    Abort,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Init { output } => {
            init_logging("warn", cli.verbose);
            cmd_init(&output.unwrap_or(config_path))
        }
        Commands::Validate => {
            init_logging("warn", cli.verbose);
            cmd_validate(&config_path)
        }
        command => {
            let config = load_config(&config_path, cli.config.is_some())?;
            init_logging(&config.log.level, cli.verbose);
            let orch = connect(&config).await?;

            match command {
                Commands::Status => {
                    actions::print_status(&orch.status());
                    Ok(())
                }
                Commands::Stage { paths } => actions::stage(&orch, &paths).await,
                Commands::Unstage { paths } => actions::unstage(&orch, &paths).await,
                Commands::Commit { message, paths } => {
                    actions::commit(&orch, &paths, &message).await
                }
                Commands::Revert { all, paths } => actions::revert(&orch, &paths, all).await,
                Commands::Pull => actions::pull(&orch).await,
                Commands::Push => actions::push(&orch).await,
                Commands::Conflicts { file } => conflicts::list(&orch, file.as_deref()),
                Commands::Resolve { file, choose, all } => {
                    conflicts::resolve(&orch, &file, &choose, all).await
                }
                Commands::Finalize => conflicts::finalize(&orch).await,
                Commands::Abort => conflicts::abort(&orch).await,
                Commands::Init { .. } | Commands::Validate => Ok(()),
            }
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gitdeck")
        .join("config.toml")
}

/// Load the config file. A missing file at the default location falls back
/// to built-in defaults; a missing file that was asked for explicitly is an
/// error.
fn load_config(path: &Path, explicit: bool) -> Result<AppConfig> {
    if !explicit && !path.exists() {
        let mut config = AppConfig::default();
        config
            .resolve_env_vars()
            .context("failed to resolve environment variables")?;
        return Ok(config);
    }
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

async fn connect(config: &AppConfig) -> Result<SyncOrchestrator> {
    info!(url = %config.backend.url, "connecting to backend");
    let backend =
        HttpGitBackend::new(&config.backend).context("failed to create backend client")?;
    let orch = SyncOrchestrator::new(
        Arc::new(backend),
        Notifier::new(config.ui.notification_capacity),
    );
    orch.fetch_status()
        .await
        .with_context(|| format!("failed to reach backend at {}", config.backend.url))?;
    Ok(orch)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    std::fs::write(output, AppConfig::template()).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Point backend.url at your Git backend");
    println!("  2. Optionally set backend.token_env and export that variable");
    println!(
        "  3. Validate with: gitdeck validate --config {}",
        output.display()
    );
    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    let _ = config.resolve_env_vars();
    println!("  {}", style::success("Environment variable references processed"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All fields are valid"));

    println!();
    println!("Configuration summary:");
    println!("  Backend URL   : {}", config.backend.url);
    println!("  API prefix    : {}", config.backend.api_prefix);
    println!(
        "  Token         : {}",
        match (&config.backend.token_env, &config.backend.token) {
            (None, _) => "not configured",
            (Some(_), Some(_)) => "set",
            (Some(_), None) => "NOT SET",
        }
    );
    println!("  Timeout       : {}s", config.backend.timeout_secs);
    println!("  Log level     : {}", config.log.level);
    println!("  Range modifier: {}", config.ui.range_modifier);
    println!();
    println!("Configuration is valid.");
    Ok(())
}
