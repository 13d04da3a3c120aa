//! # semnet CLI Module
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `status` - Show knowledge base status
//! - `resolve` - Find the node owning a name
//! - `invoke` - Run a search operation on a named entity
//! - `stages` - Print the stages of a process scheme
//! - `ask` - Answer a free-text question (needs an `[llm]` section)

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use semnet_core::SemnetError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// semnet - question answering over a semantic network
#[derive(Parser, Debug)]
#[command(name = "semnet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (default: semnet.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON knowledge source, overriding `[knowledge] source`
    #[arg(short, long, global = true)]
    pub knowledge: Option<PathBuf>,

    /// Completion wait in milliseconds, overriding `[dispatcher] timeout_ms`
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (default: `[server] host`)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default: `[server] port`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show knowledge base status
    Status,

    /// Find the node whose main identifier is NAME
    Resolve { name: String },

    /// Run OPERATION on the entity called NAME
    Invoke { operation: String, name: String },

    /// Print the stages of the process scheme called NAME
    Stages { name: String },

    /// Answer a free-text question
    Ask { question: String },
}

impl Cli {
    /// The configuration file with command-line overrides applied.
    pub fn load_config(&self) -> Result<AppConfig, SemnetError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        if let Some(knowledge) = &self.knowledge {
            config.knowledge.source = Some(knowledge.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.dispatcher.timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SemnetError> {
    let config = cli.load_config()?;
    let json_mode = cli.json_mode;
    if cli.verbose {
        tracing::info!(?config, "effective configuration");
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(config, host, port).await,
        // Everything else blocks on the dispatcher or the LLM.
        command => tokio::task::spawn_blocking(move || run_blocking(&config, command, json_mode))
            .await
            .map_err(|e| SemnetError::IoError(format!("command task failed: {}", e)))?,
    }
}

fn run_blocking(
    config: &AppConfig,
    command: Option<Commands>,
    json_mode: bool,
) -> Result<(), SemnetError> {
    let service = crate::service::Service::from_config(config)?;
    match command {
        Some(Commands::Status) | None => cmd_status(&service, json_mode),
        Some(Commands::Resolve { name }) => cmd_resolve(&service, json_mode, &name),
        Some(Commands::Invoke { operation, name }) => {
            cmd_invoke(&service, json_mode, &operation, &name)
        }
        Some(Commands::Stages { name }) => cmd_stages(&service, json_mode, &name),
        Some(Commands::Ask { question }) => cmd_ask(&service, json_mode, &question),
        Some(Commands::Serve { .. }) => Err(SemnetError::InvalidArguments(
            "serve runs on the async runtime".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "semnet",
            "--config",
            "/nonexistent/semnet.toml",
            "status",
        ])
        .expect("parse");
        assert!(matches!(cli.load_config(), Err(SemnetError::IoError(_))));

        let cli = Cli::try_parse_from([
            "semnet",
            "--knowledge",
            "kb.json",
            "--timeout-ms",
            "42",
            "invoke",
            "action_find_info",
            "Дерево",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Some(Commands::Invoke { .. })));
        // Only meaningful when no semnet.toml sits in the test's working directory.
        if !std::path::Path::new(crate::config::DEFAULT_CONFIG_FILE).exists() {
            let config = cli.load_config().expect("config");
            assert_eq!(config.dispatcher.timeout_ms, 42);
            assert_eq!(config.knowledge.source, Some(PathBuf::from("kb.json")));
        }
    }
}
