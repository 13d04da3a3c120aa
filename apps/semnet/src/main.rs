//! # semnet
//!
//! Question answering over a semantic network.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   apps/semnet (THE BINARY)                  │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  LLM router    │  │
//! │  │  (clap)     │    │   (axum)    │    │  (reqwest)     │  │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘  │
//! │         └──────────────────┼───────────────────┘           │
//! │                            ▼                               │
//! │                    ┌───────────────┐                       │
//! │                    │  semnet-core  │                       │
//! │                    │  (THE LOGIC)  │                       │
//! │                    └───────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! semnet --knowledge kitchen.json serve --port 8080
//! semnet --knowledge kitchen.json invoke action_find_included_children "Кулинария"
//! semnet --config semnet.toml ask "Какие этапы у рецепта борща?"
//! ```

use clap::Parser;
use semnet::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SEMNET_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("SEMNET_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "semnet=info,semnet_core=info,tower_http=debug".into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  semnet v{}
  question answering over a semantic network
"#,
        env!("CARGO_PKG_VERSION")
    );
}
