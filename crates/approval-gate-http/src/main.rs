// crates/approval-gate-http/src/main.rs
// ============================================================================
// Binary: approval-gate-http
// Description: Process entry point — loads config, initializes tracing, and
// serves the HTTP surface.
// Dependencies: tracing-subscriber, approval_gate_config
// ============================================================================

use std::path::PathBuf;

use clap::Parser;

/// Runs the approval gate HTTP service.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to `approval-gate.toml`. Defaults are used when omitted.
    #[arg(long, env = "APPROVAL_GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match approval_gate_config::ServiceConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load config");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(err) = approval_gate_http::run(config).await {
        tracing::error!(error = %err, "service exited with error");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
