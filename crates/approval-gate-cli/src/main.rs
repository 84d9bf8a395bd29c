// crates/approval-gate-cli/src/main.rs
// ============================================================================
// Module: Approval Gate CLI Entry Point
// Description: Command dispatcher for submitting, listing, deciding, and
// dispatching approvals against a running approval-gate-http deployment.
// Purpose: Give an operator a scriptable client over the HTTP surface
// without hand-rolling curl invocations.
// Dependencies: clap, reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! Every subcommand is a thin translation from CLI flags to one HTTP call
//! via [`client::Client`]; this binary holds no business logic of its own.
//! The bearer token and target URL are read from flags or their `APPROVAL_GATE_*`
//! environment equivalents.

mod client;

use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use serde_json::json;

use client::Client;
use client::ClientError;

/// Administrative client for an approval gate deployment.
#[derive(Debug, Parser)]
#[command(name = "approval-gate", version, about)]
struct Cli {
    /// Base URL of the approval gate HTTP service.
    #[arg(long, env = "APPROVAL_GATE_URL", default_value = "http://127.0.0.1:8080")]
    url: String,
    /// Bearer token identifying the operator making these calls.
    #[arg(long, env = "APPROVAL_GATE_TOKEN")]
    token: String,
    /// The subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a plan: `execute` (gated), `launch`, or `dry-run`.
    Submit {
        /// `execute`, `launch`, or `dry-run`.
        #[arg(long, default_value = "execute")]
        mode: String,
        /// Domain label classifying the action for the authorization evaluator.
        #[arg(long)]
        intent: String,
        /// Path to a JSON file containing the plan steps array.
        #[arg(long)]
        plan: PathBuf,
        /// Caller-supplied idempotency discriminator.
        #[arg(long)]
        request_id: Option<String>,
    },
    /// List approvals, optionally filtered by status.
    List {
        /// Filter by lifecycle status (`pending`, `approved`, ...).
        #[arg(long)]
        status: Option<String>,
        /// Maximum rows returned.
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one approval by id.
    Show {
        /// Approval id.
        id: String,
    },
    /// Show a chain's progress and step list.
    Chain {
        /// Approval id.
        id: String,
    },
    /// Decide an approval or one of its chain steps.
    Decide {
        /// Approval id.
        id: String,
        /// `approved` or `rejected`.
        #[arg(long)]
        status: String,
        /// Chain step id, when the approval has more than one active step.
        #[arg(long)]
        step_id: Option<String>,
        /// Free-text decision note.
        #[arg(long)]
        note: Option<String>,
    },
    /// Dispatch a decided approval's plan steps.
    Dispatch {
        /// Approval id.
        id: String,
        /// Exercise the dispatch path without mutating external systems.
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch the Prometheus text-exposition metrics body.
    Metrics,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = Client::new(cli.url, cli.token);
    match run(&client, cli.command).await {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Dispatches one parsed subcommand to its HTTP call.
async fn run(client: &Client, command: Command) -> Result<Value, ClientError> {
    tracing::debug!(command = command_name(&command), "dispatching command");
    match command {
        Command::Submit {
            mode,
            intent,
            plan,
            request_id,
        } => {
            let plan_steps = read_plan_file(&plan);
            let body = json!({
                "mode": mode,
                "actionIntent": intent,
                "planSteps": plan_steps,
                "requestId": request_id,
            });
            client.post("/pj/execute", &body).await
        }
        Command::List { status, limit } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(format!("status={status}"));
            }
            if let Some(limit) = limit {
                query.push(format!("limit={limit}"));
            }
            let suffix = if query.is_empty() {
                String::new()
            } else {
                format!("?{}", query.join("&"))
            };
            client.get(&format!("/approvals{suffix}")).await
        }
        Command::Show { id } => client.get(&format!("/approvals/{id}")).await,
        Command::Chain { id } => client.get(&format!("/approvals/{id}/chain")).await,
        Command::Decide {
            id,
            status,
            step_id,
            note,
        } => {
            let body = json!({ "status": status, "stepId": step_id, "note": note });
            client.post(&format!("/approvals/{id}/decide"), &body).await
        }
        Command::Dispatch { id, dry_run } => {
            let body = json!({ "dryRun": dry_run });
            client.post(&format!("/approvals/{id}/dispatch"), &body).await
        }
        Command::Metrics => client.get("/metrics").await,
    }
}

/// Names `command`'s variant for log correlation, without the argument values.
const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Submit { .. } => "submit",
        Command::List { .. } => "list",
        Command::Show { .. } => "show",
        Command::Chain { .. } => "chain",
        Command::Decide { .. } => "decide",
        Command::Dispatch { .. } => "dispatch",
        Command::Metrics => "metrics",
    }
}

/// Reads a plan-steps JSON array from `path`, or an empty array if the file
/// is missing or not valid JSON.
fn read_plan_file(path: &Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_else(|| json!([]))
}

/// Writes `value` as pretty-printed JSON to stdout.
fn print_json(value: &Value) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let mut stdout = std::io::stdout();
    let _ = writeln!(&mut stdout, "{rendered}");
}

/// Writes `err` to stderr.
fn print_error(err: &ClientError) {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {err}");
}
