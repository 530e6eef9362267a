//! Ingest Flow CLI - Operator interface for the Ingest Flow daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "ingestflow")]
#[command(about = "Ingest Flow CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "INGESTFLOW_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start importing a batch (or a single deposit)
    Import {
        /// Area to import into: import or migration
        #[arg(short, long, default_value = "import")]
        area: String,

        /// Batch directory, absolute or relative to the area inbox
        path: String,

        /// The path is one deposit instead of a batch of deposits
        #[arg(long)]
        single: bool,

        /// Resume a batch whose outbox already holds results
        #[arg(long = "continue")]
        continue_previous: bool,
    },

    /// List blocked targets
    Blocked {
        /// Show the full block history of one target
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Unblock a target so new deposits for it are processed again
    Unblock {
        /// Target (SWORD token or DOI)
        target: String,
    },

    /// Show task events
    Events {
        /// Only events of this deposit
        #[arg(short, long)]
        deposit_id: Option<String>,

        /// Number of recent events (ignored with --deposit-id)
        #[arg(short = 'n', long, default_value = "50")]
        limit: i64,
    },

    /// Show system status
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct ImportResult {
    area: String,
    batch: String,
    accepted: bool,
}

#[derive(Deserialize)]
struct BlockedTarget {
    deposit_id: String,
    target: String,
    state: String,
    message: Option<String>,
    created_at: i64,
    unblocked_at: Option<i64>,
}

#[derive(Tabled)]
struct BlockedRow {
    target: String,
    deposit: String,
    state: String,
    blocked_at: String,
    unblocked_at: String,
    message: String,
}

impl From<BlockedTarget> for BlockedRow {
    fn from(b: BlockedTarget) -> Self {
        Self {
            target: b.target,
            deposit: b.deposit_id,
            state: b.state,
            blocked_at: format_timestamp(b.created_at),
            unblocked_at: b.unblocked_at.map(format_timestamp).unwrap_or_default(),
            message: b.message.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct TaskEvent {
    deposit_id: String,
    event_type: String,
    result: String,
    message: Option<String>,
    created_at: i64,
}

#[derive(Tabled)]
struct EventRow {
    time: String,
    deposit: String,
    event: String,
    result: String,
    message: String,
}

impl From<TaskEvent> for EventRow {
    fn from(e: TaskEvent) -> Self {
        Self {
            time: format_timestamp(e.created_at),
            deposit: e.deposit_id,
            event: e.event_type,
            result: e.result,
            message: e.message.unwrap_or_default(),
        }
    }
}

/// Epoch milliseconds as a UTC timestamp
fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn parse_list<T: for<'de> Deserialize<'de>>(result: &serde_json::Value, key: &str) -> Result<Vec<T>> {
    let items = result
        .get(key)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' in response", key))?;
    serde_json::from_value(items).context("Failed to parse response")
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            area,
            path,
            single,
            continue_previous,
        } => {
            let params = json!({
                "area": area,
                "path": path,
                "single_deposit": single,
                "continue_previous": continue_previous,
            });

            let result = call_rpc(&cli.rpc_url, "import.start.v1", params).await?;
            let import_result: ImportResult = serde_json::from_value(result)?;

            println!("{}", "✓ Import started".green().bold());
            println!();

            let table = Table::new(vec![import_result]).to_string();
            println!("{}", table);
        }

        Commands::Blocked { target } => {
            let result = call_rpc(&cli.rpc_url, "targets.blocked.v1", json!({ "target": target })).await?;
            let blocked: Vec<BlockedTarget> = parse_list(&result, "targets")?;

            if blocked.is_empty() {
                println!("{}", "No blocked targets".green());
            } else {
                let rows: Vec<BlockedRow> = blocked.into_iter().map(BlockedRow::from).collect();
                println!("{}", format!("{} blocked entries", rows.len()).yellow().bold());
                println!();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Unblock { target } => {
            let result = call_rpc(&cli.rpc_url, "targets.unblock.v1", json!({ "target": target })).await?;

            println!(
                "{}",
                format!("✓ Target {} unblocked ({} entries cleared)", target, result["unblocked"])
                    .green()
                    .bold()
            );
        }

        Commands::Events { deposit_id, limit } => {
            let params = json!({
                "deposit_id": deposit_id,
                "limit": limit,
            });

            let result = call_rpc(&cli.rpc_url, "events.list.v1", params).await?;
            let events: Vec<TaskEvent> = parse_list(&result, "events")?;

            if events.is_empty() {
                println!("{}", "No events recorded".yellow());
            } else {
                let rows: Vec<EventRow> = events.into_iter().map(EventRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!("  {} {}", "Version:".bold(), stats["version"]);
                    println!();
                    println!("  {} {}", "Worker Pool:".bold(), stats["pool_size"]);
                    println!("  {} {}", "Active Targets:".bold(), stats["active_targets"]);
                    println!("  {} {}", "Running:".bold(), stats["running_tasks"]);
                    println!("  {} {}", "Pending:".bold(), stats["pending_tasks"]);
                    let blocked = stats["blocked_targets"].as_u64().unwrap_or(0);
                    let blocked_text = if blocked > 0 {
                        blocked.to_string().red()
                    } else {
                        blocked.to_string().green()
                    };
                    println!("  {} {}", "Blocked Targets:".bold(), blocked_text);
                    println!();
                    let areas: Vec<String> = stats["areas"]
                        .as_array()
                        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                        .unwrap_or_default();
                    println!("  {} {}", "Areas:".bold(), areas.join(", "));
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
