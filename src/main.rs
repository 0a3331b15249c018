mod accounts;
mod config;
mod db;
mod error;
mod exchange;
mod ipc;
mod roster;
mod session;
mod stats;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "logbookd")]
#[command(version, about = "Class attendance logbook sidecar (JSON lines over stdio)", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "LOGBOOKD_CONFIG", default_value = "logbook.toml")]
    config: PathBuf,

    /// Open this workspace directory before serving requests
    #[arg(short, long, env = "LOGBOOKD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Override the configured log level
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("starting logbookd v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let mut state = ipc::AppState::new(config);
    if let Some(workspace) = cli.workspace {
        // A bad startup workspace is not fatal; the client can select another.
        let _ = ipc::select_workspace(&mut state, workspace);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
