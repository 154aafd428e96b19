//! prospector CLI: operator and observer interface to search sessions.

use clap::{Parser, Subcommand};
use prospector::config::{Config, WorkflowSettings, settings_path_from_env};
use prospector::db::Db;
use prospector::db::notify::WireNotification;
use prospector::engine::plan::PHASE_PLAN;
use prospector::store::{ProgressMessage, RunState};
use prospector::telemetry::{TelemetryConfig, init_telemetry};
use secrecy::ExposeSecret;
use tracing::warn;

#[derive(Parser)]
#[command(name = "prospector", about = "ICP-driven company search workflows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Print the phase plan and effective workflow settings
    Plan,
    /// Show a session's persisted run state
    Status {
        /// Search session ID
        session_id: String,
    },
    /// List companies saved for a session
    Results {
        /// Search session ID
        session_id: String,
        /// Print full JSON records
        #[arg(long)]
        json: bool,
    },
    /// Follow live progress notifications
    Watch {
        /// Only show this session
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Command::Plan = cli.command {
        return cmd_plan();
    }

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "prospector".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;

    match cli.command {
        Command::Migrate => {
            db.migrate().await?;
            println!("Migrations applied.");
            Ok(())
        }
        Command::Status { session_id } => {
            let state = db.load_run_state(&session_id).await?;
            print_run_state(&state);
            Ok(())
        }
        Command::Results { session_id, json } => cmd_results(&db, &session_id, json).await,
        Command::Watch { session } => cmd_watch(&db, session).await,
        Command::Plan => unreachable!("handled above"),
    }
}

fn cmd_plan() -> anyhow::Result<()> {
    // Needs no database, so skip the full environment config.
    let path = settings_path_from_env();
    let settings = WorkflowSettings::load_or_default(path.as_deref())?;

    println!("{:<5}  {:<24}  {:<12}  TOOLS", "ID", "NAME", "CATEGORY");
    println!("{}", "-".repeat(64));
    for def in PHASE_PLAN {
        println!(
            "{:<5}  {:<24}  {:<12}  {}",
            def.id,
            def.name,
            def.category,
            def.tools.join(",")
        );
    }
    println!();
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

async fn cmd_results(db: &Db, session_id: &str, json: bool) -> anyhow::Result<()> {
    let companies = db.load_companies(session_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&companies)?);
        return Ok(());
    }
    if companies.is_empty() {
        println!("No companies saved for session {session_id}.");
        return Ok(());
    }

    println!(
        "{:<30}  {:<24}  {:>6}  {:>6}  MARKET",
        "NAME", "DOMAIN", "FIT", "INTENT"
    );
    println!("{}", "-".repeat(84));
    for c in &companies {
        let score = |s: Option<f64>| s.map(|v| format!("{v:.2}")).unwrap_or("-".to_string());
        let market = c
            .target_market
            .map(|m| format!("{m:?}"))
            .unwrap_or("-".to_string());
        println!(
            "{:<30}  {:<24}  {:>6}  {:>6}  {}",
            truncate(&c.name, 30),
            truncate(&c.domain, 24),
            score(c.fit_score()),
            score(c.intent_score()),
            market
        );
    }
    println!("\n{} compan(ies)", companies.len());
    Ok(())
}

async fn cmd_watch(db: &Db, only: Option<String>) -> anyhow::Result<()> {
    let mut listener = db.listen_progress().await?;
    println!("Watching progress (Ctrl-C to stop)...");

    loop {
        let notification = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            n = listener.recv() => n?,
        };

        let wire: WireNotification = match serde_json::from_str(notification.payload()) {
            Ok(w) => w,
            Err(e) => {
                warn!("unreadable notification: {e}");
                continue;
            }
        };
        if only.as_deref().is_some_and(|s| s != wire.session_id()) {
            continue;
        }

        match wire {
            WireNotification::Inline(n) => match n.message {
                ProgressMessage::Substep(s) => {
                    println!(
                        "[{}] {} {:<12} {}",
                        n.session_id,
                        s.id,
                        s.status.to_string(),
                        s.message
                    );
                }
                ProgressMessage::Status(s) => {
                    println!(
                        "[{}] {:?} {}% {}",
                        n.session_id, s.stage, s.progress, s.message
                    );
                }
                ProgressMessage::Error { message } => {
                    println!("[{}] ERROR {message}", n.session_id);
                }
            },
            WireNotification::Reference { session_id, .. } => {
                // Too large to send inline; read the durable copy.
                let state = db.load_run_state(&session_id).await?;
                print_run_state(&state);
            }
        }
    }
}

fn print_run_state(state: &RunState) {
    println!("Session:  {}", state.session_id);
    println!("Query:    {}", state.query.as_deref().unwrap_or("-"));
    if let Some(ref status) = state.status {
        println!(
            "Stage:    {:?} ({}%, step {}/{})",
            status.stage, status.progress, status.current_step, status.total_steps
        );
        println!("Message:  {}", status.message);
    }
    println!("Updated:  {}", state.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!("---");
    for substep in state.substeps.values() {
        println!(
            "{:<5}  {:<24}  {:<12}  {}",
            substep.id,
            substep.name,
            substep.status.to_string(),
            substep.message
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(['…']).collect()
    }
}
