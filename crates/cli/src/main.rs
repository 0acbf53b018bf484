mod auth_commands;
mod request_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    tokio::sync::broadcast::Receiver,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    triage_auth::{AuthClient, SessionEvent, SessionEvents},
    triage_config::TriageConfig,
};

#[derive(Parser)]
#[command(name = "triage", about = "Incident tracker client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Session management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Send an authenticated request to the tracker API.
    Request(request_commands::RequestArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file path in use.
    Path,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<TriageConfig> {
    match &cli.config {
        Some(path) => triage_config::load_config(path),
        None => Ok(triage_config::discover_and_load()),
    }
}

/// Print a re-login hint if any refresh cycle ended the session.
fn report_expiry(events: &mut Receiver<SessionEvent>) {
    if let Ok(SessionEvent::Expired) = events.try_recv() {
        eprintln!("Session expired. Run `triage auth login` to sign in again.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "triage starting");
    let config = load_config(&cli)?;
    debug!(base_url = %config.api.base_url, "using tracker API");

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            },
            ConfigAction::Path => {
                let path = cli
                    .config
                    .clone()
                    .unwrap_or_else(triage_config::find_or_default_config_path);
                println!("{}", path.display());
                Ok(())
            },
        };
    }

    let session = SessionEvents::new();
    let mut expired = session.subscribe();
    let client = AuthClient::from_config(&config, Arc::new(session))?;

    let result = match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(&client, &config, action).await,
        Commands::Request(args) => request_commands::handle_request(&client, args).await,
        Commands::Config { .. } => Ok(()),
    };

    report_expiry(&mut expired);
    result
}
