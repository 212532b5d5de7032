//! Riad concierge CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use concierge::adapters::{cli, http};
use concierge::config::ConciergeConfig;
use concierge::logging::{self, LoggingGuard};
use concierge::session::SessionStore;
use concierge::startup::{self, StartupError};

#[derive(Debug, Parser)]
#[command(name = "concierge", version, about = "Multi-tenant guesthouse concierge")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the chat widget JSON API.
    Serve {
        /// Listen address, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Chat with the concierge in the terminal.
    Chat {
        /// Property identifier; the configured default when omitted.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Print the system instruction for a property.
    Prompt {
        /// Property identifier; the configured default when omitted.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// List the properties in the tenant registry.
    Tenants,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Credentials may live in .env; config overrides may too.
    concierge::credentials::load_dotenv();
    let config = ConciergeConfig::load(cli.config).context("failed to load configuration")?;

    match cli.command {
        Command::Serve { bind } => {
            let _guard = init_serve_logging(&config)?;
            serve(config, bind).await
        }
        Command::Chat { tenant } => {
            logging::init_cli(&config.logging.level);
            chat(&config, tenant.as_deref()).await
        }
        Command::Prompt { tenant } => {
            logging::init_cli(&config.logging.level);
            print_prompt(&config, tenant.as_deref())
        }
        Command::Tenants => {
            logging::init_cli(&config.logging.level);
            list_tenants(&config)
        }
    }
}

fn init_serve_logging(config: &ConciergeConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => Ok(Some(logging::init_production(dir, &config.logging.level)?)),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

async fn serve(config: ConciergeConfig, bind: Option<String>) -> anyhow::Result<()> {
    let concierge = startup::bootstrap(&config, |key| std::env::var(key).ok())?;
    let store = Arc::new(SessionStore::new(
        config.server.session_idle_timeout(),
        config.server.max_sessions,
    ));
    let state = http::AppState::new(Arc::new(concierge), store, &config.registry.query_param);

    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    http::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("received shutdown signal");
    })
    .await
}

async fn chat(config: &ConciergeConfig, tenant: Option<&str>) -> anyhow::Result<()> {
    let concierge = startup::bootstrap(config, |key| std::env::var(key).ok())?;
    let session = concierge
        .open_session(tenant)
        .map_err(StartupError::from)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    cli::run_chat(&concierge, session, stdin, tokio::io::stdout()).await
}

fn print_prompt(config: &ConciergeConfig, tenant: Option<&str>) -> anyhow::Result<()> {
    let setup = startup::load_tenant_setup(config)?;
    let resolved = setup
        .resolver
        .resolve(tenant)
        .map_err(StartupError::from)?;
    println!("{}", setup.prompts.build(&resolved.tenant));
    Ok(())
}

fn list_tenants(config: &ConciergeConfig) -> anyhow::Result<()> {
    let setup = startup::load_tenant_setup(config)?;
    let default_id = setup.resolver.default_id();
    for tenant in setup.registry().iter() {
        let marker = if tenant.id == default_id { " (default)" } else { "" };
        println!("{}\t{}\t{}{marker}", tenant.id, tenant.name, tenant.city);
    }
    Ok(())
}
