use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use grchub_protocol::Category;
use log::LevelFilter;
use tokio::net::TcpListener;
use tracing::{debug, info};

use grchub::api;
use grchub::client;
use grchub::config::{self, AppConfig};
use grchub::knowledge::KnowledgeStore;
use grchub::model::OpenAiBackend;

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(config: AppConfig, cmd: ServeCommand) -> Result<()> {
    handle_serve(config, cmd).await
}

#[tokio::main]
async fn async_chat(cmd: ChatCommand) -> Result<()> {
    client::run(cmd.url, cmd.category).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.common.config.as_deref())?;
    init_logging(&cli.common, &config);
    debug!("resolved config: {:#?}", config);

    match cli.command {
        Command::Serve(cmd) => async_serve(config, cmd),
        Command::Chat(cmd) => async_chat(cmd),
        Command::Init(cmd) => handle_init(&cli.common, cmd),
        Command::Config { command } => handle_config(&config, command),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "GRC Hub - knowledge dashboard backend with a streaming AI assistant.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -v)
    #[arg(long, global = true)]
    debug: bool,
    /// Output logs as machine readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),
    /// Chat with a running server from the terminal
    Chat(ChatCommand),
    /// Write a default config file
    Init(InitCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Args)]
struct ServeCommand {
    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Bind port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Args)]
struct ChatCommand {
    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:4820")]
    url: String,
    /// Initial category filter (risks, compliance, regulatory, recommendation)
    #[arg(long)]
    category: Option<Category>,
}

#[derive(Debug, Args)]
struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Print the config file location
    Path,
}

fn init_logging(common: &CommonOpts, config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    if common.quiet {
        log::set_max_level(LevelFilter::Off);
        return;
    }

    let level = if common.verbose >= 2 {
        "trace"
    } else if common.debug || common.verbose == 1 {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("grchub={level},tower_http={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .ok();
    }

    // Also init env_logger for compatibility with log crate users
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init()
        .ok();
}

async fn handle_serve(config: AppConfig, cmd: ServeCommand) -> Result<()> {
    info!("Starting GRC Hub server...");

    let store = match &config.knowledge.file {
        Some(path) => {
            info!(path = %path.display(), "Loading external knowledge feed");
            KnowledgeStore::load_file(path)?
        }
        None => KnowledgeStore::load_default()?,
    };
    info!(entries = store.len(), "Knowledge base loaded");

    let model = Arc::new(OpenAiBackend::from_config(&config.model));
    let state = api::AppState::new(
        store,
        model,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    // Single source of truth for routing: everything lives under /api.
    let api_router = api::create_router(state, &config.server.cors_origins);
    let app = axum::Router::new().nest("/api", api_router);

    let host = cmd.host.unwrap_or_else(|| config.server.host.clone());
    let port = cmd.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

fn handle_init(common: &CommonOpts, cmd: InitCommand) -> Result<()> {
    let path = common
        .config
        .clone()
        .or_else(config::default_config_path)
        .ok_or_else(|| anyhow!("could not determine a config file location"))?;
    config::write_default(&path, cmd.force)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn handle_config(config: &AppConfig, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered =
                toml::to_string_pretty(config).context("serializing configuration")?;
            print!("{rendered}");
        }
        ConfigCommand::Path => match config::default_config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config directory available)"),
        },
    }
    Ok(())
}
