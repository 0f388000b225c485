//! rtc-server - rate-the-clip service entry point
//!
//! Resolves the root folder, opens (or creates) the database and serves
//! the HTTP API. `add-person` registers a participant out-of-band.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtc_common::config::{
    CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use rtc_common::db::{init_database, SqliteStore};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rtc_server::media::{FfprobeProbe, MediaLocator};
use rtc_server::{build_router, AppState, ServiceSettings};

/// Command-line arguments for rtc-server
#[derive(Parser, Debug)]
#[command(name = "rtc-server")]
#[command(about = "Rate-the-clip rating and leaderboard service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "RTC_PORT")]
    port: Option<u16>,

    /// Root folder holding rtc.db, faces/ and interactions/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "RTC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Register a person
    AddPerson {
        name: String,
        /// Avatar URL (defaults to /image/<name>)
        #[arg(long)]
        avatar: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    let level = &config.logging.level;
                    format!("rtc_server={level},rtc_common={level},tower_http={level}").into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rtc-server v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    if initializer.database_exists() {
        info!("Opening database: {}", db_path.display());
    } else {
        info!("Creating new database: {}", db_path.display());
    }
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match args.command.unwrap_or(Command::Serve) {
        Command::AddPerson { name, avatar } => {
            let person = SqliteStore::new(pool)
                .create_person(&name, avatar.as_deref())
                .await
                .with_context(|| format!("Failed to add person {}", name))?;
            info!("Added person {} (avatar {})", person.name, person.avatar);
            Ok(())
        }
        Command::Serve => {
            let port = args
                .port
                .or(config.port)
                .unwrap_or_else(|| CompiledDefaults::for_current_platform().port);
            serve(pool, &initializer, &config, port).await
        }
    }
}

async fn serve(
    pool: sqlx::SqlitePool,
    initializer: &RootFolderInitializer,
    config: &TomlConfig,
    port: u16,
) -> Result<()> {
    let probe = Arc::new(FfprobeProbe::new(config.media.probe_binary.clone()));
    let media = MediaLocator::new(
        initializer.faces_dir(),
        initializer.interactions_dir(),
        &config.media,
        probe,
    );
    info!(
        "Clip target duration {}s, probe '{}'",
        config.media.target_duration_secs, config.media.probe_binary
    );

    let state = AppState::new(pool, media, ServiceSettings::from_config(config));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("rtc-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
