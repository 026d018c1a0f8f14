//! # tenx
//!
//! Binary entry point. `tenx serve` runs the REST server, `tenx chat` runs
//! the local-first chat client in the terminal.

#![deny(unsafe_code)]

mod chat;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tenx_auth::DeliveryRouter;
use tenx_server::{AppState, TenxServer};
use tenx_settings::TenxSettings;
use tenx_store::ConnectionConfig;
use tracing::info;

/// tenx chat service.
#[derive(Parser, Debug)]
#[command(name = "tenx", version, about = "tenx chat service")]
struct Cli {
    /// Settings file (defaults to `~/.tenx/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST server.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
        /// Path to the `SQLite` database (overrides settings).
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Chat in the terminal.
    Chat {
        /// Principal to mirror sessions as (overrides settings).
        #[arg(long)]
        user_id: Option<String>,
        /// Chat log API base URL (overrides settings).
        #[arg(long)]
        api_base_url: Option<String>,
        /// Keep sessions local only.
        #[arg(long)]
        offline: bool,
    },
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<TenxSettings> {
    let settings = match path {
        Some(p) => tenx_settings::load_settings_from_path(p)
            .with_context(|| format!("Failed to load settings from {}", p.display()))?,
        None => tenx_settings::load_settings().context("Failed to load settings")?,
    };
    Ok(settings)
}

async fn serve(
    mut settings: TenxSettings,
    host: Option<String>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
) -> Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    let db_path =
        db_path.unwrap_or_else(|| tenx_settings::resolve_path(&settings.server.database_path));
    ensure_parent_dir(&db_path)?;

    let config = ConnectionConfig {
        pool_size: settings.server.pool_size,
        ..ConnectionConfig::default()
    };
    let pool = tenx_store::open(&db_path.to_string_lossy(), &config)
        .context("Failed to open database")?;
    let delivery = DeliveryRouter::from_settings(&settings.otp, Duration::from_secs(10))
        .context("Failed to build OTP delivery")?;
    let state = AppState::new(pool, delivery, settings.otp.ttl_secs);

    let server = TenxServer::new(settings.server.clone(), state);
    let listener = server.bind().await.with_context(|| {
        format!(
            "Failed to bind {}:{}",
            settings.server.host, settings.server.port
        )
    })?;

    let coordinator = server.shutdown().clone();
    let _ = tokio::spawn(async move { coordinator.wait_for_signal().await });

    info!(db = %db_path.display(), "starting tenx server");
    server.serve(listener).await.context("Server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    tenx_core::logging::init_subscriber(&settings.logging.level, settings.logging.format);
    if tenx_settings::init_settings(settings.clone()).is_err() {
        tracing::warn!("settings were already initialized");
    }

    match cli.command {
        Command::Serve {
            host,
            port,
            db_path,
        } => serve(settings, host, port, db_path).await,
        Command::Chat {
            user_id,
            api_base_url,
            offline,
        } => {
            let mut sync = settings.sync.clone();
            if let Some(user_id) = user_id {
                sync.user_id = Some(user_id);
            }
            if let Some(url) = api_base_url {
                sync.api_base_url = url;
            }
            if offline {
                sync.enabled = false;
            }
            let llm = Arc::new(tenx_llm::ProviderRegistry::from_settings(&settings.llm));
            chat::run(&settings.chat, &sync, llm).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::parse_from(["tenx", "serve", "--port", "0", "--host", "127.0.0.1"]);
        match cli.command {
            Command::Serve { host, port, .. } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(0));
            }
            Command::Chat { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn parses_chat_flags() {
        let cli = Cli::parse_from(["tenx", "chat", "--user-id", "u1", "--offline"]);
        match cli.command {
            Command::Chat {
                user_id, offline, ..
            } => {
                assert_eq!(user_id.as_deref(), Some("u1"));
                assert!(offline);
            }
            Command::Serve { .. } => panic!("expected chat"),
        }
    }

    #[test]
    fn ensure_parent_dir_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("tenx.db");
        ensure_parent_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
