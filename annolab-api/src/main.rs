//! annolab-api - Annotation platform HTTP service
//!
//! Bootstrap configuration is resolved with priority
//! command line > environment > TOML file > built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use annolab_api::auth::TokenIssuer;
use annolab_api::mail::{HttpMailer, LogMailer, Mailer};
use annolab_api::storage::{LocalStore, ObjectStore};
use annolab_api::{build_router, AppState, Settings};
use annolab_common::config::{
    default_config_path, load_toml_config, resolve_database_path, resolve_root_folder,
    MailTransport, StorageBackend, TomlConfig,
};
use clap::Parser;
use rand::RngCore;
use secrecy::SecretString;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for annolab-api
#[derive(Parser, Debug)]
#[command(name = "annolab-api")]
#[command(about = "Annotation platform API server")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(short, long, env = "ANNOLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ANNOLAB_PORT")]
    port: Option<u16>,

    /// Database file (overrides the config file)
    #[arg(short, long, env = "ANNOLAB_DATABASE")]
    database: Option<PathBuf>,

    /// Folder holding the database and locally stored uploads
    #[arg(short, long, env = "ANNOLAB_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = load_toml_config(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Build identification first, before any slow startup work
    info!(
        "Starting annolab-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Configuration: {}", config_path.display());
    } else {
        warn!(
            "Config file {} not found, using built-in defaults",
            config_path.display()
        );
    }

    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "ANNOLAB_ROOT_FOLDER",
        config.root_folder.as_deref(),
    );
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = match &args.database {
        Some(path) => path.clone(),
        None => resolve_database_path(&root_folder, config.database_path.as_deref()),
    };
    info!("Database: {}", db_path.display());
    let db = annolab_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let tokens = TokenIssuer::new(
        &jwt_secret(&config),
        chrono::Duration::seconds(config.auth.jwt_expiration_secs),
    )?;
    let mailer = build_mailer(&config)?;
    let (store, local_files_root) = build_store(&config, &root_folder).await?;

    let settings = Settings {
        client_domain: config.auth.client_domain.clone(),
        verification_ttl: chrono::Duration::seconds(config.auth.verification_ttl_secs),
        secure_cookie: config.auth.secure_cookie,
        max_upload_bytes: config.storage.max_upload_bytes,
        cors_origins: config.cors.origins.clone(),
        local_files_root,
    };

    let state = AppState::new(db, tokens, mailer, store, settings);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("annolab-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Configured signing secret, or a random one for this process only
fn jwt_secret(config: &TomlConfig) -> SecretString {
    match config.auth.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => SecretString::from(secret.to_string()),
        None => {
            warn!("No jwt_secret configured; generated a random one (tokens will not survive a restart)");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            SecretString::from(hex::encode(bytes))
        }
    }
}

fn build_mailer(config: &TomlConfig) -> Result<Arc<dyn Mailer>> {
    match config.mail.transport {
        MailTransport::Log => {
            info!("Mail transport: log");
            Ok(Arc::new(LogMailer))
        }
        MailTransport::Http => {
            let Some(endpoint) = config.mail.endpoint.clone() else {
                bail!("[mail] transport = \"http\" requires an endpoint");
            };
            info!(endpoint = %endpoint, "Mail transport: http");
            let api_key = config.mail.api_key.clone().map(SecretString::from);
            Ok(Arc::new(HttpMailer::new(
                endpoint,
                api_key,
                config.mail.from.clone(),
            )?))
        }
    }
}

async fn build_store(
    config: &TomlConfig,
    root_folder: &std::path::Path,
) -> Result<(Arc<dyn ObjectStore>, Option<PathBuf>)> {
    match config.storage.backend {
        StorageBackend::Local => {
            let uploads = root_folder.join("uploads");
            std::fs::create_dir_all(&uploads)
                .with_context(|| format!("Failed to create {}", uploads.display()))?;
            info!("Local object storage: {}", uploads.display());
            let store = LocalStore::new(uploads.clone(), config.storage.public_base_url.clone());
            Ok((Arc::new(store), Some(uploads)))
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 => {
            let Some(bucket) = config.storage.s3_bucket.clone() else {
                bail!("[storage] backend = \"s3\" requires s3_bucket");
            };
            let store = annolab_api::storage::S3Store::new(
                bucket,
                config.storage.s3_region.clone(),
                config.storage.s3_endpoint.clone(),
            )
            .await;
            Ok((Arc::new(store), None))
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => bail!("S3 storage requested but this build lacks the s3 feature"),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
