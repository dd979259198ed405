use anyhow::Result;
use clap::Parser;
use config::{Config, ConfigError};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use file_upload::{
    config_types::{FileUploadConfig, LoggingConfig},
    create_upload_handler,
    handlers::create_router,
};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "file-upload", version, about = "Multipart upload server")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, env = "FILE_UPLOAD_CONFIG", default_value = "config/file-upload")]
    config: String,
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args.config)?;

    init_tracing(&config.logging);

    info!(
        "Starting AI-CORE File Upload Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    // A destination that cannot be created is fatal
    let handler = create_upload_handler(config.upload.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize upload handler: {}", e))?;

    let app = create_router(handler, config.server.max_request_size);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("File Upload Service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("File Upload Service shutting down");
    Ok(())
}

/// Load configuration from an optional file and the environment
fn load_config(path: &str) -> Result<FileUploadConfig, ConfigError> {
    let settings = Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("FILE_UPLOAD")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("upload.allowed_mime_types")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<FileUploadConfig>()
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "file_upload={level},tower_http={level}",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_config_path() {
        let args = Args::parse_from(["file-upload"]);
        assert_eq!(args.config, "config/file-upload");

        let args = Args::parse_from(["file-upload", "--config", "/etc/upload"]);
        assert_eq!(args.config, "/etc/upload");
    }

    #[test]
    fn test_config_loading_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090

[upload]
destination_directory = "/tmp/uploads"
max_file_size_bytes = 2048
max_file_count = 3
allowed_mime_types = ["image/png"]
"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.upload.max_file_size_bytes, 2048);
        assert_eq!(config.upload.max_file_count, Some(3));
        assert_eq!(config.upload.allowed_mime_types, vec!["image/png"]);
        assert_eq!(config.logging.level, "info");
    }
}
