//! Keygate Server - request-authorization gateway for private object storage.
//!
//! Serves objects from an S3-compatible bucket through two routes: a public
//! route gated by a folder allowlist and a private route gated by an HS256
//! access token. Each object is fetched with a freshly presigned GET URL.
//!
//! # Usage
//!
//! ```text
//! BUCKET_NAME=assets S3_ENDPOINT=https://s3.example.com ALLOWED_FOLDERS=public keygate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:3000` | Bind address |
//! | `BUCKET_NAME` | *(required)* | Bucket holding the objects |
//! | `S3_REGION` | `us-east-1` | Signing region |
//! | `S3_ENDPOINT` | *(required)* | Storage endpoint base URL |
//! | `AWS_ACCESS_KEY_ID` | *(required)* | Signing access key |
//! | `AWS_SECRET_ACCESS_KEY` | *(required)* | Signing secret key |
//! | `AWS_SESSION_TOKEN` | *(unset)* | Temporary-credential session token |
//! | `PRESIGN_EXPIRES` | `43200` | Presigned URL lifetime in seconds |
//! | `ALLOWED_FOLDERS` | *(empty)* | Public top-level folders, comma separated |
//! | `PRIVATE_FOLDERS` | *(empty)* | Token-gated top-level folders, comma separated |
//! | `JWT_SECRET` | *(unset)* | HS256 secret for access tokens |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use keygate_core::GatewayConfig;
use keygate_http::{GatewayService, ObjectFetcher, ReqwestFetcher};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("received shutdown signal, draining connections");
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<F: ObjectFetcher>(listener: TcpListener, service: GatewayService<F>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Address the health probe connects to for a given bind address.
fn health_check_addr(gateway_listen: &str) -> String {
    gateway_listen.replace("0.0.0.0", "127.0.0.1")
}

/// Perform a health check by connecting to the gateway and requesting `/health`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = GatewayConfig::from_env();
        let addr = health_check_addr(&config.gateway_listen);
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = GatewayConfig::from_env();

    init_tracing(&config.log_level)?;

    config
        .validate()
        .context("refusing to start with incomplete configuration")?;

    info!(
        gateway_listen = %config.gateway_listen,
        bucket = %config.signing.bucket,
        region = %config.signing.region,
        endpoint = %config.signing.endpoint,
        presign_expires = config.signing.presign_expires,
        allowed_folders = ?config.allowed_folders.folders(),
        private_folders = ?config.private_folders.folders(),
        token_secret_configured = config.jwt_secret.is_some(),
        version = VERSION,
        "starting Keygate Server",
    );

    if config.jwt_secret.is_none() && !config.private_folders.is_empty() {
        warn!("JWT_SECRET is not set; every private request will be denied");
    }

    let addr = config.listen_addr()?;
    let fetcher = ReqwestFetcher::new().context("failed to initialize storage client")?;
    let service = GatewayService::new(fetcher, config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
