// # iptriaged - iptriage Daemon
//
// CRITICAL RULES:
// - This is a THIN integration layer ONLY
// - DO NOT add extraction, classification or lookup logic here
// - All triage logic MUST be in iptriage-core
// - Configuration is via environment variables ONLY
//
// The iptriaged daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Connecting the Redis membership store
// 4. Starting the ingestion server and waiting for a shutdown signal
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Ingestion
// - `IPTRIAGE_LISTEN_ADDR`: Address to listen on (default: 0.0.0.0:5050)
// - `IPTRIAGE_MAX_LINE_BYTES`: Longest accepted line (default: 65536)
//
// ### Membership Store
// - `IPTRIAGE_REDIS_ADDR`: Redis host:port (default: localhost:6379)
// - `IPTRIAGE_REDIS_PASSWORD`: Redis password (optional)
// - `IPTRIAGE_REDIS_DB`: Logical database index (default: 0)
// - `IPTRIAGE_SET_KEY`: Set holding dangerous addresses (default: dangerous_ips)
//
// ### Resolver
// - `IPTRIAGE_FAILURE_POLICY`: open or closed (default: open)
// - `IPTRIAGE_QUERY_TIMEOUT_MS`: Per-query deadline (optional)
//
// ### Logging
// - `IPTRIAGE_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export IPTRIAGE_REDIS_ADDR=redis.internal:6379
// export IPTRIAGE_SET_KEY=dangerous_ips
//
// iptriaged
// ```

use anyhow::Result;
use iptriage_core::config::{ResolverConfig, ServerConfig, StoreConfig, TriageConfig};
use iptriage_core::{FailurePolicy, IngestionServer, LogSink};
use iptriage_store_redis::RedisMembershipStore;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum TriageExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure (bind, store unreachable)
    StartupError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<TriageExitCode> for ExitCode {
    fn from(code: TriageExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_addr: String,
    max_line_bytes: Option<usize>,
    redis_addr: String,
    redis_password: Option<String>,
    redis_db: i64,
    set_key: String,
    failure_policy: String,
    query_timeout_ms: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env::var("IPTRIAGE_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5050".to_string()),
            max_line_bytes: parse_optional("IPTRIAGE_MAX_LINE_BYTES")?,
            redis_addr: env::var("IPTRIAGE_REDIS_ADDR")
                .unwrap_or_else(|_| "localhost:6379".to_string()),
            redis_password: env::var("IPTRIAGE_REDIS_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            redis_db: parse_optional("IPTRIAGE_REDIS_DB")?.unwrap_or(0),
            set_key: env::var("IPTRIAGE_SET_KEY").unwrap_or_else(|_| "dangerous_ips".to_string()),
            failure_policy: env::var("IPTRIAGE_FAILURE_POLICY")
                .unwrap_or_else(|_| "open".to_string()),
            query_timeout_ms: parse_optional("IPTRIAGE_QUERY_TIMEOUT_MS")?,
            log_level: env::var("IPTRIAGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Value checks shared with library users live in `TriageConfig::validate`;
    /// this covers what only the daemon knows about.
    fn validate(&self) -> Result<()> {
        // Validate listen address shape
        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "IPTRIAGE_LISTEN_ADDR must be host:port. Got: {}",
                self.listen_addr
            );
        }

        // Validate Redis address shape
        if !self.redis_addr.contains(':') {
            anyhow::bail!(
                "IPTRIAGE_REDIS_ADDR must be host:port. Got: {}",
                self.redis_addr
            );
        }

        if let Some(max_line_bytes) = self.max_line_bytes
            && !(1..=16 * 1024 * 1024).contains(&max_line_bytes)
        {
            anyhow::bail!(
                "IPTRIAGE_MAX_LINE_BYTES must be between 1 and 16777216. Got: {}",
                max_line_bytes
            );
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPTRIAGE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_triage_config()?.validate()?;

        Ok(())
    }

    /// Build the library configuration
    fn to_triage_config(&self) -> Result<TriageConfig> {
        let failure_policy: FailurePolicy = self.failure_policy.parse()?;

        let mut server = ServerConfig {
            listen_addr: self.listen_addr.clone(),
            ..ServerConfig::default()
        };
        if let Some(max_line_bytes) = self.max_line_bytes {
            server.max_line_bytes = max_line_bytes;
        }

        Ok(TriageConfig {
            server,
            store: StoreConfig {
                addr: self.redis_addr.clone(),
                password: self.redis_password.clone(),
                db: self.redis_db,
                set_key: self.set_key.clone(),
            },
            resolver: ResolverConfig {
                failure_policy,
                query_timeout_ms: self.query_timeout_ms,
            },
        })
    }
}

/// Parse an optional numeric environment variable
fn parse_optional<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", name, raw, e)),
        _ => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return TriageExitCode::StartupError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return TriageExitCode::StartupError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TriageExitCode::StartupError.into();
    }

    info!("Starting iptriaged daemon");

    let triage_config = match config.to_triage_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {}", e);
            return TriageExitCode::StartupError.into();
        }
    };
    info!(store = ?triage_config.store, "Configuration loaded");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TriageExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        // Signal handlers are installed before the socket is bound
        let mut signals = match ShutdownSignals::install() {
            Ok(signals) => signals,
            Err(e) => {
                error!("Startup failed: {}", e);
                return TriageExitCode::StartupError;
            }
        };

        let server = match start(&triage_config).await {
            Ok(server) => server,
            Err(e) => {
                error!("Startup failed: {}", e);
                return TriageExitCode::StartupError;
            }
        };

        if let Err(e) = run_daemon(server, async move { signals.recv().await }).await {
            error!("Daemon error: {}", e);
            TriageExitCode::RuntimeError
        } else {
            TriageExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Connect the store and bind the ingestion socket
///
/// Any failure here is fatal; there is no retry.
async fn start(config: &TriageConfig) -> Result<IngestionServer> {
    let store = RedisMembershipStore::connect(&config.store).await?;
    let server = IngestionServer::bind(config, Arc::new(store), Arc::new(LogSink::new())).await?;
    info!("Listening on {}", server.local_addr());
    Ok(server)
}

/// Run the ingestion server until `shutdown` resolves
///
/// `shutdown` yields the name of the signal that stopped the daemon.
async fn run_daemon<F>(server: IngestionServer, shutdown: F) -> Result<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let signal_task = tokio::spawn(async move {
        let signal = shutdown.await;
        // The server may already be gone; nothing to notify then
        let _ = shutdown_tx.send(());
        signal
    });

    server.run_with_shutdown(Some(shutdown_rx)).await?;

    let signal = signal_task.await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    Ok(())
}

/// Installed handlers for the signals that stop the daemon
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Register SIGTERM and SIGINT handlers
    ///
    /// Must be called from within the runtime.
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

        Ok(Self { sigterm, sigint })
    }

    /// Wait for the next shutdown signal and return its name
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Shutdown on CTRL-C only
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            // Keep serving without a shutdown trigger
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iptriage_core::MemoryMembershipStore;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn base_config() -> Config {
        Config {
            listen_addr: "0.0.0.0:5050".to_string(),
            max_line_bytes: None,
            redis_addr: "localhost:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            set_key: "dangerous_ips".to_string(),
            failure_policy: "open".to_string(),
            query_timeout_ms: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());

        let triage = config.to_triage_config().unwrap();
        assert_eq!(triage.server.max_line_bytes, 64 * 1024);
        assert_eq!(triage.resolver.failure_policy, FailurePolicy::Open);
    }

    #[test]
    fn test_closed_policy_and_overrides() {
        let config = Config {
            failure_policy: "closed".to_string(),
            max_line_bytes: Some(1024),
            query_timeout_ms: Some(250),
            redis_db: 3,
            ..base_config()
        };
        let triage = config.to_triage_config().unwrap();
        assert_eq!(triage.resolver.failure_policy, FailurePolicy::Closed);
        assert_eq!(triage.server.max_line_bytes, 1024);
        assert_eq!(triage.resolver.query_timeout_ms, Some(250));
        assert_eq!(triage.store.db, 3);
    }

    #[tokio::test]
    async fn test_signal_handlers_install_without_firing() {
        let mut signals = ShutdownSignals::install().unwrap();
        let fired = tokio::time::timeout(Duration::from_millis(50), signals.recv()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_daemon_serves_until_shutdown() {
        let mut triage = base_config().to_triage_config().unwrap();
        triage.server.listen_addr = "127.0.0.1:0".to_string();
        let server = IngestionServer::bind(
            &triage,
            Arc::new(MemoryMembershipStore::new()),
            Arc::new(LogSink::new()),
        )
        .await
        .unwrap();
        let addr = server.local_addr();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let daemon = tokio::spawn(run_daemon(server, async move {
            let _ = stop_rx.await;
            "SIGTERM"
        }));

        // Still accepting while no signal has arrived
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!daemon.is_finished());
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"hello 10.0.0.1\n").await.unwrap();
        drop(stream);

        stop_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), daemon)
            .await
            .expect("daemon stops after shutdown")
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            Config { log_level: "verbose".to_string(), ..base_config() },
            Config { failure_policy: "loud".to_string(), ..base_config() },
            Config { redis_addr: "localhost".to_string(), ..base_config() },
            Config { set_key: String::new(), ..base_config() },
            Config { max_line_bytes: Some(0), ..base_config() },
            Config { redis_db: -1, ..base_config() },
        ];

        for (i, config) in cases.iter().enumerate() {
            assert!(config.validate().is_err(), "case {} should be rejected", i);
        }
    }
}
