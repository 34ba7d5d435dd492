use anyhow::bail;
use clap::{Parser, ValueEnum};
use harbor_core::application::worker::constants::{
    DEFAULT_POOL_SIZE, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, DEFAULT_RESPONSE_DELAY,
};
use harbor_core::application::PoolConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Log output style
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored
    Pretty,
    /// One JSON object per event
    Json,
}

/// Runtime configuration for the `harbor-server` binary.
///
/// Every value can come from a CLI flag or its environment variable; flags
/// win when both are set.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "harbor-server",
    version,
    about = "Thread-pool HTTP server with a bounded connection queue"
)]
pub struct CliArgs {
    /// Interface to bind.
    ///
    /// Environment variable: `HARBOR_HOST`
    #[arg(long, env = "HARBOR_HOST", default_value_t = String::from("0.0.0.0"))]
    pub host: String,

    /// TCP port to listen on.
    ///
    /// Environment variable: `HARBOR_PORT`
    #[arg(long, env = "HARBOR_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of worker threads. Each worker serves one connection at a time,
    /// so this is also the number of requests in flight.
    ///
    /// Environment variable: `HARBOR_WORKERS`
    #[arg(long, env = "HARBOR_WORKERS", default_value_t = DEFAULT_POOL_SIZE)]
    pub workers: usize,

    /// Accepted connections that may wait for a free worker. When the queue
    /// is full the server stops accepting until a worker frees a slot.
    ///
    /// Environment variable: `HARBOR_QUEUE_CAPACITY`
    #[arg(long, env = "HARBOR_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Simulated work per GET/POST request, in milliseconds.
    ///
    /// Environment variable: `HARBOR_RESPONSE_DELAY_MS`
    #[arg(
        long,
        env = "HARBOR_RESPONSE_DELAY_MS",
        default_value_t = DEFAULT_RESPONSE_DELAY.as_millis() as u64
    )]
    pub response_delay_ms: u64,

    /// Environment variable: `HARBOR_LOG_FORMAT`
    #[arg(long, env = "HARBOR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write logs to a daily rolling file in this directory.
    ///
    /// Environment variable: `HARBOR_LOG_DIR`
    #[arg(long, env = "HARBOR_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub pool: PoolConfig,
    pub response_delay: Duration,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("HARBOR_WORKERS must be greater than 0");
        }

        if args.queue_capacity == 0 {
            bail!("HARBOR_QUEUE_CAPACITY must be greater than 0");
        }

        if args.host.trim().is_empty() {
            bail!("HARBOR_HOST must not be empty");
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            pool: PoolConfig::new(args.workers, args.queue_capacity),
            response_delay: Duration::from_millis(args.response_delay_ms),
            log_format: args.log_format,
            log_dir: args.log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let mut argv = vec!["harbor-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&[
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--workers",
            "2",
            "--queue-capacity",
            "3",
            "--response-delay-ms",
            "0",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.pool, PoolConfig::new(2, 3));
        assert_eq!(config.response_delay, Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = parse(&["--workers", "0"]).unwrap_err();
        assert!(err.to_string().contains("HARBOR_WORKERS"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = parse(&["--queue-capacity", "0"]).unwrap_err();
        assert!(err.to_string().contains("HARBOR_QUEUE_CAPACITY"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(parse(&["--log-format", "xml"]).is_err());
    }
}
