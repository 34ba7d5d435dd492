//! Tracing subscriber setup

use crate::config::LogFormat;
use anyhow::Result;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "harbor=info";
const LOG_FILE_PREFIX: &str = "harbor-server.log";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `harbor=info` filter. The returned guard
/// flushes the file writer on drop and must outlive the server.
pub fn init(format: LogFormat, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_layer(file_writer))
                .try_init()?;
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .with(file_layer(file_writer))
                .try_init()?;
        }
    }

    Ok(guard)
}

/// Plain-text file output, no ANSI escapes
fn file_layer<S>(writer: Option<NonBlocking>) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false))
}
