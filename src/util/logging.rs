use std::path::Path;

use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter directive for the given verbosity.
pub fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        "beatline=debug,warn"
    } else {
        "beatline=info,warn"
    }
}

/// Initialize the logging system with tracing.
///
/// Logs go to stderr. If `log_dir` is provided, they are also written to a
/// daily-rolling file in that directory. `RUST_LOG` overrides the filter.
pub fn init_logging(log_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "beatline.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The writer thread must outlive every log call; init runs once per process.
        std::mem::forget(guard);

        registry
            .with(stderr_layer)
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()?;
    } else {
        registry.with(stderr_layer).try_init()?;
    }

    Ok(())
}
