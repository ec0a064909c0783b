//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter from `RUST_LOG`, falling back to `default_level`.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing: compact output on stdout, plus a plain-text copy in
/// `log_file` when one is given.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for as long as the process logs.
pub fn init_tracing(default_level: &str, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file.and_then(file_writer) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false) // No ANSI colors in files
                    .compact(),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .compact(),
        )
        .with(file_layer)
        .try_init()
        .ok(); // Ignore error if already initialized

    guard
}

fn file_writer(path: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create log directory {}: {e}", dir.display());
        return None;
    }

    let appender = tracing_appender::rolling::never(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}
