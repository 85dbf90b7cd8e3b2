//! Tracing setup for host binaries embedding the cache layer.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// With a file path, logs go to a daily-rotated file through a non-blocking
/// writer; the returned guard must be held for the life of the process or
/// buffered lines are lost. Without one, logs go to the console. RUST_LOG
/// overrides the default filter.
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
  let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| "satchel=debug".into());

  let registry = tracing_subscriber::registry().with(env_filter);

  match log_file {
    Some(path) => {
      let dir = path.parent().unwrap_or(Path::new("."));
      let name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("satchel.log");
      let file_appender = tracing_appender::rolling::daily(dir, name);
      let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

      registry
        .with(
          tracing_subscriber::fmt::layer()
            .with_ansi(false) // no ANSI in files
            .with_writer(non_blocking),
        )
        .init();
      Some(guard)
    }
    None => {
      registry.with(tracing_subscriber::fmt::layer()).init();
      None
    }
  }
}
