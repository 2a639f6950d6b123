// Logging setup for the binary: `tracing` events, with `log` records from
// dependencies forwarded through `tracing-log`.

use std::io;

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

// Used when RUST_LOG isn't set; the engine and the metastore are chatty at debug level
const DEFAULT_DIRECTIVES: &str = "info,cranelift_codegen=warn,wasmtime=warn,sqlx=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber. Logs go to stderr so that command output on
/// stdout stays machine-readable.
pub fn init_logging(json_logs: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    LogTracer::init()?;

    if json_logs {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}
