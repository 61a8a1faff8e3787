use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;

pub use formatter::*;

use crate::configs::Config;

/// Builds the filter directive from the logging section and the client's
/// debug switch. `RUST_LOG` still takes precedence in [`init`].
pub fn filter_directive(config: &Config) -> String {
    let log_level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");

    let filters = config
        .logging
        .as_ref()
        .and_then(|l| l.filters.as_deref())
        .unwrap_or("");

    let mut directive = log_level.to_string();
    if config.client.debug {
        directive.push_str(",rustalink_client=debug");
    }
    if !filters.is_empty() {
        directive.push(',');
        directive.push_str(filters);
    }
    directive
}

/// Installs a global subscriber. Libraries embedding the client usually
/// bring their own; this is for binaries that don't.
pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let ansi = config
        .logging
        .as_ref()
        .map(|l| l.ansi)
        .unwrap_or(true);

    let stdout_layer = fmt::layer()
        .event_format(ClientFormatter::new(ansi))
        .with_ansi(ansi);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();
}
