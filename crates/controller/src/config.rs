// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Logging options shared by the controller-side binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Log format (json or text).
    #[arg(long, env = "LIFT_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LIFT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Central elevator controller.
#[derive(Debug, Parser)]
#[command(name = "controller", version, about)]
pub struct Config {
    /// Host address to bind.
    #[arg(long, env = "LIFT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, env = "LIFT_PORT", default_value = "3000")]
    pub port: u16,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Initialize tracing/logging from the log options.
///
/// Logs go to stderr; stdout stays reserved for tool output. Uses
/// `try_init` so it's safe to call multiple times from tests.
pub fn init_tracing(log: &LogArgs) {
    use tracing_subscriber::fmt;

    // Priority: --log-level / LIFT_LOG_LEVEL > RUST_LOG > default ("info").
    let filter = if std::env::var("LIFT_LOG_LEVEL").is_err() && log.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.log_level))
    } else {
        EnvFilter::try_new(&log.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match log.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}
