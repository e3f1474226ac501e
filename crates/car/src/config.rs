// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lift_core::floor::Floor;
use lift_core::shm;

/// Logging options shared by every car-side binary.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Log format (json or text).
    #[arg(long, env = "LIFT_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LIFT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Elevator car process.
#[derive(Debug, Parser)]
#[command(name = "car", version, about)]
pub struct CarArgs {
    /// Car name; also names the shared state object.
    pub name: String,

    /// Lowest floor this car serves.
    pub lowest: String,

    /// Highest floor this car serves.
    pub highest: String,

    /// Simulation step delay in milliseconds.
    pub delay_ms: String,

    /// Controller host.
    #[arg(long, env = "LIFT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Controller TCP port.
    #[arg(long, env = "LIFT_PORT", default_value = "3000")]
    pub port: u16,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Validated car configuration.
#[derive(Debug, Clone)]
pub struct CarConfig {
    pub name: String,
    pub lowest: Floor,
    pub highest: Floor,
    pub delay: Duration,
    pub host: String,
    pub port: u16,
}

impl CarArgs {
    /// Validate arguments, with the rejection messages operators expect.
    pub fn validate(&self) -> anyhow::Result<CarConfig> {
        let floors = (self.lowest.parse::<Floor>(), self.highest.parse::<Floor>());
        let (Ok(lowest), Ok(highest)) = floors else {
            anyhow::bail!("Invalid floor(s) specified.");
        };
        if highest < lowest {
            anyhow::bail!("Invalid floor(s) specified.");
        }
        let Some(delay_ms) = self.delay_ms.parse::<u64>().ok().filter(|ms| *ms > 0) else {
            anyhow::bail!("Invalid delay specified.");
        };
        if shm::object_name(&self.name).is_err() {
            anyhow::bail!("Car name too long.");
        }
        Ok(CarConfig {
            name: self.name.clone(),
            lowest,
            highest,
            delay: Duration::from_millis(delay_ms),
            host: self.host.clone(),
            port: self.port,
        })
    }
}

/// Initialize tracing/logging from the log options.
///
/// Logs go to stderr so the functional stdout surface of the tools stays
/// clean. Uses `try_init` so it's safe to call multiple times from tests.
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
