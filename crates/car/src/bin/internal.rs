// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use lift_car::config::LogArgs;

/// Internal command panel for one elevator car.
#[derive(Parser)]
#[command(name = "internal", version, about)]
struct Cli {
    /// Car name to operate on.
    name: String,

    /// Operation: open, close, stop, service_on, service_off, up, down.
    operation: String,

    #[command(flatten)]
    log: LogArgs,
}

fn main() {
    let cli = Cli::parse();
    lift_car::config::init_tracing(&cli.log);
    std::process::exit(lift_car::internal::run(&cli.name, &cli.operation));
}
