// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use lift_car::config::LogArgs;

/// Safety monitor for one elevator car.
#[derive(Parser)]
#[command(name = "safety", version, about)]
struct Cli {
    /// Car name to attach to.
    name: String,

    #[command(flatten)]
    log: LogArgs,
}

fn main() {
    let cli = Cli::parse();
    lift_car::config::init_tracing(&cli.log);
    std::process::exit(lift_car::safety::run(&cli.name));
}
