// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use lift_controller::call::CallArgs;

#[tokio::main]
async fn main() {
    let args = CallArgs::parse();
    lift_controller::config::init_tracing(&args.log);
    std::process::exit(lift_controller::call::run(&args).await);
}
