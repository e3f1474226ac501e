// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use lift_car::config::CarArgs;

#[tokio::main]
async fn main() {
    let args = CarArgs::parse();
    lift_car::config::init_tracing(&args.log);

    if let Err(e) = lift_car::run::run(args).await {
        println!("{e}");
        std::process::exit(1);
    }
}
