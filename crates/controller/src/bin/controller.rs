// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lift_controller::config::Config;
use lift_controller::server::Server;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    lift_controller::config::init_tracing(&config.log);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                shutdown.cancel();
            }
        });
    }

    match Server::bind(&config.host, config.port).await {
        Ok(server) => server.serve(shutdown).await,
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}
