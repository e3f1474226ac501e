// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Car process entry: create the shared record, start the controller
//! session machinery, and run the drive loop until SIGINT.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::info;

use lift_core::shm::CarShared;

use crate::config::CarArgs;
use crate::driver::Driver;
use crate::session::{Connector, SessionIntent};

pub async fn run(args: CarArgs) -> anyhow::Result<()> {
    let config = args.validate()?;

    let shm = Arc::new(
        CarShared::create(&config.name, config.lowest)
            .map_err(|e| anyhow::anyhow!("Unable to create shared state for car {}: {e}", config.name))?,
    );

    let shutdown = CancellationToken::new();
    let keep_running = Arc::new(AtomicBool::new(true));
    let intent = Arc::new(SessionIntent::new(true));
    let connector = Arc::new(Connector::new(
        tokio::runtime::Handle::current(),
        config.clone(),
        Arc::clone(&shm),
        Arc::clone(&intent),
        shutdown.clone(),
    ));
    connector.respawn();

    // SIGINT clears the keep-running flag; the drive loop notices within
    // one delay interval.
    {
        let keep_running = Arc::clone(&keep_running);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                keep_running.store(false, Ordering::SeqCst);
                shutdown.cancel();
            }
        });
    }

    info!(
        car = %config.name,
        lowest = %config.lowest,
        highest = %config.highest,
        delay_ms = config.delay.as_millis() as u64,
        "car ready"
    );

    let driver = Driver::new(
        Arc::clone(&shm),
        config,
        intent,
        connector,
        Arc::clone(&keep_running),
    );
    task::spawn_blocking(move || driver.run()).await.context("drive loop thread panicked")?;

    shutdown.cancel();
    shm.unlink();
    Ok(())
}
