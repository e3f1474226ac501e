// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller session, car side.
//!
//! A car keeps one session with the controller whenever its connect intent
//! holds: connect, announce `CAR name lowest highest`, then run a status
//! sender and a directive receiver over the same socket. The sender doubles
//! as the session supervisor: when it exits (transport error, override, or
//! shutdown) the receiver is aborted, the socket is dropped, and the
//! connect loop decides whether to dial again.
//!
//! Overrides clear the connect intent; the drive loop re-asserts it on the
//! falling edge and asks the [`Connector`] for a fresh session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lift_core::floor::Floor;
use lift_core::frame::{recv_frame, send_frame};
use lift_core::message::Message;
use lift_core::shm::{CarShared, Deadline, Flag};
use lift_core::state::DoorState;

use crate::config::CarConfig;

/// Per-car intent to hold a controller session. Cleared when an override
/// takes the car out of the pool, re-asserted when the override ends.
pub struct SessionIntent(AtomicBool);

impl SessionIntent {
    pub fn new(connect: bool) -> Self {
        Self(AtomicBool::new(connect))
    }

    pub fn set(&self, connect: bool) {
        self.0.store(connect, Ordering::SeqCst);
    }

    pub fn should_connect(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawns controller sessions onto the car's runtime.
///
/// The drive loop runs on a plain thread, so it cannot spawn tasks itself;
/// it asks the connector instead. At most one session task is live at a
/// time; a respawn while the previous session is still winding down is a
/// no-op, and the survivor reconnects on its own.
pub struct Connector {
    runtime: tokio::runtime::Handle,
    config: CarConfig,
    shm: Arc<CarShared>,
    intent: Arc<SessionIntent>,
    shutdown: CancellationToken,
    session: std::sync::Mutex<Option<task::JoinHandle<()>>>,
}

impl Connector {
    pub fn new(
        runtime: tokio::runtime::Handle,
        config: CarConfig,
        shm: Arc<CarShared>,
        intent: Arc<SessionIntent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { runtime, config, shm, intent, shutdown, session: std::sync::Mutex::new(None) }
    }

    /// Ensure a session task is running.
    pub fn respawn(&self) {
        let mut slot = match self.session.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *slot = Some(self.runtime.spawn(run_session(
            self.config.clone(),
            Arc::clone(&self.shm),
            Arc::clone(&self.intent),
            self.shutdown.clone(),
        )));
    }
}

/// Connect loop: dial the controller, run one session, repeat while the
/// intent holds. A failed dial retries after one simulation delay.
async fn run_session(
    config: CarConfig,
    shm: Arc<CarShared>,
    intent: Arc<SessionIntent>,
    shutdown: CancellationToken,
) {
    while intent.should_connect() && !shutdown.is_cancelled() {
        let connect = TcpStream::connect((config.host.as_str(), config.port));
        let stream = tokio::select! {
            result = connect => result,
            _ = shutdown.cancelled() => return,
        };
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                debug!(host = %config.host, port = config.port, "controller not reachable: {e}");
                tokio::select! {
                    _ = tokio::time::sleep(config.delay) => continue,
                    _ = shutdown.cancelled() => return,
                }
            }
        };
        if !intent.should_connect() || shutdown.is_cancelled() {
            return;
        }
        info!(host = %config.host, port = config.port, "connected to controller");

        let (reader, writer) = stream.into_split();
        let receiver = tokio::spawn(receive_directives(reader, Arc::clone(&shm)));
        send_status(writer, &config, &shm, &intent, &shutdown).await;
        receiver.abort();
        let _ = receiver.await;
        debug!("controller session ended");
    }
}

/// Announce the car, then report `STATUS` whenever the wire-visible triple
/// changes, with one report per delay interval as a heartbeat. Exits on
/// transport failure or when the session should end, leaving a final
/// override notice if one applies.
async fn send_status(
    mut writer: OwnedWriteHalf,
    config: &CarConfig,
    shm: &Arc<CarShared>,
    intent: &Arc<SessionIntent>,
    shutdown: &CancellationToken,
) {
    let greeting = Message::Register {
        name: config.name.clone(),
        lowest: config.lowest,
        highest: config.highest,
    };
    if send_frame(&mut writer, &greeting.encode()).await.is_err() {
        warn!("failed to announce car to controller");
        return;
    }

    let mut last_sent: Option<(DoorState, Floor, Floor)> = None;
    while intent.should_connect() && !shutdown.is_cancelled() {
        let snapshot = {
            let shm = Arc::clone(shm);
            let delay = config.delay;
            task::spawn_blocking(move || {
                let mut guard = shm.lock();
                let deadline = Deadline::from_now(delay);
                loop {
                    let snapshot = guard.snapshot();
                    if snapshot.is_some() && snapshot != last_sent {
                        return snapshot;
                    }
                    if !guard.wait_until(&deadline) {
                        return guard.snapshot();
                    }
                }
            })
            .await
            .unwrap_or(None)
        };
        if !intent.should_connect() || shutdown.is_cancelled() {
            break;
        }
        let Some((door, current, destination)) = snapshot else {
            continue;
        };
        last_sent = Some((door, current, destination));
        let report = Message::Status { door, current, destination };
        if send_frame(&mut writer, &report.encode()).await.is_err() {
            debug!("controller link lost");
            return;
        }
    }

    // An override took the car out of the pool: tell the controller why.
    let farewell = {
        let shm = Arc::clone(shm);
        task::spawn_blocking(move || {
            let guard = shm.lock();
            if guard.flag(Flag::IndividualService) {
                Some(Message::IndividualService)
            } else if guard.flag(Flag::EmergencyMode) {
                Some(Message::Emergency)
            } else {
                None
            }
        })
        .await
        .unwrap_or(None)
    };
    if let Some(message) = farewell {
        let _ = send_frame(&mut writer, &message.encode()).await;
    }
}

/// Apply `FLOOR` directives to the shared record: a directive for the floor
/// the car is already on presses the open button, anything else becomes the
/// new destination.
async fn receive_directives(mut reader: OwnedReadHalf, shm: Arc<CarShared>) {
    loop {
        let payload = match recv_frame(&mut reader).await {
            Ok(payload) => payload,
            Err(_) => return,
        };
        match Message::parse(&payload) {
            Ok(Message::Floor(floor)) => {
                let shm = Arc::clone(&shm);
                let applied = task::spawn_blocking(move || {
                    let mut guard = shm.lock();
                    if guard.current_floor() == Some(floor) {
                        guard.set_flag(Flag::OpenButton, true);
                    } else {
                        guard.set_destination_floor(floor);
                    }
                    guard.broadcast();
                })
                .await;
                if applied.is_err() {
                    return;
                }
            }
            _ => debug!(payload = %payload, "ignoring unexpected controller message"),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
