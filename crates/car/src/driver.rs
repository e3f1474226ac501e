// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The car drive loop: door and motion state machine.
//!
//! Runs on a dedicated blocking thread, holding the shared record's mutex
//! except while waiting on its condition variable or sleeping between
//! floors. Every pass handles door buttons, reacts to override edges, and
//! services pending motion; the timed wait bounds each pass to one
//! simulation delay so external writers are picked up promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use lift_core::shm::{CarShared, Deadline, Flag, StateGuard};
use lift_core::state::DoorState;

use crate::config::CarConfig;
use crate::session::{Connector, SessionIntent};

pub struct Driver {
    shm: Arc<CarShared>,
    config: CarConfig,
    intent: Arc<SessionIntent>,
    connector: Arc<Connector>,
    keep_running: Arc<AtomicBool>,
}

impl Driver {
    pub fn new(
        shm: Arc<CarShared>,
        config: CarConfig,
        intent: Arc<SessionIntent>,
        connector: Arc<Connector>,
        keep_running: Arc<AtomicBool>,
    ) -> Self {
        Self { shm, config, intent, connector, keep_running }
    }

    /// Run until the keep-running flag clears.
    pub fn run(&self) {
        let mut last_service = false;
        let mut last_emergency = false;

        while self.keep_running.load(Ordering::SeqCst) {
            let mut guard = self.shm.lock();
            let deadline = Deadline::from_now(self.config.delay);
            guard.wait_until(&deadline);

            if guard.flag(Flag::OpenButton) {
                guard.set_flag(Flag::OpenButton, false);
                self.open_doors(&mut guard);
            }
            if guard.flag(Flag::CloseButton) {
                guard.set_flag(Flag::CloseButton, false);
                self.close_doors(&mut guard);
            }

            // Override edges drive the controller session: entering either
            // override drops the session, leaving one restores it.
            if !guard.flag(Flag::IndividualService) && last_service {
                info!("leaving individual service mode");
                self.intent.set(true);
                self.connector.respawn();
            }
            if !guard.flag(Flag::EmergencyMode) && last_emergency {
                info!("leaving emergency mode");
                self.intent.set(true);
                self.connector.respawn();
            }
            if guard.flag(Flag::EmergencyMode) {
                self.intent.set(false);
            }

            if guard.flag(Flag::IndividualService) {
                if !last_service {
                    info!("entering individual service mode");
                    self.intent.set(false);
                }
                if !guard.flag(Flag::EmergencyMode) && wants_motion(&guard) {
                    guard = self.travel(guard);
                }
            }

            if !guard.flag(Flag::IndividualService) && !guard.flag(Flag::EmergencyMode) {
                // Normal service: closed doors plus a pending destination
                // means move, then open for the passengers.
                if wants_motion(&guard) && guard.door() == Some(DoorState::Closed) {
                    guard = self.travel(guard);
                    self.open_doors(&mut guard);
                }
            }

            last_service = guard.flag(Flag::IndividualService);
            last_emergency = guard.flag(Flag::EmergencyMode);
        }
    }

    /// Door-open sequence. Holds the lock throughout, releasing only inside
    /// timed waits; a close-button press during a wait pivots into the close
    /// sequence.
    fn open_doors(&self, guard: &mut StateGuard<'_>) {
        loop {
            match guard.door() {
                Some(DoorState::Open) => break,
                Some(DoorState::Closed | DoorState::Closing) => {
                    guard.set_door(DoorState::Opening);
                    guard.broadcast();
                    let deadline = Deadline::from_now(self.config.delay);
                    while guard.wait_until(&deadline) {
                        if guard.flag(Flag::CloseButton) {
                            self.close_doors(guard);
                            return;
                        }
                    }
                    if guard.door() == Some(DoorState::Opening) {
                        guard.set_door(DoorState::Open);
                        guard.broadcast();
                    }
                }
                Some(DoorState::Opening) => {
                    guard.set_door(DoorState::Open);
                    guard.broadcast();
                }
                _ => return,
            }
        }

        // In an override the doors stay open for the operator. Otherwise
        // hold them open for one delay, then close unless someone else
        // already did.
        if !guard.flag(Flag::IndividualService) && !guard.flag(Flag::EmergencyMode) {
            let deadline = Deadline::from_now(self.config.delay);
            while guard.wait_until(&deadline) {
                if guard.flag(Flag::CloseButton) {
                    self.close_doors(guard);
                    return;
                }
            }
        }
        if !guard.flag(Flag::IndividualService)
            && !guard.flag(Flag::EmergencyMode)
            && guard.door() == Some(DoorState::Open)
        {
            self.close_doors(guard);
        }
    }

    /// Door-close sequence, mirror of [`Self::open_doors`]. An open-button
    /// press during a wait pivots back into the open sequence; the safety
    /// monitor may flip `Closing` back to `Opening` on an obstruction, which
    /// re-dispatches here until the way is clear.
    fn close_doors(&self, guard: &mut StateGuard<'_>) {
        loop {
            match guard.door() {
                Some(DoorState::Closed) => break,
                Some(DoorState::Open | DoorState::Opening) => {
                    guard.set_door(DoorState::Closing);
                    guard.broadcast();
                    let deadline = Deadline::from_now(self.config.delay);
                    while guard.wait_until(&deadline) {
                        if guard.flag(Flag::OpenButton) {
                            self.open_doors(guard);
                            return;
                        }
                    }
                    if guard.door() == Some(DoorState::Closing) {
                        guard.set_door(DoorState::Closed);
                        guard.broadcast();
                    }
                }
                Some(DoorState::Closing) => {
                    guard.set_door(DoorState::Closed);
                    guard.broadcast();
                }
                _ => return,
            }
        }
    }

    /// Move floor by floor toward the destination. The lock is released
    /// around each between-floors sleep so overrides and the safety monitor
    /// can preempt mid-journey. A destination outside the car's range is
    /// snapped back to the current floor.
    fn travel<'a>(&'a self, mut guard: StateGuard<'a>) -> StateGuard<'a> {
        let (Some(current), Some(destination)) = (guard.current_floor(), guard.destination_floor())
        else {
            return guard;
        };
        if !destination.within(self.config.lowest, self.config.highest) {
            debug!(%destination, "destination out of range, staying at {current}");
            guard.set_destination_floor(current);
            guard.broadcast();
            return guard;
        }

        let direction = current.direction_to(destination);
        loop {
            let (Some(current), Some(destination)) =
                (guard.current_floor(), guard.destination_floor())
            else {
                break;
            };
            if current == destination {
                break;
            }
            guard.set_door(DoorState::Between);
            guard.broadcast();
            drop(guard);
            std::thread::sleep(self.config.delay);
            guard = self.shm.lock();
            if let Some(reached) = guard.current_floor() {
                guard.set_current_floor(reached.step(direction));
            }
        }

        guard.set_flag(Flag::OpenButton, false);
        guard.set_flag(Flag::CloseButton, false);
        guard.set_door(DoorState::Closed);
        guard.broadcast();
        guard
    }
}

fn wants_motion(guard: &StateGuard<'_>) -> bool {
    match (guard.current_floor(), guard.destination_floor()) {
        (Some(current), Some(destination)) => current != destination,
        _ => false,
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
