// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Safety monitor.
//!
//! Watches one car's shared record and enforces its invariants: an
//! obstructed closing door re-opens, the emergency stop and overload
//! sensors escalate to emergency mode, and any structurally inconsistent
//! record (unparseable floor or status, non-boolean flag bytes, obstruction
//! reported outside door motion) escalates as well. The monitor is the only
//! writer of `emergency_mode`; everything it prints is operator-facing
//! output, not logging.
//!
//! The monitor never exits on recoverable errors; syscall failures inside
//! the shared-state layer are logged and the loop continues.

use tracing::info;

use lift_core::floor::Floor;
use lift_core::shm::{CarShared, Flag, StateGuard};
use lift_core::state::DoorState;

/// Attach to the named car and monitor it forever. Returns an exit code
/// only when the car's shared state cannot be opened.
pub fn run(car_name: &str) -> i32 {
    let shm = match CarShared::open(car_name) {
        Ok(shm) => shm,
        Err(_) => {
            println!("Unable to access car {car_name}.");
            return 1;
        }
    };
    info!(car = car_name, "safety monitor attached");
    loop {
        observe(&shm);
    }
}

/// One monitor pass: a single wait for any change, then judge the record
/// and broadcast if anything was repaired or escalated.
fn observe(shm: &CarShared) {
    let mut guard = shm.lock();
    guard.wait();
    if check(&mut guard) {
        guard.broadcast();
    }
}

/// Evaluate the record and take safety actions. Returns true when the
/// record was changed.
fn check(guard: &mut StateGuard<'_>) -> bool {
    let mut changed = false;

    if guard.flag(Flag::DoorObstruction) && guard.door() == Some(DoorState::Closing) {
        guard.set_door(DoorState::Opening);
        changed = true;
    }
    if guard.flag(Flag::EmergencyStop) && !guard.flag(Flag::EmergencyMode) {
        println!("The emergency stop button has been pressed!");
        guard.set_flag(Flag::EmergencyMode, true);
        changed = true;
    }
    if guard.flag(Flag::Overload) && !guard.flag(Flag::EmergencyMode) {
        println!("The overload sensor has been tripped!");
        guard.set_flag(Flag::EmergencyMode, true);
        changed = true;
    }
    if guard.flag_raw(Flag::EmergencyMode) != 1 && !record_consistent(guard) {
        println!("Data consistency error!");
        guard.set_flag(Flag::EmergencyMode, true);
        changed = true;
    }

    changed
}

fn record_consistent(guard: &StateGuard<'_>) -> bool {
    valid_floor_token(guard.current_token())
        && valid_floor_token(guard.destination_token())
        && valid_status_token(guard.status_token())
        && Flag::ALL.iter().all(|flag| guard.flag_raw(*flag) <= 1)
        && obstruction_plausible(guard)
}

fn valid_floor_token(token: &[u8]) -> bool {
    std::str::from_utf8(token).is_ok_and(|s| s.parse::<Floor>().is_ok())
}

fn valid_status_token(token: &[u8]) -> bool {
    std::str::from_utf8(token).is_ok_and(|s| s.parse::<DoorState>().is_ok())
}

/// An obstruction can only be sensed while the doors are moving.
fn obstruction_plausible(guard: &StateGuard<'_>) -> bool {
    guard.flag_raw(Flag::DoorObstruction) == 0
        || matches!(guard.door(), Some(DoorState::Opening | DoorState::Closing))
}

#[cfg(test)]
#[path = "safety_tests.rs"]
mod tests;
