// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal command tool operations.
//!
//! One-shot writers into a car's shared record: door buttons, emergency
//! stop, individual service mode, and manual floor-by-floor nudges while in
//! service mode. Every operation holds the record mutex and broadcasts on
//! success; precondition failures leave the record untouched.

use lift_core::floor::Direction;
use lift_core::shm::{CarShared, Flag, StateGuard};
use lift_core::state::DoorState;

/// Open the named car's shared state and apply one operation. The returned
/// exit code and stdout line are the tool's whole interface.
pub fn run(car_name: &str, operation: &str) -> i32 {
    let shm = match CarShared::open(car_name) {
        Ok(shm) => shm,
        Err(_) => {
            println!("Unable to access car {car_name}.");
            return 1;
        }
    };
    match apply(&shm, operation) {
        Ok(()) => 0,
        Err(e) => {
            println!("{e}");
            1
        }
    }
}

/// Apply one named operation under the record mutex.
pub fn apply(shm: &CarShared, operation: &str) -> anyhow::Result<()> {
    let mut guard = shm.lock();
    match operation {
        "open" => guard.set_flag(Flag::OpenButton, true),
        "close" => guard.set_flag(Flag::CloseButton, true),
        "stop" => guard.set_flag(Flag::EmergencyStop, true),
        "service_on" => {
            guard.set_flag(Flag::IndividualService, true);
            guard.set_flag(Flag::EmergencyMode, false);
        }
        "service_off" => guard.set_flag(Flag::IndividualService, false),
        "up" => nudge(&mut guard, Direction::Up)?,
        "down" => nudge(&mut guard, Direction::Down)?,
        _ => anyhow::bail!("Invalid operation."),
    }
    guard.broadcast();
    Ok(())
}

/// Manual single-floor move, only while parked in individual service mode.
fn nudge(guard: &mut StateGuard<'_>, direction: Direction) -> anyhow::Result<()> {
    if !guard.flag(Flag::IndividualService) {
        anyhow::bail!("Operation only allowed in service mode.");
    }
    match guard.door() {
        Some(DoorState::Between) => {
            anyhow::bail!("Operation not allowed while elevator is moving.")
        }
        Some(DoorState::Closed) => {}
        _ => anyhow::bail!("Operation not allowed while doors are open."),
    }
    let Some(current) = guard.current_floor() else {
        anyhow::bail!("Car state is inconsistent.");
    };
    guard.set_destination_floor(current.step(direction));
    Ok(())
}

#[cfg(test)]
#[path = "internal_tests.rs"]
mod tests;
