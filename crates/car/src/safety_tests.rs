// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn unique(tag: &str) -> String {
    format!("safetytest{}{tag}", std::process::id())
}

fn fresh(tag: &str) -> CarShared {
    CarShared::create(&unique(tag), Floor::Level(1)).unwrap()
}

#[test]
fn obstruction_reopens_closing_doors() {
    let shm = fresh("obstruct");
    let mut guard = shm.lock();
    guard.set_door(DoorState::Closing);
    guard.set_flag(Flag::DoorObstruction, true);
    assert!(check(&mut guard));
    assert_eq!(guard.door(), Some(DoorState::Opening));
    assert!(!guard.flag(Flag::EmergencyMode));
}

#[test]
fn obstruction_while_opening_is_left_alone() {
    let shm = fresh("opening");
    let mut guard = shm.lock();
    guard.set_door(DoorState::Opening);
    guard.set_flag(Flag::DoorObstruction, true);
    assert!(!check(&mut guard));
    assert_eq!(guard.door(), Some(DoorState::Opening));
}

#[test]
fn emergency_stop_escalates() {
    let shm = fresh("estop");
    let mut guard = shm.lock();
    guard.set_flag(Flag::EmergencyStop, true);
    assert!(check(&mut guard));
    assert!(guard.flag(Flag::EmergencyMode));
}

#[test]
fn overload_escalates() {
    let shm = fresh("overload");
    let mut guard = shm.lock();
    guard.set_flag(Flag::Overload, true);
    assert!(check(&mut guard));
    assert!(guard.flag(Flag::EmergencyMode));
}

#[test]
fn escalation_is_idempotent() {
    let shm = fresh("idem");
    let mut guard = shm.lock();
    guard.set_flag(Flag::EmergencyMode, true);
    guard.set_flag(Flag::EmergencyStop, true);
    guard.set_flag(Flag::Overload, true);
    // Already in emergency mode: nothing to change, and never back to 0.
    assert!(!check(&mut guard));
    assert!(guard.flag(Flag::EmergencyMode));
    assert!(!check(&mut guard));
    assert!(guard.flag(Flag::EmergencyMode));
}

#[test]
fn obstruction_outside_door_motion_is_inconsistent() {
    let shm = fresh("inconsistent");
    let mut guard = shm.lock();
    guard.set_flag(Flag::DoorObstruction, true); // doors are Closed
    assert!(check(&mut guard));
    assert!(guard.flag(Flag::EmergencyMode));
}

#[test]
fn consistent_record_passes_untouched() {
    let shm = fresh("clean");
    let mut guard = shm.lock();
    assert!(!check(&mut guard));
    assert!(!guard.flag(Flag::EmergencyMode));
    assert_eq!(guard.door(), Some(DoorState::Closed));
}

#[test]
fn floor_token_validation() {
    assert!(valid_floor_token(b"1"));
    assert!(valid_floor_token(b"999"));
    assert!(valid_floor_token(b"B99"));
    assert!(!valid_floor_token(b""));
    assert!(!valid_floor_token(b"0"));
    assert!(!valid_floor_token(b"B0"));
    assert!(!valid_floor_token(b"B100"));
    assert!(!valid_floor_token(b"12a"));
    assert!(!valid_floor_token(&[0xff, 0xfe]));
}

#[test]
fn status_token_validation() {
    for token in ["Opening", "Open", "Closing", "Closed", "Between"] {
        assert!(valid_status_token(token.as_bytes()));
    }
    assert!(!valid_status_token(b"open"));
    assert!(!valid_status_token(b""));
    assert!(!valid_status_token(b"Ajar"));
}
