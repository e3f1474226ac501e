// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;

fn unique(tag: &str) -> String {
    format!("lifttest{}{tag}", std::process::id())
}

fn level(n: u16) -> Floor {
    Floor::Level(n)
}

#[test]
fn create_initialises_record() {
    let shm = CarShared::create(&unique("init"), "B2".parse().unwrap()).unwrap();
    let guard = shm.lock();
    assert_eq!(guard.current_floor(), Some(Floor::Basement(2)));
    assert_eq!(guard.destination_floor(), Some(Floor::Basement(2)));
    assert_eq!(guard.door(), Some(DoorState::Closed));
    for flag in Flag::ALL {
        assert_eq!(guard.flag_raw(flag), 0);
    }
}

#[test]
fn open_sees_creator_writes() {
    let name = unique("openrw");
    let owner = CarShared::create(&name, level(1)).unwrap();
    let other = CarShared::open(&name).unwrap();

    {
        let mut guard = owner.lock();
        guard.set_current_floor(level(7));
        guard.set_door(DoorState::Between);
        guard.set_flag(Flag::Overload, true);
        guard.broadcast();
    }

    let guard = other.lock();
    assert_eq!(guard.current_floor(), Some(level(7)));
    assert_eq!(guard.door(), Some(DoorState::Between));
    assert!(guard.flag(Flag::Overload));
    assert!(!guard.flag(Flag::EmergencyStop));
}

#[test]
fn open_missing_object_fails() {
    assert_eq!(CarShared::open(&unique("missing")).err(), Some(ErrorKind::ShmUnavailable));
}

#[test]
fn object_name_validation() {
    assert!(object_name("alpha").is_ok());
    assert_eq!(object_name("").err(), Some(ErrorKind::BadArgument));
    assert_eq!(object_name(&"x".repeat(300)).err(), Some(ErrorKind::BadArgument));
}

#[test]
fn unlink_removes_name_for_new_attachments() {
    let name = unique("unlink");
    let owner = CarShared::create(&name, level(1)).unwrap();
    owner.unlink();
    owner.unlink(); // second call is a no-op
    assert_eq!(CarShared::open(&name).err(), Some(ErrorKind::ShmUnavailable));
}

#[test]
fn wait_until_times_out_without_broadcast() {
    let shm = CarShared::create(&unique("timeout"), level(1)).unwrap();
    let mut guard = shm.lock();
    let start = Instant::now();
    let woken = guard.wait_until(&Deadline::from_now(Duration::from_millis(30)));
    assert!(!woken);
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn broadcast_wakes_waiter() {
    let shm = Arc::new(CarShared::create(&unique("wake"), level(1)).unwrap());

    let waiter = {
        let shm = Arc::clone(&shm);
        std::thread::spawn(move || {
            let mut guard = shm.lock();
            let mut woken = false;
            let deadline = Deadline::from_now(Duration::from_secs(2));
            while !guard.flag(Flag::OpenButton) {
                woken = guard.wait_until(&deadline);
                if !woken {
                    break;
                }
            }
            (woken, guard.flag(Flag::OpenButton))
        })
    };

    std::thread::sleep(Duration::from_millis(50));
    {
        let mut guard = shm.lock();
        guard.set_flag(Flag::OpenButton, true);
        guard.broadcast();
    }

    let (woken, seen) = waiter.join().unwrap();
    assert!(woken);
    assert!(seen);
}

#[test]
fn snapshot_requires_all_fields() {
    let shm = CarShared::create(&unique("snap"), level(4)).unwrap();
    let guard = shm.lock();
    assert_eq!(guard.snapshot(), Some((DoorState::Closed, level(4), level(4))));
}
