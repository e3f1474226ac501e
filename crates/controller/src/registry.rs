// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Car registry.
//!
//! Cars register when their session opens and are removed by identity when
//! it ends. Registration order is preserved; it is the tie-breaker for car
//! selection. Each registered car carries its own mutex guarding the
//! mirrored state and the ride queue, plus the write half of its socket so
//! any worker can dispatch `FLOOR` directives.

use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, MutexGuard};

use lift_core::floor::Floor;
use lift_core::state::DoorState;

use crate::queue::RideQueue;

/// Mirrored state and scheduling queue for one registered car.
pub struct CarRecord {
    pub name: String,
    pub lowest: Floor,
    pub highest: Floor,
    pub door: DoorState,
    pub current: Floor,
    pub destination: Floor,
    pub queue: RideQueue,
    pub writer: OwnedWriteHalf,
}

impl CarRecord {
    /// Fresh record for a car that just announced itself. Until the first
    /// status report the car is assumed parked at its lowest floor.
    pub fn new(name: String, lowest: Floor, highest: Floor, writer: OwnedWriteHalf) -> Self {
        Self {
            name,
            lowest,
            highest,
            door: DoorState::Closed,
            current: lowest,
            destination: lowest,
            queue: RideQueue::new(),
            writer,
        }
    }
}

/// A registered car behind its per-car mutex.
pub struct CarHandle {
    record: Mutex<CarRecord>,
}

impl CarHandle {
    pub fn new(record: CarRecord) -> Self {
        Self { record: Mutex::new(record) }
    }

    pub async fn lock(&self) -> MutexGuard<'_, CarRecord> {
        self.record.lock().await
    }
}

/// Ordered collection of registered cars.
#[derive(Default)]
pub struct Registry {
    cars: Mutex<Vec<Arc<CarHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, car: Arc<CarHandle>) {
        self.cars.lock().await.push(car);
    }

    /// Remove a car by identity.
    pub async fn deregister(&self, car: &Arc<CarHandle>) {
        self.cars.lock().await.retain(|entry| !Arc::ptr_eq(entry, car));
    }

    /// Clone of the current car list, in registration order.
    pub async fn snapshot(&self) -> Vec<Arc<CarHandle>> {
        self.cars.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.cars.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cars.lock().await.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
