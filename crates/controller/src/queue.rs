// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-car ride queue and the directional insertion algorithm.
//!
//! The queue is an ordered list of `(floor, direction)` stops read as a
//! SCAN: a maximal run of same-direction stops is a "block", blocks are
//! served in order, and within a block the floors are monotone in the
//! block's direction. The same floor may appear twice with different
//! directions, once for an up-call and once again for the return sweep.
//!
//! Insertion of a call `(source, destination)` works against a *virtual
//! head* standing for the car's present position, so that "does the source
//! fit between these two stops" can be asked uniformly, including at the
//! front of the queue. The candidate position resets whenever the walk
//! crosses a block boundary; when both the source and (after it) the
//! destination fit inside a block running the call's direction, they are
//! spliced in there, otherwise they start a new block at the tail.

use lift_core::floor::{Direction, Floor};
use lift_core::state::DoorState;

/// One scheduled stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub floor: Floor,
    pub direction: Direction,
}

/// Ordered ride queue for one car.
#[derive(Debug, Default)]
pub struct RideQueue {
    stops: Vec<Stop>,
}

impl RideQueue {
    pub fn new() -> Self {
        Self { stops: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn first_floor(&self) -> Option<Floor> {
        self.stops.first().map(|stop| stop.floor)
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Insert after `index` unless the entry already there is the exact
    /// same stop. Returns whether anything was inserted.
    fn add_after(&mut self, index: usize, floor: Floor, direction: Direction) -> bool {
        let stop = Stop { floor, direction };
        if self.stops.get(index + 1) == Some(&stop) {
            return false;
        }
        self.stops.insert(index + 1, stop);
        true
    }

    fn push_front(&mut self, floor: Floor, direction: Direction) {
        self.stops.insert(0, Stop { floor, direction });
    }

    pub fn pop_front(&mut self) {
        if !self.stops.is_empty() {
            self.stops.remove(0);
        }
    }

    /// Pop up to two leading stops at the arrival floor. Two, because a
    /// reversing sweep may have queued the same floor in both directions;
    /// a second leading stop at a different floor stays put.
    pub fn pop_arrived(&mut self, floor: Floor) {
        for _ in 0..2 {
            if self.stops.first().map(|stop| stop.floor) == Some(floor) {
                self.stops.remove(0);
            }
        }
    }

    /// Splice a call into the queue, given the car's live state.
    pub fn schedule(
        &mut self,
        door: DoorState,
        current: Floor,
        destination: Floor,
        source: Floor,
        dest: Floor,
    ) {
        let call_dir = source.direction_to(dest);
        let virtual_added = self.add_virtual(door, current, destination, call_dir);

        if self.stops.is_empty() {
            // Nothing queued and no virtual head (the car is mid-step
            // toward this very floor): the call simply starts the queue.
            self.stops.push(Stop { floor: source, direction: call_dir });
            self.add_after(0, dest, call_dir);
            return;
        }

        let mut prev = 0usize;
        let mut cur = 1usize;
        let mut suitable: Option<usize> = None;

        // Too late to board the current stop once the doors are closing:
        // step past the head so the call lands in a later block.
        if self.stops.len() > 1
            && self.stops[0].floor == source
            && self.stops[0].direction == call_dir
            && door == DoorState::Closing
        {
            prev = 1;
            cur = 2;
        }

        while cur < self.stops.len() {
            let pd = self.stops[prev].direction;
            let cd = self.stops[cur].direction;

            // Crossed into another block: the earlier candidate is void.
            if pd != cd {
                suitable = None;
            }
            // A block running against the call never accepts it.
            if pd == cd && pd != call_dir {
                prev = cur;
                cur += 1;
                continue;
            }

            if (pd != call_dir || fits(self.stops[prev].floor, source, call_dir))
                && (cd != call_dir || fits(source, self.stops[cur].floor, call_dir))
            {
                suitable = Some(prev);
            }
            if suitable.is_some()
                && (pd != call_dir || fits(self.stops[prev].floor, dest, call_dir))
                && (cd != call_dir || fits(dest, self.stops[cur].floor, call_dir))
            {
                break;
            }

            prev = cur;
            cur += 1;
        }

        match suitable {
            // No block takes the call: append a fresh block at the tail.
            None => {
                self.add_after(prev, source, call_dir);
                self.add_after(prev + 1, dest, call_dir);
            }
            Some(pos) => {
                let inserted = self.add_after(pos, source, call_dir);
                let target = if pos == prev {
                    pos + 1
                } else if inserted {
                    prev + 1
                } else {
                    prev
                };
                self.add_after(target, dest, call_dir);
            }
        }

        if virtual_added {
            self.pop_front();
        }
    }

    /// Prepend the car's present position so the insertion walk can treat
    /// it like any other stop. Returns whether a node was actually added.
    ///
    /// A moving car is represented by the floor it will reach next; if that
    /// is already its destination the motion covers it and no head is
    /// needed. For a parked car the head's direction comes from the first
    /// real entry (same floor: that entry's direction, otherwise the travel
    /// direction toward it); `call_dir` is only the fallback for an empty
    /// queue.
    fn add_virtual(
        &mut self,
        door: DoorState,
        current: Floor,
        destination: Floor,
        call_dir: Direction,
    ) -> bool {
        if door == DoorState::Between {
            let direction = current.direction_to(destination);
            let next = current.step(direction);
            if next == destination {
                return false;
            }
            self.push_front(next, direction);
            return true;
        }

        let direction = match self.stops.first() {
            None => call_dir,
            Some(first) if first.floor == current => first.direction,
            Some(first) => current.direction_to(first.floor),
        };
        self.push_front(current, direction);
        true
    }
}

/// Whether `before` may precede `after` inside a block running `direction`.
/// Equal floors are always in order.
fn fits(before: Floor, after: Floor, direction: Direction) -> bool {
    before == after
        || match direction {
            Direction::Up => before <= after,
            Direction::Down => after <= before,
        }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
