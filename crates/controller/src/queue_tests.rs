// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

fn fl(s: &str) -> Floor {
    s.parse().unwrap()
}

fn stops(entries: &[(&str, Direction)]) -> Vec<Stop> {
    entries.iter().map(|(f, d)| Stop { floor: fl(f), direction: *d }).collect()
}

use Direction::{Down as D, Up as U};

#[test]
fn first_call_on_idle_car() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("1"), fl("5"));
    assert_eq!(queue.stops(), stops(&[("1", U), ("5", U)]));
}

#[test]
fn up_sweep_orders_calls_and_return_starts_new_block() {
    // A car at floor 1 takes 1→5, then 3→7, then 8→2. The up-sweep absorbs
    // every up stop in floor order; the 8→2 call runs against the sweep and
    // starts the return block at the tail.
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("1"), fl("5"));
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("3"), fl("7"));
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("8"), fl("2"));
    assert_eq!(
        queue.stops(),
        stops(&[("1", U), ("3", U), ("5", U), ("7", U), ("8", D), ("2", D)])
    );

    // Arrival pops drive the dispatch order 1, 3, 5, 7, 8, 2.
    let mut order = Vec::new();
    while let Some(next) = queue.first_floor() {
        order.push(next.to_string());
        queue.pop_arrived(next);
    }
    assert_eq!(order, ["1", "3", "5", "7", "8", "2"]);
}

#[test]
fn closing_doors_push_call_into_later_block() {
    // Queue head is the stop being closed out. A same-floor same-direction
    // call arriving while the doors close must not double into the head.
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closing, fl("5"), fl("5"), fl("5"), fl("7"));
    assert_eq!(queue.stops(), stops(&[("5", U), ("7", U)]));

    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("1"), fl("5"));
    queue.pop_arrived(fl("1"));
    queue.schedule(DoorState::Closing, fl("5"), fl("5"), fl("5"), fl("7"));
    assert_eq!(queue.stops(), stops(&[("5", U), ("5", U), ("7", U)]));

    // Arrival at 5 pops the double stop and leaves the later ride.
    queue.pop_arrived(fl("5"));
    assert_eq!(queue.stops(), stops(&[("7", U)]));
}

#[test]
fn open_doors_board_immediately_without_doubling() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("1"), fl("5"));
    queue.pop_arrived(fl("1"));
    queue.schedule(DoorState::Opening, fl("5"), fl("5"), fl("5"), fl("7"));
    assert_eq!(queue.stops(), stops(&[("5", U), ("7", U)]));
}

#[test]
fn moving_car_is_placed_one_step_ahead() {
    // Car between 2 and 5 going up; a 3→4 call slots into the sweep.
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("2"), fl("5"));
    queue.pop_arrived(fl("2"));
    queue.schedule(DoorState::Between, fl("2"), fl("5"), fl("3"), fl("4"));
    assert_eq!(queue.stops(), stops(&[("3", U), ("4", U), ("5", U)]));
}

#[test]
fn moving_car_one_step_from_destination_needs_no_virtual_head() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("4"), fl("5"));
    queue.pop_arrived(fl("4"));
    queue.schedule(DoorState::Between, fl("4"), fl("5"), fl("2"), fl("3"));
    assert_eq!(queue.stops(), stops(&[("5", U), ("2", U), ("3", U)]));
}

#[test]
fn empty_queue_on_a_moving_car_takes_the_call_as_is() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Between, fl("4"), fl("5"), fl("5"), fl("2"));
    assert_eq!(queue.stops(), stops(&[("5", D), ("2", D)]));
}

#[test]
fn down_calls_merge_into_down_block() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("2"), fl("1"));
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("3"), fl("1"));
    assert_eq!(queue.stops(), stops(&[("3", D), ("2", D), ("1", D)]));
}

#[test]
fn basement_calls_order_correctly() {
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("B2"), fl("B2"), fl("B1"), fl("3"));
    queue.schedule(DoorState::Closed, fl("B2"), fl("B2"), fl("B2"), fl("1"));
    assert_eq!(queue.stops(), stops(&[("B2", U), ("B1", U), ("1", U), ("3", U)]));
}

#[test]
fn add_after_suppresses_exact_duplicates() {
    let mut queue = RideQueue::new();
    queue.stops = stops(&[("2", U)]);
    assert!(queue.add_after(0, fl("6"), U));
    assert!(!queue.add_after(0, fl("6"), U));
    assert!(queue.add_after(0, fl("6"), D)); // same floor, other direction
    assert_eq!(queue.stops(), stops(&[("2", U), ("6", D), ("6", U)]));
}

#[test]
fn repeated_call_double_stops_and_pops_together() {
    // A second identical call queues the boarding floor again; the arrival
    // pop clears both leading stops at once.
    let mut queue = RideQueue::new();
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("2"), fl("6"));
    queue.schedule(DoorState::Closed, fl("1"), fl("1"), fl("2"), fl("6"));
    assert_eq!(queue.stops(), stops(&[("2", U), ("2", U), ("6", U)]));
    queue.pop_arrived(fl("2"));
    assert_eq!(queue.stops(), stops(&[("6", U)]));
}

#[test]
fn pop_arrived_takes_at_most_two_matching_heads() {
    let mut queue = RideQueue::new();
    queue.stops = stops(&[("5", U), ("5", D), ("3", D)]);
    queue.pop_arrived(fl("5"));
    assert_eq!(queue.stops(), stops(&[("3", D)]));

    let mut queue = RideQueue::new();
    queue.stops = stops(&[("5", U), ("3", D), ("5", D)]);
    queue.pop_arrived(fl("5"));
    assert_eq!(queue.stops(), stops(&[("3", D), ("5", D)]));
}

#[test]
fn pop_front_on_empty_queue_is_a_noop() {
    let mut queue = RideQueue::new();
    queue.pop_front();
    assert!(queue.is_empty());
}

/// Every maximal same-direction run must be monotone in its direction.
fn blocks_monotone(stops: &[Stop]) -> bool {
    stops.windows(2).all(|pair| {
        if pair[0].direction != pair[1].direction {
            return true;
        }
        match pair[0].direction {
            Direction::Up => pair[0].floor <= pair[1].floor,
            Direction::Down => pair[1].floor <= pair[0].floor,
        }
    })
}

proptest! {
    // The car sits parked at its lowest floor while calls stream in, the
    // regime where every accepted call joins an ordered sweep.
    #[test]
    fn schedule_preserves_blockwise_monotonicity(
        calls in proptest::collection::vec((1u16..=10, 1u16..=10), 1..8)
    ) {
        let current = Floor::Level(1);
        let mut queue = RideQueue::new();
        for (src, dst) in calls {
            prop_assume!(src != dst);
            queue.schedule(DoorState::Closed, current, current, Floor::Level(src), Floor::Level(dst));
            prop_assert!(
                blocks_monotone(queue.stops()),
                "queue not blockwise monotone: {:?}",
                queue.stops()
            );
        }
    }
}
