// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire messages.
//!
//! Payloads are ASCII with space-separated tokens. `CAR` is overloaded by
//! arity: three arguments open a car session, one argument is the
//! controller's reply to a call pad.

use std::fmt;

use crate::error::ErrorKind;
use crate::floor::Floor;
use crate::state::DoorState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `CALL <src> <dst>`: call pad requests a ride.
    Call { source: Floor, destination: Floor },
    /// `CAR <name> <lowest> <highest>`: car opens a controller session.
    Register { name: String, lowest: Floor, highest: Floor },
    /// `STATUS <status> <current> <destination>`: car state report.
    Status { door: DoorState, current: Floor, destination: Floor },
    /// `FLOOR <floor>`: controller directs a car to a floor.
    Floor(Floor),
    /// `CAR <name>`: controller accepts a call.
    Assigned(String),
    /// `UNAVAILABLE`: no registered car can serve the call.
    Unavailable,
    /// `INVALID`: unrecognised or malformed session opener.
    Invalid,
    /// `INDIVIDUAL SERVICE`: car leaves the pool for operator control.
    IndividualService,
    /// `EMERGENCY`: car leaves the pool in emergency mode.
    Emergency,
}

impl Message {
    pub fn parse(payload: &str) -> Result<Self, ErrorKind> {
        let tokens: Vec<&str> = payload.split(' ').collect();
        match tokens.as_slice() {
            ["CALL", src, dst] => {
                Ok(Self::Call { source: floor_token(src)?, destination: floor_token(dst)? })
            }
            ["CAR", name, lo, hi] => Ok(Self::Register {
                name: (*name).to_owned(),
                lowest: floor_token(lo)?,
                highest: floor_token(hi)?,
            }),
            ["CAR", name] => Ok(Self::Assigned((*name).to_owned())),
            ["STATUS", door, cur, dst] => Ok(Self::Status {
                door: door.parse()?,
                current: floor_token(cur)?,
                destination: floor_token(dst)?,
            }),
            ["FLOOR", f] => Ok(Self::Floor(floor_token(f)?)),
            ["UNAVAILABLE"] => Ok(Self::Unavailable),
            ["INVALID"] => Ok(Self::Invalid),
            ["INDIVIDUAL", "SERVICE"] => Ok(Self::IndividualService),
            ["EMERGENCY"] => Ok(Self::Emergency),
            _ => Err(ErrorKind::InvalidMessage),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

fn floor_token(token: &str) -> Result<Floor, ErrorKind> {
    token.parse().map_err(|_| ErrorKind::InvalidMessage)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call { source, destination } => write!(f, "CALL {source} {destination}"),
            Self::Register { name, lowest, highest } => write!(f, "CAR {name} {lowest} {highest}"),
            Self::Status { door, current, destination } => {
                write!(f, "STATUS {door} {current} {destination}")
            }
            Self::Floor(floor) => write!(f, "FLOOR {floor}"),
            Self::Assigned(name) => write!(f, "CAR {name}"),
            Self::Unavailable => f.write_str("UNAVAILABLE"),
            Self::Invalid => f.write_str("INVALID"),
            Self::IndividualService => f.write_str("INDIVIDUAL SERVICE"),
            Self::Emergency => f.write_str("EMERGENCY"),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
