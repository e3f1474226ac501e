// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::str::FromStr;

use crate::error::ErrorKind;

/// Door and motion status of a car. The `as_str` forms are the exact tokens
/// carried in `STATUS` frames and stored in the shared state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Opening,
    Open,
    Closing,
    Closed,
    Between,
}

impl DoorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Open => "Open",
            Self::Closing => "Closing",
            Self::Closed => "Closed",
            Self::Between => "Between",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorState {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Opening" => Ok(Self::Opening),
            "Open" => Ok(Self::Open),
            "Closing" => Ok(Self::Closing),
            "Closed" => Ok(Self::Closed),
            "Between" => Ok(Self::Between),
            _ => Err(ErrorKind::InvalidMessage),
        }
    }
}
