//! Seat pools and the transitions between them.

use serde::{Deserialize, Serialize};

/// One of the three disjoint pools a seat of a showing can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatPool {
    Available,
    Reserved,
    Booked,
}

impl SeatPool {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatPool::Available => "available",
            SeatPool::Reserved => "reserved",
            SeatPool::Booked => "booked",
        }
    }
}

impl std::fmt::Display for SeatPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conditional move of a set of seats from one pool to another.
///
/// ```text
/// available --lock--> reserved --confirm--> booked
/// reserved --release--> available
/// ```
///
/// `booked` has no outgoing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatTransition {
    Lock,
    Confirm,
    Release,
}

impl SeatTransition {
    pub const ALL: [SeatTransition; 3] = [
        SeatTransition::Lock,
        SeatTransition::Confirm,
        SeatTransition::Release,
    ];

    /// Pool every requested seat must currently be in.
    pub fn source(&self) -> SeatPool {
        match self {
            SeatTransition::Lock => SeatPool::Available,
            SeatTransition::Confirm | SeatTransition::Release => SeatPool::Reserved,
        }
    }

    pub fn target(&self) -> SeatPool {
        match self {
            SeatTransition::Lock => SeatPool::Reserved,
            SeatTransition::Confirm => SeatPool::Booked,
            SeatTransition::Release => SeatPool::Available,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatTransition::Lock => "lock",
            SeatTransition::Confirm => "confirm",
            SeatTransition::Release => "release",
        }
    }
}

impl std::fmt::Display for SeatTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
