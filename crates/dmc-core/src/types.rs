use serde::{Deserialize, Serialize};

/// Orientation of a leg at a vertex, or of an end of a line.
///
/// For a vertex, `In` indexes the incoming propagator leg and `Out` the
/// outgoing one. For a line, `ends[In]` is where momentum enters the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dir {
    /// Incoming leg / start of a line.
    In,
    /// Outgoing leg / end of a line.
    Out,
}

impl Dir {
    /// Both orientations in index order.
    pub const ALL: [Dir; 2] = [Dir::In, Dir::Out];

    /// Array index for `[T; 2]` storage.
    pub const fn index(self) -> usize {
        match self {
            Dir::In => 0,
            Dir::Out => 1,
        }
    }

    /// The opposite orientation.
    pub const fn flip(self) -> Dir {
        match self {
            Dir::In => Dir::Out,
            Dir::Out => Dir::In,
        }
    }

    /// `+1` for `In`, `-1` for `Out`.
    pub const fn sign(self) -> i64 {
        match self {
            Dir::In => 1,
            Dir::Out => -1,
        }
    }

    /// Maps `0` to `In` and anything else to `Out`.
    pub const fn from_bit(bit: i64) -> Dir {
        if bit == 0 {
            Dir::In
        } else {
            Dir::Out
        }
    }
}

/// Spin-1/2 projection carried by a propagator leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Spin {
    /// Projection -1/2.
    Down,
    /// Projection +1/2.
    Up,
}

impl Spin {
    /// The opposite projection.
    pub const fn flip(self) -> Spin {
        match self {
            Spin::Down => Spin::Up,
            Spin::Up => Spin::Down,
        }
    }

    /// `+1` for up, `-1` for down.
    pub const fn sign(self) -> i64 {
        match self {
            Spin::Down => -1,
            Spin::Up => 1,
        }
    }
}
