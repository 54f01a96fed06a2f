//! Discrete periodic momentum.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::rng::RandomSource;

/// Momenta live in `[-MAX_K, MAX_K)` and wrap around at the edges.
pub const MAX_K: i64 = 32;

/// Number of distinct momentum values.
pub const MOMENTUM_SPACE: i64 = 2 * MAX_K;

/// A momentum value, always stored in its wrapped representative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Momentum(i64);

impl Momentum {
    /// Zero momentum.
    pub const ZERO: Momentum = Momentum(0);

    /// Wraps an arbitrary integer into the periodic momentum space.
    pub const fn new(raw: i64) -> Self {
        Self((raw + MAX_K).rem_euclid(MOMENTUM_SPACE) - MAX_K)
    }

    /// Returns the wrapped integer value.
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Draws a momentum uniformly from the whole space.
    pub fn random<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.int_in(-MAX_K, MAX_K - 1))
    }

    /// Prior probability of drawing any particular value with [`Momentum::random`].
    pub fn probability() -> f64 {
        1.0 / MOMENTUM_SPACE as f64
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Momentum {
    type Output = Momentum;

    fn add(self, rhs: Momentum) -> Momentum {
        Momentum::new(self.0 + rhs.0)
    }
}

impl Sub for Momentum {
    type Output = Momentum;

    fn sub(self, rhs: Momentum) -> Momentum {
        Momentum::new(self.0 - rhs.0)
    }
}

impl Neg for Momentum {
    type Output = Momentum;

    fn neg(self) -> Momentum {
        Momentum::new(-self.0)
    }
}

impl Mul<i64> for Momentum {
    type Output = Momentum;

    fn mul(self, rhs: i64) -> Momentum {
        Momentum::new(self.0 * rhs)
    }
}

impl AddAssign for Momentum {
    fn add_assign(&mut self, rhs: Momentum) {
        *self = *self + rhs;
    }
}

impl SubAssign for Momentum {
    fn sub_assign(&mut self, rhs: Momentum) {
        *self = *self - rhs;
    }
}
