//! Spin selection rules and small proposal helpers shared by the moves.

use dmc_core::{Dir, RandomSource, Spin};
use dmc_diagram::VertexState;

/// The worm cannot sit on a vertex whose legs carry `(spin_in, spin_out)`.
///
/// A positive spin current is blocked on a down-to-up vertex and a negative
/// one on an up-to-down vertex.
pub fn worm_blocked_at(dspin: i8, spin_in: Spin, spin_out: Spin) -> bool {
    matches!(
        (dspin, spin_in, spin_out),
        (1, Spin::Down, Spin::Up) | (-1, Spin::Up, Spin::Down)
    )
}

/// A worm end carrying spin current `dspin` cannot cross a propagator of spin
/// `g_spin` attached to its leg `dir`.
pub fn worm_blocked_on_g(dspin: i8, g_spin: Spin, dir: Dir) -> bool {
    matches!(
        (dspin, dir, g_spin),
        (1, Dir::In, Spin::Down)
            | (1, Dir::Out, Spin::Up)
            | (-1, Dir::In, Spin::Up)
            | (-1, Dir::Out, Spin::Down)
    )
}

/// Source and target of a propagator attached to leg `dir` of `near` whose
/// other end is `far`.
pub fn orient(dir: Dir, near: VertexState, far: VertexState) -> (VertexState, VertexState) {
    match dir {
        Dir::Out => (near, far),
        Dir::In => (far, near),
    }
}

/// Uniform time in `[0, beta)`.
pub fn random_tau<R: RandomSource + ?Sized>(rng: &mut R, beta: f64) -> f64 {
    rng.uniform() * beta
}

/// Density of [`random_tau`].
pub fn tau_probability(beta: f64) -> f64 {
    1.0 / beta
}

/// `+1` or `-1` from a single integer draw.
pub fn random_dspin<R: RandomSource + ?Sized>(rng: &mut R) -> i8 {
    if rng.int_in(0, 1) == 0 {
        -1
    } else {
        1
    }
}

/// Uniform orientation from a single integer draw.
pub fn random_dir<R: RandomSource + ?Sized>(rng: &mut R) -> Dir {
    Dir::from_bit(rng.int_in(0, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_a_propagator_is_reversible() {
        for dspin in [-1, 1] {
            for dir in Dir::ALL {
                for spin in [Spin::Down, Spin::Up] {
                    let there = worm_blocked_on_g(dspin, spin, dir);
                    let back = worm_blocked_on_g(dspin, spin.flip(), dir.flip());
                    assert_eq!(there, back, "dspin {dspin}, {dir:?}, {spin:?}");
                }
            }
        }
    }

    #[test]
    fn orient_puts_the_source_first() {
        let a = VertexState {
            site: dmc_core::Site::from_raw(0),
            tau: 0.1,
            spin: [Spin::Up; 2],
        };
        let b = VertexState { tau: 0.2, ..a };
        assert_eq!(orient(Dir::Out, a, b), (a, b));
        assert_eq!(orient(Dir::In, a, b), (b, a));
    }
}
