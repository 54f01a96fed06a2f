//! Minimal periodic lattice indexing used by the site-changing moves.

use serde::{Deserialize, Serialize};

use crate::errors::{DmcError, ErrorInfo};
use crate::rng::RandomSource;

/// Flat index of a lattice site (unit cell coordinates plus sublattice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Site(u32);

impl Site {
    /// Creates a site from its raw flat index.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw flat index.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// Hyper-cubic periodic lattice with `sublattices` sites per unit cell.
///
/// Sites are encoded as `sub + nsub * (c0 + L0 * (c1 + L1 * ...))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    dims: Vec<u32>,
    sublattices: u32,
}

impl Lattice {
    /// Builds a lattice, rejecting empty or zero-sized shapes.
    pub fn new(dims: Vec<u32>, sublattices: u32) -> Result<Self, DmcError> {
        if dims.is_empty() || dims.iter().any(|&l| l == 0) || sublattices == 0 {
            return Err(DmcError::Lattice(
                ErrorInfo::new("invalid-shape", "lattice extents must be positive")
                    .with_context("dims", format!("{dims:?}"))
                    .with_context("sublattices", sublattices.to_string()),
            ));
        }
        let volume = dims
            .iter()
            .try_fold(sublattices as u64, |acc, &l| acc.checked_mul(l as u64))
            .filter(|&n| n <= u32::MAX as u64);
        if volume.is_none() {
            return Err(DmcError::Lattice(
                ErrorInfo::new("too-large", "lattice volume exceeds the site index range")
                    .with_context("dims", format!("{dims:?}")),
            ));
        }
        Ok(Self { dims, sublattices })
    }

    /// Linear extents of the lattice.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Number of sublattice sites per unit cell.
    pub fn sublattices(&self) -> u32 {
        self.sublattices
    }

    /// Total number of sites.
    pub fn site_count(&self) -> u32 {
        self.dims.iter().product::<u32>() * self.sublattices
    }

    /// Encodes a site from its sublattice and unit cell coordinates.
    pub fn site(&self, sublattice: u32, coords: &[u32]) -> Result<Site, DmcError> {
        if coords.len() != self.dims.len() || sublattice >= self.sublattices {
            return Err(DmcError::Lattice(
                ErrorInfo::new("bad-coordinates", "coordinates do not match lattice shape")
                    .with_context("coords", format!("{coords:?}"))
                    .with_context("sublattice", sublattice.to_string()),
            ));
        }
        let mut cell = 0u32;
        for (&c, &l) in coords.iter().zip(&self.dims).rev() {
            cell = cell * l + c % l;
        }
        Ok(Site(sublattice + self.sublattices * cell))
    }

    /// Sublattice index of `site`.
    pub fn sublattice(&self, site: Site) -> u32 {
        site.0 % self.sublattices
    }

    /// Unit cell coordinates of `site`.
    pub fn coordinates(&self, site: Site) -> Vec<u32> {
        let mut cell = site.0 / self.sublattices;
        self.dims
            .iter()
            .map(|&l| {
                let c = cell % l;
                cell /= l;
                c
            })
            .collect()
    }

    /// Squared minimum-image distance between the unit cells of two sites.
    pub fn distance_squared(&self, a: Site, b: Site) -> u64 {
        self.coordinates(a)
            .into_iter()
            .zip(self.coordinates(b))
            .zip(&self.dims)
            .map(|((x, y), &l)| {
                let d = x.abs_diff(y);
                let d = d.min(l - d) as u64;
                d * d
            })
            .sum()
    }

    /// Uniform random site, drawn with a single integer draw.
    pub fn random_site<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Site {
        let raw = rng.int_in(0, self.site_count() as i64 - 1);
        Site(raw as u32)
    }

    /// Probability of any particular site under [`Lattice::random_site`].
    pub fn site_probability(&self) -> f64 {
        1.0 / self.site_count() as f64
    }
}
