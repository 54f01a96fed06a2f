use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Typed index into one of the diagram pools.
pub trait PoolId: Copy + Eq + Ord + Hash + Debug {
    /// Short record name used in error context.
    const KIND: &'static str;

    /// Creates an identifier from a slot index.
    fn from_index(index: usize) -> Self;

    /// Slot index of the identifier.
    fn index(self) -> usize;
}

macro_rules! pool_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier from its raw integer representation.
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw integer representation of the identifier.
            pub fn as_raw(&self) -> u32 {
                self.0
            }
        }

        impl PoolId for $name {
            const KIND: &'static str = $kind;

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

pool_id!(
    /// Identifier of a vertex.
    VertexId,
    "vertex"
);
pool_id!(
    /// Identifier of a propagator line.
    GLineId,
    "gline"
);
pool_id!(
    /// Identifier of an interaction line.
    WLineId,
    "wline"
);
