use dmc_core::{derive_substream_seed, RngHandle};

/// Derives the deterministic seed used for a specific chain.
pub fn chain_seed(master_seed: u64, chain: u64) -> u64 {
    derive_substream_seed(master_seed, chain)
}

/// Generator owned by chain `chain` of a run seeded with `master_seed`.
pub fn chain_rng(master_seed: u64, chain: u64) -> RngHandle {
    RngHandle::from_seed(chain_seed(master_seed, chain))
}
