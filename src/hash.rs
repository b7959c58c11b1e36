use crate::constants::hash::{FNV1A64_OFFSET, FNV1A64_PRIME};

/// FNV-1a over `seed` (little endian) followed by the bytes of `value`.
///
/// Stable across platforms and toolchains, unlike `DefaultHasher`.
pub fn stable_hash_str(seed: u64, value: &str) -> u64 {
    seed.to_le_bytes()
        .iter()
        .chain(value.as_bytes())
        .fold(FNV1A64_OFFSET, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(FNV1A64_PRIME)
        })
}

/// Seed for one pipeline stage, derived from the run seed and a stage label.
pub fn derive_stage_seed(seed: u64, stage: &str) -> u64 {
    stable_hash_str(seed, stage)
}
