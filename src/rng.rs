use rand::Rng;
use rand::seq::index;

use crate::errors::PairsError;

#[derive(Debug, Clone)]
/// Small deterministic RNG (splitmix64) used for reproducible splits and draws.
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// Create an RNG whose stream is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Current internal state; feeding it to `new` resumes the same stream.
    pub fn state(&self) -> u64 {
        self.state
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let value = self.next_u64_internal();
            let bytes = value.to_le_bytes();
            let remaining = dest.len() - offset;
            let copy_len = remaining.min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// Draw a fresh seed from the thread-local entropy source.
pub fn entropy_seed() -> u64 {
    rand::rng().random()
}

/// Draw `amount` distinct positions from `0..pool_len` uniformly without replacement.
///
/// Positions come back in draw order. Fails instead of returning fewer than requested.
pub fn sample_distinct<R: Rng + ?Sized>(
    rng: &mut R,
    pool_len: usize,
    amount: usize,
    context: &str,
) -> Result<Vec<usize>, PairsError> {
    if amount > pool_len {
        return Err(PairsError::SamplingImpossible {
            requested: amount,
            available: pool_len,
            context: context.to_string(),
        });
    }
    if amount == 0 {
        return Ok(Vec::new());
    }
    Ok(index::sample(rng, pool_len, amount).into_vec())
}
