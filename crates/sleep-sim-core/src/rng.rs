use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Derive a deterministic RNG stream for one subject so a subject's data does
/// not depend on how many subjects precede it.
pub fn derive_subject_rng(base_seed: u64, subject_index: usize) -> ChaCha12Rng {
    let offset = (subject_index as u64).wrapping_mul(crate::constants::RNG_DERIVATION_PRIME);
    ChaCha12Rng::seed_from_u64(base_seed.wrapping_add(offset))
}
