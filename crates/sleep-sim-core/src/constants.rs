/// Target composite sleep index every decision steers toward.
pub const TARGET_PRIMARY: f64 = 1.0;

/// Target stability index every decision steers toward.
pub const TARGET_STABILITY: f64 = 1.0;

/// Round cap applied when the caller does not override it.
pub const DEFAULT_MAX_ROUNDS: usize = 1_000;

/// Largest round cap accepted by config validation and `run`.
pub const MAX_ROUNDS: usize = 1_000_000;

/// Prime multiplier used to derive per-subject RNG streams from a base seed.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Label echoed for nights that carry no `night_index`.
pub const UNKNOWN_NIGHT_LABEL: &str = "Unknown";
