/// Base delay (ms) for the exponential backoff on reconnect.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Backoff stops doubling after this many attempts (8x the base).
pub const BACKOFF_MAX_EXPONENT: u32 = 3;

