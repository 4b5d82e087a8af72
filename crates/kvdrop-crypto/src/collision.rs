//! Birthday-bound arithmetic for truncated identifiers.
//!
//! An identifier keeps 7 hex characters of a 256-bit digest, so there are
//! only `16^7 = 2^28` distinct identifiers. Among `n` distinct blobs the chance
//! that at least two share an identifier is approximately
//!
//! ```text
//! p(n) = 1 - exp(-n(n-1) / 2N),   N = 2^28
//! ```
//!
//! which passes 1% around 2,300 blobs and 50% around 19,300 blobs. Short
//! URLs are worth that trade here; the write path's collision policy decides
//! what happens when it bites.

use kvdrop_types::IDENTIFIER_LEN;

/// Number of distinct identifiers (`16^IDENTIFIER_LEN`).
pub const IDENTIFIER_SPACE: u64 = 1 << (4 * IDENTIFIER_LEN as u32);

/// Probability that at least two of `blobs` distinct blobs share an
/// identifier.
pub fn collision_probability(blobs: u64) -> f64 {
    if blobs < 2 {
        return 0.0;
    }
    let n = blobs as f64;
    let exponent = -(n * (n - 1.0)) / (2.0 * IDENTIFIER_SPACE as f64);
    -exponent.exp_m1()
}

/// Number of distinct blobs at which the collision probability reaches `p`.
///
/// `p` is clamped to `[0, 1)`.
pub fn blobs_for_probability(p: f64) -> u64 {
    let p = p.clamp(0.0, 1.0 - f64::EPSILON);
    if p == 0.0 {
        return 0;
    }
    // Positive root of n(n-1) = 2N ln(1/(1-p)).
    let pairs = 2.0 * IDENTIFIER_SPACE as f64 * (1.0 / (1.0 - p)).ln();
    let n = (1.0 + (1.0 + 4.0 * pairs).sqrt()) / 2.0;
    n.ceil() as u64
}
