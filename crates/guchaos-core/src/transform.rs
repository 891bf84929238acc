//! Polynumeric substitution and narrow-to-wide folding.
//!
//! ```text
//! narrow batch (u16 × N) → substitute (+key digit mod 65535) → fold pairs → wide batch (u32 × N/2)
//! ```
//!
//! The substitution is a fixed, reversible stream cipher over digits. It adds
//! no entropy and is not a cryptographic mixing step; it exists to keep the
//! injected values from being a verbatim copy of what the remote served.

use crate::key::Key;

/// Modulus of the substitution step. Note this is 0xFFFF, not 0x10000.
pub const SUBSTITUTION_MODULUS: u32 = 0xFFFF;

/// How far through the batch the substitution runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    /// Every element of the batch is substituted.
    #[default]
    FixedLength,
    /// Stop at the first zero element, leaving it and everything after it
    /// untouched. Only useful for reproducing historical output.
    ZeroTerminated,
}

impl std::fmt::Display for TransformMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedLength => write!(f, "fixed-length"),
            Self::ZeroTerminated => write!(f, "zero-terminated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Add the cycling key digits to `values`, in place, left to right.
///
/// Returns the number of elements substituted, which is `values.len()` in
/// [`TransformMode::FixedLength`] and the index of the first zero otherwise.
pub fn substitute(values: &mut [u16], key: &Key, mode: TransformMode) -> usize {
    let mut touched = 0;
    for (v, k) in values.iter_mut().zip(key.stream()) {
        if mode == TransformMode::ZeroTerminated && *v == 0 {
            break;
        }
        *v = ((u32::from(*v) + u32::from(k)) % SUBSTITUTION_MODULUS) as u16;
        touched += 1;
    }
    touched
}

/// Undo [`substitute`] in [`TransformMode::FixedLength`].
///
/// Exact for inputs that were in `0..=65534`; an original 65535 comes back
/// as 0 because both are congruent modulo 0xFFFF.
pub fn reverse_substitute(values: &mut [u16], key: &Key) {
    for (v, k) in values.iter_mut().zip(key.stream()) {
        let v32 = u32::from(*v) % SUBSTITUTION_MODULUS;
        *v = ((v32 + SUBSTITUTION_MODULUS - u32::from(k)) % SUBSTITUTION_MODULUS) as u16;
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

/// Concatenate adjacent narrow integers: first as high half, second as low.
///
/// A trailing odd element has no partner and is dropped.
pub fn fold(narrow: &[u16]) -> Vec<u32> {
    narrow
        .chunks_exact(2)
        .map(|pair| (u32::from(pair[0]) << 16) | u32::from(pair[1]))
        .collect()
}

/// Substitute then fold: the whole per-cycle numeric step.
pub fn transform(mut narrow: Vec<u16>, key: &Key, mode: TransformMode) -> Vec<u32> {
    let touched = substitute(&mut narrow, key, mode);
    if touched < narrow.len() {
        log::debug!(
            "substitution stopped at zero element {touched} of {}",
            narrow.len()
        );
    }
    fold(&narrow)
}
