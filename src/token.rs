//! Token generation and comparison.

use base64::{Engine, engine::general_purpose::URL_SAFE};
use rand::{RngCore, SeedableRng, rngs::SmallRng};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

const LETTERS: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// 6 bits per letter index, 10 indices per 63-bit draw.
const LETTER_IDX_BITS: u32 = 6;
const LETTER_IDX_MASK: u64 = (1 << LETTER_IDX_BITS) - 1;
const LETTER_IDX_MAX: u32 = 63 / LETTER_IDX_BITS;

/// Fast, non-cryptographic token source.
///
/// Holds a single [`SmallRng`] behind a mutex. Every draw takes 63 bits out of
/// the generator and spreads them over up to ten output letters, so the lock
/// is taken roughly once per ten bytes. This trades cryptographic strength
/// for throughput; tokens are still unpredictable enough for double-submit
/// CSRF protection, where the attacker cannot observe the victim's tokens.
///
/// One instance is meant to be shared by every worker through an `Arc`.
pub struct TokenGenerator {
    source: Mutex<SmallRng>,
}

impl TokenGenerator {
    /// Creates a generator seeded from the current system time.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    /// Creates a generator with a fixed seed. Two generators built from the
    /// same seed yield the same token sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            source: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Returns a URL-safe base64 encoding of `len` random letters.
    pub fn generate(&self, len: usize) -> String {
        URL_SAFE.encode(self.random_letters(len))
    }

    /// Returns `len` bytes drawn uniformly from `a-zA-Z`.
    pub fn random_letters(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        if len == 0 {
            return buf;
        }

        let mut cache = self.next_bits();
        let mut remain = LETTER_IDX_MAX;
        let mut i = len;
        while i > 0 {
            if remain == 0 {
                cache = self.next_bits();
                remain = LETTER_IDX_MAX;
            }

            let idx = (cache & LETTER_IDX_MASK) as usize;
            if idx < LETTERS.len() {
                i -= 1;
                buf[i] = LETTERS[idx];
            }

            cache >>= LETTER_IDX_BITS;
            remain -= 1;
        }

        buf
    }

    // The lock is held for a single draw only.
    fn next_bits(&self) -> u64 {
        let mut rng = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        rng.next_u64() >> 1
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compares two byte strings in constant time.
///
/// The whole of the longer input is always walked and a length mismatch is
/// folded into the result instead of returning early.
pub fn eq_tokens(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut eq = (a.len() as u64).ct_eq(&(b.len() as u64));
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        eq &= x.ct_eq(&y);
    }
    eq.into()
}

pub fn eq_csrf_tokens(a: &str, b: &str) -> bool {
    eq_tokens(a.as_bytes(), b.as_bytes())
}
