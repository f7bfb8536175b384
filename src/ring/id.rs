use crate::config::MAX_ID_BITS;
use crate::error::{ChordError, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// A point on the ring. Always already reduced modulo `2^m` by the `IdSpace`
/// that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub u64);

impl Identifier {
    /// Clockwise open interval `(from, to)`.
    ///
    /// When `from == to` the interval covers the whole ring except `from`,
    /// which is what a single-node ring needs.
    pub fn is_between(self, from: Identifier, to: Identifier) -> bool {
        if from < to {
            from < self && self < to
        } else if from > to {
            self > from || self < to
        } else {
            self != from
        }
    }

    /// Clockwise half-open interval `(from, to]`.
    pub fn is_between_right_inclusive(self, from: Identifier, to: Identifier) -> bool {
        self == to || self.is_between(from, to)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `m`-bit circular space all identifiers of one ring live in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdSpace {
    bits: u8,
}

impl IdSpace {
    pub fn new(bits: u8) -> Result<Self> {
        if bits == 0 || bits > MAX_ID_BITS {
            return Err(ChordError::Validation(format!(
                "identifier width must be within 1..={}, got {}",
                MAX_ID_BITS, bits
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    fn mask(&self) -> u64 {
        if self.bits == MAX_ID_BITS {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    /// SHA-1 of `bytes`, keeping the top `m` bits of the digest.
    pub fn hash(&self, bytes: &[u8]) -> Identifier {
        let digest = Sha1::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let wide = u64::from_be_bytes(head);
        Identifier(wide >> (MAX_ID_BITS - self.bits))
    }

    /// Checks that a raw value fits the configured width.
    pub fn identifier(&self, raw: u64) -> Result<Identifier> {
        if raw > self.mask() {
            return Err(ChordError::Validation(format!(
                "identifier {} does not fit in {} bits",
                raw, self.bits
            )));
        }
        Ok(Identifier(raw))
    }

    pub fn validate(&self, id: Identifier) -> Result<Identifier> {
        self.identifier(id.0)
    }

    /// `(id + 2^k) mod 2^m`, the start of finger `k`.
    pub fn add_power_of_two(&self, id: Identifier, k: u8) -> Identifier {
        debug_assert!(k < self.bits, "finger index out of range");
        Identifier(id.0.wrapping_add(1u64 << k) & self.mask())
    }

    /// Clockwise distance from `from` to `to`.
    pub fn distance(&self, from: Identifier, to: Identifier) -> u64 {
        to.0.wrapping_sub(from.0) & self.mask()
    }
}
