//! Fixed-width 4096-bit vectors and their two wire forms.
//!
//! ```text
//! binary (512 bytes, big-endian integer)
//!   byte:   [0]        [1]   ...   [510]        [511]
//!   bits:  4095..4088              15..8        7..0
//!
//! text: decimal digits of Σ 2^i
//! ```
//!
//! Bit `i` lives in byte `511 - i / 8` at position `i % 8`. Both forms encode
//! the same integer, so a vector written as a blob and one written as a
//! decimal string agree bit-for-bit once decoded.
//!
//! Words are kept little-endian (`words[0]` holds bits 0..64), which makes
//! mask tests a straight 64-word loop and keeps encode/decode allocation-free.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use roaring::RoaringBitmap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{preview, BitsError, Result};

/// Number of addressable bits.
pub const WIDTH_BITS: u32 = 4096;

/// Length of the canonical binary form.
pub const ENCODED_LEN: usize = 512;

const WORDS: usize = (WIDTH_BITS / 64) as usize;
const DECIMAL_CHUNK: usize = 19;
const TEN_POW_19: u128 = 10_000_000_000_000_000_000;

/// A set of bit positions in `0..4096`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitVector {
    words: [u64; WORDS],
}

impl Default for BitVector {
    fn default() -> Self {
        Self::new()
    }
}

impl BitVector {
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Build a vector from bit positions; any position ≥ 4096 is rejected.
    pub fn from_bits<I>(bits: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut out = Self::new();
        for bit in bits {
            out.insert(bit)?;
        }
        Ok(out)
    }

    pub fn insert(&mut self, bit: u32) -> Result<()> {
        if bit >= WIDTH_BITS {
            return Err(BitsError::InvalidBit { bit });
        }
        self.words[(bit / 64) as usize] |= 1u64 << (bit % 64);
        Ok(())
    }

    /// Set a profile constant. Positions are compile-time values below 4096.
    pub(crate) fn set(&mut self, bit: u32) {
        debug_assert!(bit < WIDTH_BITS, "profile bit {bit} out of range");
        self.words[(bit / 64) as usize] |= 1u64 << (bit % 64);
    }

    pub(crate) fn from_static(bits: &[u32]) -> Self {
        let mut out = Self::new();
        for &bit in bits {
            out.set(bit);
        }
        out
    }

    pub fn contains(&self, bit: u32) -> bool {
        bit < WIDTH_BITS && self.words[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// `(self & mask) == mask`
    pub fn contains_all(&self, mask: &BitVector) -> bool {
        self.words
            .iter()
            .zip(mask.words.iter())
            .all(|(v, m)| v & m == *m)
    }

    /// `(self & mask) != 0`
    pub fn intersects(&self, mask: &BitVector) -> bool {
        self.words
            .iter()
            .zip(mask.words.iter())
            .any(|(v, m)| v & m != 0)
    }

    /// Set positions in ascending order.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            index: 0,
            current: self.words[0],
        }
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.iter_ones().collect()
    }

    // ------------------------------------------------------------------
    // Binary form
    // ------------------------------------------------------------------

    /// Canonical 512-byte big-endian form.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        for (w, word) in self.words.iter().enumerate() {
            let start = (WORDS - 1 - w) * 8;
            out[start..start + 8].copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Inverse of [`BitVector::to_bytes`]. Anything but exactly 512 bytes is
    /// rejected; nothing is decoded from a short or long buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != ENCODED_LEN {
            return Err(BitsError::InvalidFlags { len: buf.len() });
        }
        let mut out = Self::new();
        for (w, word) in out.words.iter_mut().enumerate() {
            let start = (WORDS - 1 - w) * 8;
            let mut be = [0u8; 8];
            be.copy_from_slice(&buf[start..start + 8]);
            *word = u64::from_be_bytes(be);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Decimal-string form
    // ------------------------------------------------------------------

    /// Decimal digits of the vector read as an unsigned integer.
    pub fn to_decimal_string(&self) -> String {
        let mut n = self.words;
        let mut top = significant_words(&n);
        if top == 0 {
            return "0".to_string();
        }

        // 4096 bits is at most 1234 decimal digits, i.e. 65 chunks of 19.
        let mut chunks: Vec<u64> = Vec::with_capacity(65);
        while top > 0 {
            let mut rem: u128 = 0;
            for word in n[..top].iter_mut().rev() {
                let cur = (rem << 64) | u128::from(*word);
                *word = (cur / TEN_POW_19) as u64;
                rem = cur % TEN_POW_19;
            }
            chunks.push(rem as u64);
            top = significant_words(&n[..top]);
        }

        use std::fmt::Write;
        let mut out = String::with_capacity(chunks.len() * DECIMAL_CHUNK);
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            let _ = write!(&mut out, "{first}");
        }
        for chunk in iter {
            let _ = write!(&mut out, "{chunk:019}");
        }
        out
    }

    /// Parse the decimal-string form. Surrounding whitespace is ignored;
    /// signs, separators and values ≥ 2^4096 are rejected.
    pub fn parse_decimal(s: &str) -> Result<Self> {
        let digits = s.trim();
        let invalid = || BitsError::InvalidDecimal {
            value: preview(s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut out = Self::new();
        for chunk in digits.as_bytes().chunks(DECIMAL_CHUNK) {
            let mut value: u64 = 0;
            for b in chunk {
                value = value * 10 + u64::from(b - b'0');
            }
            let mul = 10u128.pow(chunk.len() as u32);

            let mut carry = u128::from(value);
            for word in out.words.iter_mut() {
                let cur = u128::from(*word) * mul + carry;
                *word = cur as u64;
                carry = cur >> 64;
            }
            if carry != 0 {
                return Err(invalid());
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Roaring interop
    // ------------------------------------------------------------------

    pub fn to_roaring(&self) -> RoaringBitmap {
        self.iter_ones().collect()
    }

    pub fn from_roaring(bitmap: &RoaringBitmap) -> Result<Self> {
        Self::from_bits(bitmap.iter())
    }
}

fn significant_words(words: &[u64]) -> usize {
    words.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1)
}

/// Encode bit positions into the 512-byte binary form.
pub fn encode<I>(bits: I) -> Result<[u8; ENCODED_LEN]>
where
    I: IntoIterator<Item = u32>,
{
    Ok(BitVector::from_bits(bits)?.to_bytes())
}

/// Decode the 512-byte binary form into ascending bit positions.
pub fn decode(buf: &[u8]) -> Result<Vec<u32>> {
    Ok(BitVector::from_bytes(buf)?.to_vec())
}

/// Iterator over set positions, see [`BitVector::iter_ones`].
pub struct Ones<'a> {
    words: &'a [u64; WORDS],
    index: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.current != 0 {
                let tz = self.current.trailing_zeros();
                self.current &= self.current - 1;
                return Some(self.index as u32 * 64 + tz);
            }
            self.index += 1;
            if self.index >= WORDS {
                return None;
            }
            self.current = self.words[self.index];
        }
    }
}

impl BitOr for BitVector {
    type Output = BitVector;

    fn bitor(mut self, rhs: BitVector) -> BitVector {
        self |= rhs;
        self
    }
}

impl BitOrAssign for BitVector {
    fn bitor_assign(&mut self, rhs: BitVector) {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a |= b;
        }
    }
}

impl BitAnd for BitVector {
    type Output = BitVector;

    fn bitand(mut self, rhs: BitVector) -> BitVector {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a &= b;
        }
        self
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BitVector")?;
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

// Serialized as the ascending list of set positions.
impl Serialize for BitVector {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter_ones())
    }
}

impl<'de> Deserialize<'de> for BitVector {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = Vec::<u32>::deserialize(deserializer)?;
        BitVector::from_bits(bits).map_err(serde::de::Error::custom)
    }
}
