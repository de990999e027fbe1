//! Exact base-10 arithmetic for monetary reconciliation.
//!
//! Totals are compared across two independent paths, so rounding has to be
//! decimal-exact at `.xx5` boundaries (19.995 × 3 rounds to 59.99).
//!
//! A value is `mantissa / 10^scale` with an `i128` mantissa. Parsing caps the
//! fractional part at [`MAX_SCALE`] digits; arithmetic is checked and reports
//! overflow instead of wrapping.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{BitsError, Result};

/// Maximum fractional digits accepted by [`Decimal::parse`].
pub const MAX_SCALE: u32 = 28;

/// Equality and hashing are by value: `20.00 == 20`.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };
    pub const ONE: Decimal = Decimal {
        mantissa: 1,
        scale: 0,
    };

    pub const fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub const fn from_int(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa > 0
    }

    /// Parse plain decimal notation with an optional exponent
    /// (`19.995`, `-3`, `.5`, `1.5e-3`). Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (body, exp) = match s.find(['e', 'E']) {
            Some(i) => (&s[..i], s[i + 1..].parse::<i32>().ok()?),
            None => (s, 0),
        };
        let (negative, body) = match body.as_bytes().first()? {
            b'-' => (true, &body[1..]),
            b'+' => (false, &body[1..]),
            _ => (false, body),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa
                .checked_mul(10)?
                .checked_add(i128::from(b - b'0'))?;
        }
        if negative {
            mantissa = -mantissa;
        }

        let mut scale = frac_part.len() as i64 - i64::from(exp);
        if scale < 0 {
            mantissa = mantissa.checked_mul(pow10(u32::try_from(-scale).ok()?)?)?;
            scale = 0;
        }
        let out = Self {
            mantissa,
            scale: u32::try_from(scale).ok()?,
        }
        .normalized();
        (out.scale <= MAX_SCALE).then_some(out)
    }

    /// Drop trailing fractional zeros.
    pub fn normalized(mut self) -> Self {
        while self.scale > 0 && self.mantissa % 10 == 0 {
            self.mantissa /= 10;
            self.scale -= 1;
        }
        self
    }

    fn rescale(&self, scale: u32) -> Option<i128> {
        debug_assert!(scale >= self.scale);
        self.mantissa.checked_mul(pow10(scale - self.scale)?)
    }

    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        let scale = self.scale.max(other.scale);
        let mantissa = self.rescale(scale)?.checked_add(other.rescale(scale)?)?;
        Some(Decimal { mantissa, scale }.normalized())
    }

    pub fn checked_sub(self, other: Decimal) -> Option<Decimal> {
        self.checked_add(Decimal {
            mantissa: other.mantissa.checked_neg()?,
            scale: other.scale,
        })
    }

    pub fn checked_mul(self, other: Decimal) -> Option<Decimal> {
        let mantissa = self.mantissa.checked_mul(other.mantissa)?;
        let scale = self.scale.checked_add(other.scale)?;
        Some(Decimal { mantissa, scale }.normalized())
    }

    /// Round to `places` fractional digits, ties away from zero.
    ///
    /// The result always carries exactly `places` digits, so `Display`
    /// renders `7.00` and `0.00` rather than `7` and `0`.
    pub fn round_half_up(self, places: u32) -> Option<Decimal> {
        if self.scale <= places {
            return Some(Decimal {
                mantissa: self.rescale(places)?,
                scale: places,
            });
        }
        let divisor = pow10(self.scale - places)?;
        let mut q = self.mantissa / divisor;
        let r = self.mantissa % divisor;
        if r.unsigned_abs() * 2 >= divisor.unsigned_abs() {
            q += self.mantissa.signum();
        }
        Some(Decimal {
            mantissa: q,
            scale: places,
        })
    }

    /// `round_half_up(2)` with overflow mapped to [`BitsError::DecimalOverflow`].
    pub fn round_money(self) -> Result<Decimal> {
        self.round_half_up(2).ok_or(BitsError::DecimalOverflow)
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        if let (Some(a), Some(b)) = (self.rescale(scale), other.rescale(scale)) {
            return a.cmp(&b);
        }
        // Rescaling overflowed: the integer parts are far enough apart, or
        // equal with small fractional remainders that do fit.
        let (ai, af) = split(self);
        let (bi, bf) = split(other);
        ai.cmp(&bi).then_with(|| {
            let fa = Decimal::new(af, self.scale).rescale(scale);
            let fb = Decimal::new(bf, other.scale).rescale(scale);
            fa.cmp(&fb)
        })
    }
}

fn split(d: &Decimal) -> (i128, i128) {
    match pow10(d.scale) {
        Some(p) => (d.mantissa / p, d.mantissa % p),
        None => (0, d.mantissa),
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let n = self.normalized();
        n.mantissa.hash(state);
        n.scale.hash(state);
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::from_int(value)
    }
}

impl FromStr for Decimal {
    type Err = BitsError;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::parse(s).ok_or_else(|| BitsError::InvalidValue {
            column: "decimal".to_string(),
            value: crate::error::preview(s),
            expected: "a decimal number",
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        if digits.len() <= scale {
            let pad = "0".repeat(scale - digits.len());
            return write!(f, "{sign}0.{pad}{digits}");
        }
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
