//! Parse-or-zero numeric coercion.
//!
//! Stat tables use blanks and dashes for undefined values. A cell that
//! does not parse yields zero and never fails the row; the `ok` flag
//! records whether the value was actually parsed so strict callers can
//! tell a measured zero from a placeholder.

use serde::Deserialize;

/// A coerced value plus whether parsing succeeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub ok: bool,
}

impl<T: Default> Coerced<T> {
    fn zero() -> Self {
        Self { value: T::default(), ok: false }
    }
}

/// How row builders treat cells that fail numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Failed cells become zero; the row is kept.
    #[default]
    Lenient,
    /// A row with a non-blank cell that fails to parse is rejected.
    Strict,
}

impl CoercionMode {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            CoercionMode::Strict
        } else {
            CoercionMode::Lenient
        }
    }
}

pub fn coerce_int(raw: &str) -> Coerced<i32> {
    match raw.trim().parse::<i32>() {
        Ok(value) => Coerced { value, ok: true },
        Err(_) => Coerced::zero(),
    }
}

pub fn coerce_float(raw: &str) -> Coerced<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Coerced { value, ok: true },
        _ => Coerced::zero(),
    }
}
