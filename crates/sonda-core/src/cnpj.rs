//! CNPJ validation and normalisation.
//!
//! A CNPJ ("Cadastro Nacional da Pessoa Jurídica") is the 14-digit company
//! identifier issued by Brazil's federal revenue service. The last two
//! digits are check digits over the preceding twelve, computed with a
//! mod-11 scheme and fixed weight vectors.
//!
//! # Validation steps
//!
//! 1. Strip every non-digit character (so punctuated and bare forms are
//!    equivalent).
//! 2. Reject unless exactly 14 digits remain; reject the degenerate
//!    all-identical sequences (`00000000000000` etc.), which pass the
//!    checksum arithmetic but are never issued.
//! 3. Recompute both check digits and compare against the trailing two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weights for the first check digit, applied to digits 1..=12.
const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Weights for the second check digit, applied to digits 1..=13.
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Why a candidate string is not a CNPJ.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CnpjError {
    /// Not reducible to 14 digits, or an all-identical digit sequence.
    #[error("malformed CNPJ: expected 14 digits")]
    InvalidFormat,
    /// Well-formed, but the trailing check digits do not match.
    #[error("CNPJ check digits do not match")]
    ChecksumMismatch,
}

/// A validated CNPJ in canonical 14-digit form.
///
/// Holding a `Cnpj` is proof the digits passed both checksum rounds;
/// construction only happens through [`Cnpj::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse free-form user input into a canonical CNPJ.
    ///
    /// Deterministic and total: any string either yields a `Cnpj` or a
    /// typed [`CnpjError`], never a panic.
    pub fn parse(input: &str) -> Result<Self, CnpjError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 14 {
            return Err(CnpjError::InvalidFormat);
        }
        let first = digits.as_bytes()[0];
        if digits.bytes().all(|b| b == first) {
            return Err(CnpjError::InvalidFormat);
        }

        let d: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
        if d[12] != check_digit(&d[..12], &FIRST_WEIGHTS)
            || d[13] != check_digit(&d[..13], &SECOND_WEIGHTS)
        {
            return Err(CnpjError::ChecksumMismatch);
        }
        Ok(Cnpj(digits))
    }

    /// The canonical 14-digit form, no punctuation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form: `11.222.333/0001-81`.
    pub fn formatted(&self) -> String {
        let s = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &s[0..2],
            &s[2..5],
            &s[5..8],
            &s[8..12],
            &s[12..14]
        )
    }
}

/// One mod-11 round: weighted sum, remainder, and the < 2 floor rule.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cnpj {
    type Err = CnpjError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cnpj::parse(s)
    }
}

impl<'de> Deserialize<'de> for Cnpj {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cnpj::parse(&s).map_err(serde::de::Error::custom)
    }
}
