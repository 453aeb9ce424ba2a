//! Time-based one-time password generation (RFC 6238).
//!
//! The login flow only depends on [`TokenGenerator`]; [`Totp`] is the default
//! implementation used by authenticator apps: base32 seed, HMAC-SHA1, 30 second
//! step, 6 digits.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Errors surfaced while generating a one-time code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("TOTP secret is not valid base32: unexpected '{0}'")]
    InvalidSecret(char),
    #[error("TOTP secret is empty")]
    EmptySecret,
    #[error("unsupported TOTP digit count {0}; expected 6 to 8")]
    InvalidDigits(u32),
    #[error("TOTP step must be non-zero")]
    InvalidStep,
    #[error("failed to key HMAC: {0}")]
    Key(String),
}

/// Turns a seed secret and an instant into a one-time code.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, secret: &str, at: DateTime<Utc>) -> Result<String, TotpError>;
}

/// RFC 6238 generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totp {
    digits: u32,
    step_seconds: u64,
}

impl Default for Totp {
    fn default() -> Self {
        Self {
            digits: 6,
            step_seconds: 30,
        }
    }
}

impl Totp {
    pub fn new(digits: u32, step_seconds: u64) -> Result<Self, TotpError> {
        check_digits(digits)?;
        if step_seconds == 0 {
            return Err(TotpError::InvalidStep);
        }
        Ok(Self {
            digits,
            step_seconds,
        })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Moving factor for `at`; instants before the epoch clamp to zero.
    pub fn counter(&self, at: DateTime<Utc>) -> u64 {
        u64::try_from(at.timestamp()).unwrap_or(0) / self.step_seconds
    }

    pub fn generate_from_key(&self, key: &[u8], at: DateTime<Utc>) -> Result<String, TotpError> {
        hotp(key, self.counter(at), self.digits)
    }
}

impl TokenGenerator for Totp {
    fn generate(&self, secret: &str, at: DateTime<Utc>) -> Result<String, TotpError> {
        let key = decode_base32(secret)?;
        self.generate_from_key(&key, at)
    }
}

/// RFC 4226 HOTP value for `counter`, zero-padded to `digits`.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String, TotpError> {
    check_digits(digits)?;
    let mut mac = HmacSha1::new_from_slice(key).map_err(|err| TotpError::Key(err.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset]) & 0x7f) << 24
        | u32::from(digest[offset + 1]) << 16
        | u32::from(digest[offset + 2]) << 8
        | u32::from(digest[offset + 3]);

    let code = binary % 10u32.pow(digits);
    Ok(format!("{code:0width$}", width = digits as usize))
}

fn check_digits(digits: u32) -> Result<(), TotpError> {
    if (6..=8).contains(&digits) {
        Ok(())
    } else {
        Err(TotpError::InvalidDigits(digits))
    }
}

/// Decode an RFC 4648 base32 secret. Case, whitespace, dashes and `=`
/// padding are ignored.
pub fn decode_base32(secret: &str) -> Result<Vec<u8>, TotpError> {
    let mut output = Vec::with_capacity(secret.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for ch in secret.chars() {
        if ch.is_whitespace() || ch == '-' || ch == '=' {
            continue;
        }
        let upper = ch.to_ascii_uppercase();
        let value = BASE32_ALPHABET
            .iter()
            .position(|&symbol| char::from(symbol) == upper)
            .ok_or(TotpError::InvalidSecret(ch))? as u32;

        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    if output.is_empty() {
        return Err(TotpError::EmptySecret);
    }
    Ok(output)
}
