//! Field element encoding.
//!
//! External form is fixed-width 32-byte big-endian. Private inputs are parsed
//! leniently (decimal or hex, reduced modulo the field); public inputs that
//! arrive for verification must be exact and canonical.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use zkattest_types::{decode_hex_exact, ZkAttestError, ZkAttestResult, FIELD_ELEMENT_SIZE};

pub fn fr_to_be_bytes(f: &Fr) -> [u8; FIELD_ELEMENT_SIZE] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    // BN254 Fr is four 64-bit limbs, so this is always exactly 32 bytes.
    out[FIELD_ELEMENT_SIZE - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// `0x`-prefixed, 64 hex digits.
pub fn fr_to_hex(f: &Fr) -> String {
    format!("0x{}", hex::encode(fr_to_be_bytes(f)))
}

/// Reject encodings at or above the modulus instead of silently reducing them.
pub fn fr_from_be_bytes_canonical(label: &str, bytes: &[u8; FIELD_ELEMENT_SIZE]) -> ZkAttestResult<Fr> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    if fr_to_be_bytes(&f) != *bytes {
        return Err(ZkAttestError::Validation(format!(
            "{}: value is not a canonical field element",
            label
        )));
    }
    Ok(f)
}

/// Strict parse: exactly 32 bytes of hex, canonical.
pub fn parse_field_strict(label: &str, s: &str) -> ZkAttestResult<Fr> {
    let bytes = decode_hex_exact::<FIELD_ELEMENT_SIZE>(label, s)?;
    fr_from_be_bytes_canonical(label, &bytes)
}

/// Lenient parse of a decimal or `0x` hex integer of any size, reduced mod p.
pub fn parse_field(label: &str, s: &str) -> ZkAttestResult<Fr> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ZkAttestError::Validation(format!("{}: empty value", label)));
    }

    if let Some(digits) = strip_hex_prefix(s) {
        if digits.is_empty() {
            return Err(ZkAttestError::Validation(format!("{}: empty hex value", label)));
        }
        let padded;
        let digits = if digits.len() % 2 == 1 {
            padded = format!("0{}", digits);
            padded.as_str()
        } else {
            digits
        };
        let bytes = hex::decode(digits)
            .map_err(|e| ZkAttestError::Validation(format!("{}: invalid hex: {}", label, e)))?;
        return Ok(Fr::from_be_bytes_mod_order(&bytes));
    }

    let ten = Fr::from(10u64);
    let mut acc = Fr::from(0u64);
    for c in s.chars() {
        let digit = c.to_digit(10).ok_or_else(|| {
            ZkAttestError::Validation(format!("{}: '{}' is not a decimal or 0x hex integer", label, s))
        })?;
        acc = acc * ten + Fr::from(u64::from(digit));
    }
    Ok(acc)
}

/// Decimal or `0x` hex integer that must fit in 64 bits.
pub fn parse_u64(label: &str, s: &str) -> ZkAttestResult<u64> {
    let s = s.trim();
    let parsed = match strip_hex_prefix(s) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| ZkAttestError::Validation(format!("{}: not a 64-bit unsigned integer: {}", label, e)))
}

/// Accepts `0`/`1` in any integer form, plus `true`/`false`.
pub fn parse_bool(label: &str, s: &str) -> ZkAttestResult<bool> {
    match s.trim() {
        "true" => return Ok(true),
        "false" => return Ok(false),
        _ => {}
    }
    match parse_u64(label, s)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ZkAttestError::Validation(format!(
            "{}: expected 0 or 1, got {}",
            label, other
        ))),
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}
