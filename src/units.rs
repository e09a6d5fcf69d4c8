//! Hex quantity handling for Ethereum JSON-RPC values.
//!
//! Chain-native numbers arrive as `0x`-prefixed base-16 strings. Display
//! conversions (`wei_to_ether`, `wei_to_gwei`) are lossy `f64` helpers that
//! yield `NaN` on malformed input; `parse_quantity` is the strict variant used
//! wherever the value feeds arithmetic.

use crate::error::{ChainError, ChainResult};

const WEI_PER_ETHER: f64 = 1e18;
const WEI_PER_GWEI: f64 = 1e9;

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// `from_str_radix` tolerates a leading `+`, so digits are checked up front.
fn is_hex_digits(digits: &str) -> bool {
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parses a base-16 string into an `f64`, returning `NaN` when it is not hex.
///
/// Values wider than 128 bits are accumulated digit by digit and lose
/// precision above 2^53 like any other `f64`.
pub fn hex_to_f64(value: &str) -> f64 {
    let digits = strip_hex_prefix(value.trim());
    if !is_hex_digits(digits) {
        return f64::NAN;
    }
    if let Ok(n) = u128::from_str_radix(digits, 16) {
        return n as f64;
    }

    digits
        .chars()
        .filter_map(|c| c.to_digit(16))
        .fold(0f64, |acc, d| acc * 16.0 + f64::from(d))
}

pub fn wei_to_ether(wei_hex: &str) -> f64 {
    hex_to_f64(wei_hex) / WEI_PER_ETHER
}

pub fn wei_to_gwei(wei_hex: &str) -> f64 {
    hex_to_f64(wei_hex) / WEI_PER_GWEI
}

/// Strict hex quantity parse for fields that fit in 64 bits (block numbers,
/// timestamps, nonces, gas).
pub fn parse_quantity(value: &str) -> ChainResult<u64> {
    let digits = strip_hex_prefix(value.trim());
    if digits.is_empty() {
        return Err(ChainError::Parse(format!("empty hex quantity {value:?}")));
    }
    if !is_hex_digits(digits) {
        return Err(ChainError::Parse(format!("invalid hex quantity {value:?}")));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Parse(format!("invalid hex quantity {value:?}: {e}")))
}

pub fn to_hex_quantity(value: u64) -> String {
    format!("0x{value:x}")
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    match value.strip_prefix("0x") {
        Some(digits) => digits.len() == len && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// True for `0x` followed by 20 bytes of hex.
pub fn is_address(value: &str) -> bool {
    is_hex_of_len(value, 40)
}

/// True for `0x` followed by 32 bytes of hex.
pub fn is_tx_hash(value: &str) -> bool {
    is_hex_of_len(value, 64)
}
