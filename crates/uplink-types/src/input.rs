//! Lenient parsing of user-entered numeric fields
//!
//! Interval and baud fields never reject input. Empty or non-numeric text
//! falls back to the default, as do values too large for the field. Negative
//! values clamp to zero and fractions are truncated.

use tracing::debug;

use crate::device::DeviceId;
use crate::sending::{DEFAULT_BAUD_RATE, DEFAULT_INTERVAL_MS};

/// Coerce interval text (milliseconds) to a usable value
pub fn coerce_interval_ms(text: &str) -> u64 {
    match parse_lenient(text) {
        // 2^64 is the first float above u64::MAX
        Some(value) if value < u64::MAX as f64 => value as u64,
        _ => {
            debug!("Interval {:?} is not usable, using {}", text, DEFAULT_INTERVAL_MS);
            DEFAULT_INTERVAL_MS
        }
    }
}

/// Coerce baud rate text to a usable value
pub fn coerce_baud_rate(text: &str) -> u32 {
    match parse_lenient(text) {
        Some(value) if value < u32::MAX as f64 + 1.0 => value as u32,
        _ => {
            debug!("Baud rate {:?} is not usable, using {}", text, DEFAULT_BAUD_RATE);
            DEFAULT_BAUD_RATE
        }
    }
}

/// Parse the target device selector into a numeric id
///
/// Leading whitespace and an optional `+` are skipped and the leading run of
/// digits is used, so `"3 (TeleDongle)"` selects device 3. Unset selectors,
/// selectors without leading digits and out-of-range values select device 0.
pub fn parse_target_device(selector: Option<&str>) -> DeviceId {
    let Some(selector) = selector else {
        return DeviceId(0);
    };

    let trimmed = selector.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    DeviceId(unsigned[..digits_end].parse().unwrap_or(0))
}

/// Returns a non-negative finite value, or `None` when the text is unusable
fn parse_lenient(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: f64 = trimmed.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_interval_defaults_on_empty_and_garbage() {
        assert_eq!(coerce_interval_ms(""), 500);
        assert_eq!(coerce_interval_ms("   "), 500);
        assert_eq!(coerce_interval_ms("fast"), 500);
        assert_eq!(coerce_interval_ms("NaN"), 500);
    }

    #[test]
    fn test_interval_clamps_and_truncates() {
        assert_eq!(coerce_interval_ms("-20"), 0);
        assert_eq!(coerce_interval_ms("250.9"), 250);
        assert_eq!(coerce_interval_ms(" 1000 "), 1000);
        assert_eq!(coerce_interval_ms("0"), 0);
    }

    #[test]
    fn test_baud_rate_coercion() {
        assert_eq!(coerce_baud_rate(""), 115_200);
        assert_eq!(coerce_baud_rate("baud"), 115_200);
        assert_eq!(coerce_baud_rate("9600"), 9600);
        assert_eq!(coerce_baud_rate("-1"), 0);
        assert_eq!(coerce_baud_rate("4294967295"), u32::MAX);
        assert_eq!(coerce_baud_rate("99999999999"), 115_200);
    }

    #[test]
    fn test_out_of_range_falls_back_to_default() {
        assert_eq!(coerce_interval_ms("1e30"), 500);
        assert_eq!(coerce_interval_ms("inf"), 500);
        assert_eq!(coerce_interval_ms("-inf"), 500);
        assert_eq!(coerce_interval_ms("18446744073709551616"), 500);
        assert_eq!(coerce_baud_rate("4294967296"), 115_200);
        assert_eq!(coerce_baud_rate("infinity"), 115_200);
    }

    #[test]
    fn test_target_device_parsing() {
        assert_eq!(parse_target_device(None), DeviceId(0));
        assert_eq!(parse_target_device(Some("")), DeviceId(0));
        assert_eq!(parse_target_device(Some("12")), DeviceId(12));
        assert_eq!(parse_target_device(Some("  4")), DeviceId(4));
        assert_eq!(parse_target_device(Some("+5")), DeviceId(5));
        assert_eq!(parse_target_device(Some("3 (TeleDongle)")), DeviceId(3));
        assert_eq!(parse_target_device(Some("COM3")), DeviceId(0));
        assert_eq!(parse_target_device(Some("-2")), DeviceId(0));
        assert_eq!(parse_target_device(Some("99999999999")), DeviceId(0));
    }

    proptest! {
        #[test]
        fn interval_round_trips_plain_numbers(ms in 0u64..10_000_000) {
            prop_assert_eq!(coerce_interval_ms(&ms.to_string()), ms);
        }

        #[test]
        fn target_parses_any_u32(id: u32) {
            prop_assert_eq!(parse_target_device(Some(&id.to_string())), DeviceId(id));
        }
    }
}
