//! Integrity fingerprint for session credentials.
//!
//! A 31-multiplier rolling hash over the concatenated credential fields,
//! rendered in lowercase base 36. It catches accidental corruption of a
//! scanned payload; it does not resist deliberate forgery. Anything that
//! needs forgery resistance should move to an HMAC over the same fields with
//! a server-held key.

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the checksum of `resident_id + timestamp_iso + qr_code_id`.
///
/// Each Unicode scalar value is folded into a wrapping 32-bit signed
/// accumulator as `h = h * 31 + c`; the magnitude of the result is encoded
/// in base 36.
///
/// # Examples
/// ```
/// use resident_id::domain::checksum;
///
/// assert_eq!(checksum("a", "", ""), "2p");
/// assert_eq!(checksum("a", "b", ""), checksum("", "", "ab"));
/// ```
pub fn checksum(resident_id: &str, timestamp_iso: &str, qr_code_id: &str) -> String {
    let hash = [resident_id, timestamp_iso, qr_code_id]
        .into_iter()
        .flat_map(str::chars)
        .fold(0_i32, |acc, c| {
            // Scalar values top out at 0x10FFFF, well inside i32.
            let code_point = i32::try_from(u32::from(c)).unwrap_or(i32::MAX);
            acc.wrapping_mul(31).wrapping_add(code_point)
        });
    to_base36(hash.unsigned_abs())
}

/// Whether `expected` matches the checksum recomputed from the inputs.
pub fn checksum_matches(
    expected: &str,
    resident_id: &str,
    timestamp_iso: &str,
    qr_code_id: &str,
) -> bool {
    checksum(resident_id, timestamp_iso, qr_code_id) == expected
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = BASE36_DIGITS
            .get((value % 36) as usize)
            .copied()
            .unwrap_or(b'0');
        digits.push(char::from(digit));
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    /// Independent rendition using 64-bit arithmetic reduced modulo 2^32.
    fn reference(input: &str) -> String {
        let mut h: i64 = 0;
        for c in input.chars() {
            h = (h * 31 + i64::from(u32::from(c))).rem_euclid(1 << 32);
        }
        let signed = if h >= 1 << 31 { h - (1 << 32) } else { h };
        let mut magnitude = signed.unsigned_abs();
        if magnitude == 0 {
            return "0".to_owned();
        }
        let mut out = Vec::new();
        while magnitude > 0 {
            let digit = u32::try_from(magnitude % 36).expect("digit fits");
            out.push(char::from_digit(digit, 36).expect("base36 digit"));
            magnitude /= 36;
        }
        out.iter().rev().collect()
    }

    #[rstest]
    #[case("", "", "", "0")]
    #[case("a", "", "", "2p")]
    #[case("a", "b", "", "2e9")]
    #[case("\u{e9}", "", "", "6h")]
    fn known_values(
        #[case] resident_id: &str,
        #[case] timestamp: &str,
        #[case] qr: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(checksum(resident_id, timestamp, qr), expected);
    }

    #[rstest]
    #[case("R1", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101")]
    #[case(
        "3fa85f64-5717-4562-b3fc-2c963f66afa6",
        "2025-06-30T23:59:59.999Z",
        "BRG_3fa85f64-5717-4562-b3fc-2c963f66afa6_20250101"
    )]
    #[case("Ñiño", "2024-12-25T08:00:00.123Z", "BRG_Ñiño_20241225")]
    fn matches_reference_with_wrap_around(
        #[case] resident_id: &str,
        #[case] timestamp: &str,
        #[case] qr: &str,
    ) {
        let concatenated = format!("{resident_id}{timestamp}{qr}");
        assert_eq!(checksum(resident_id, timestamp, qr), reference(&concatenated));
    }

    #[rstest]
    fn is_deterministic() {
        let first = checksum("R1", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101");
        let second = checksum("R1", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101");
        assert_eq!(first, second);
        assert!(checksum_matches(
            &first,
            "R1",
            "2024-01-01T00:00:00.000Z",
            "BRG_R1_20240101"
        ));
    }

    #[rstest]
    fn single_field_change_alters_result() {
        let original = checksum("R1", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101");
        let tampered = checksum("R2", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101");
        assert_ne!(original, tampered);
    }

    #[rstest]
    fn output_uses_lowercase_base36_only() {
        let value = checksum("R1", "2024-01-01T00:00:00.000Z", "BRG_R1_20240101");
        assert!(
            value
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }
}
