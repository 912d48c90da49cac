//! Fixed-column ASCII field codecs used by the RINEX parser: unsigned
//! integers, signed fixed-point decimals, and the F14.3 observation
//! field specialization.

/// Parses `width` characters as an unsigned integer: leading spaces
/// allowed, thereafter only ASCII digits. Returns `None` on any other
/// character or if `text` is shorter than `width`.
pub fn parse_uint(text: &str, width: usize) -> Option<u64> {
    let bytes = text.as_bytes();
    if bytes.len() < width {
        return None;
    }
    let field = &bytes[..width];
    let mut value: u64 = 0;
    let mut seen_digit = false;
    for &b in field {
        match b {
            b' ' if !seen_digit => continue,
            b'0'..=b'9' => {
                seen_digit = true;
                value = value * 10 + (b - b'0') as u64;
            },
            _ => return None,
        }
    }
    Some(value)
}

/// Parses a `width`-character signed fixed-point decimal field with
/// `frac` digits after the point, returning the value scaled by
/// `10^frac`. Leading spaces (and an optional leading `-`) are allowed
/// before the digits; trailing spaces or an early line end are treated
/// as zero digits for the remainder of the field.
pub fn parse_fixed(text: &str, width: usize, frac: usize) -> Option<i64> {
    let bytes = text.as_bytes();
    let take = width.min(bytes.len());
    let field = &bytes[..take];

    let mut idx = 0;
    while idx < field.len() && field[idx] == b' ' {
        idx += 1;
    }
    let negative = idx < field.len() && field[idx] == b'-';
    if negative {
        idx += 1;
    }

    let mut int_value: i64 = 0;
    let mut frac_value: i64 = 0;
    let mut frac_digits = 0usize;
    let mut seen_point = false;
    let mut seen_digit = false;

    while idx < field.len() {
        match field[idx] {
            b' ' | b'\r' | b'\n' => break,
            b'.' if !seen_point => seen_point = true,
            b'0'..=b'9' => {
                let d = (field[idx] - b'0') as i64;
                seen_digit = true;
                if seen_point {
                    frac_value = frac_value * 10 + d;
                    frac_digits += 1;
                } else {
                    int_value = int_value * 10 + d;
                }
            },
            _ => return None,
        }
        idx += 1;
    }
    if !seen_digit {
        return None;
    }
    while frac_digits < frac {
        frac_value *= 10;
        frac_digits += 1;
    }
    while frac_digits > frac {
        frac_value /= 10;
        frac_digits -= 1;
    }

    let mut scale: i64 = 1;
    for _ in 0..frac {
        scale *= 10;
    }
    let magnitude = int_value * scale + frac_value;
    Some(if negative { -magnitude } else { magnitude })
}

/// Sentinel returned by [parse_obs] on malformed input, matching the
/// original C API's `INT64_MIN` convention.
pub const PARSE_OBS_ERROR: i64 = i64::MIN;

/// Parses a RINEX F14.3 observation field, returning the value times 1000.
pub fn parse_obs(text: &str) -> i64 {
    parse_fixed(text, 14, 3).unwrap_or(PARSE_OBS_ERROR)
}

/// Renders `value` as a right-justified unsigned decimal field `width`
/// characters wide, the inverse of [parse_uint].
pub fn format_uint(value: u64, width: usize) -> String {
    format!("{value:>width$}")
}

/// Renders `value` (scaled by `10^frac`) as a right-justified signed
/// fixed-point decimal field `width` characters wide, the inverse of
/// [parse_fixed]. Truncates rather than rounds if the rendered field
/// would overflow `width`.
pub fn format_fixed(value: i64, width: usize, frac: usize) -> String {
    let scale = 10i64.pow(frac as u32);
    let magnitude = value.unsigned_abs();
    let int_part = magnitude / scale as u64;
    let frac_part = magnitude % scale as u64;
    let body = format!("{int_part}.{frac_part:0frac$}");
    let signed = if value < 0 {
        format!("-{body}")
    } else {
        body
    };
    format!("{signed:>width$}")
}

/// Renders a decoded observation value (scaled by 1000) as the 14-character
/// body of an F14.3 observation field, the inverse of [parse_obs].
/// Returns 14 spaces for [PARSE_OBS_ERROR].
pub fn format_obs(value: i64) -> String {
    if value == PARSE_OBS_ERROR {
        " ".repeat(14)
    } else {
        format_fixed(value, 14, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_obs_examples() {
        assert_eq!(parse_obs("          .300 8"), 300);
        assert_eq!(parse_obs("         -.353  "), -353);
        assert_eq!(parse_obs("    -53875.632 8"), -53_875_632);
    }

    #[test]
    fn parse_uint_leading_spaces() {
        assert_eq!(parse_uint("  42", 4), Some(42));
        assert_eq!(parse_uint("1234", 4), Some(1234));
        assert_eq!(parse_uint("  4x", 4), None);
    }

    #[test]
    fn parse_fixed_rejects_garbage() {
        assert_eq!(parse_fixed("abcdefghijklmn", 14, 3), None);
    }

    #[test]
    fn format_uint_pads_left() {
        assert_eq!(format_uint(42, 4), "  42");
    }

    #[test]
    fn format_fixed_round_trips_through_parse() {
        for &value in &[0i64, 300, -353, -53_875_632] {
            let text = format_fixed(value, 14, 3);
            assert_eq!(parse_fixed(&text, 14, 3), Some(value));
        }
    }

    #[test]
    fn format_obs_blanks_the_error_sentinel() {
        assert_eq!(format_obs(PARSE_OBS_ERROR), " ".repeat(14));
    }
}
