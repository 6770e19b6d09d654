//! Operator duration strings.
//!
//! Accepts a bare number of seconds (`3600`) or a run of unit-suffixed
//! components (`1d12h`, `2w`, `90m30s`). Units: `y` (365 days), `w`, `d`,
//! `h`, `m`, `s`, case-insensitive. `0` means permanent.

/// Parse a duration string into seconds.
///
/// Returns `None` for empty input, unknown units, a unit with no number in
/// front of it, or overflow.
pub fn parse_duration(input: &str) -> Option<i64> {
    if input.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut current: Option<i64> = None;

    for c in input.chars() {
        if let Some(digit) = c.to_digit(10) {
            let value = current.unwrap_or(0);
            current = Some(value.checked_mul(10)?.checked_add(i64::from(digit))?);
            continue;
        }

        let multiplier = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            'y' => 60 * 60 * 24 * 365,
            _ => return None,
        };
        let amount = current.take()?;
        total = total.checked_add(amount.checked_mul(multiplier)?)?;
    }

    // Trailing digits with no unit are seconds.
    if let Some(amount) = current {
        total = total.checked_add(amount)?;
    }

    Some(total)
}

/// Render seconds in the compact form accepted by [`parse_duration`].
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0".to_string();
    }

    let mut rest = secs;
    let mut out = String::new();
    for (unit, size) in [
        ('y', 60 * 60 * 24 * 365),
        ('w', 60 * 60 * 24 * 7),
        ('d', 60 * 60 * 24),
        ('h', 60 * 60),
        ('m', 60),
        ('s', 1),
    ] {
        if rest >= size {
            out.push_str(&(rest / size).to_string());
            out.push(unit);
            rest %= size;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_seconds() {
        assert_eq!(parse_duration("0"), Some(0));
        assert_eq!(parse_duration("3600"), Some(3600));
    }

    #[test]
    fn unit_components() {
        assert_eq!(parse_duration("1d"), Some(86400));
        assert_eq!(parse_duration("2h30m"), Some(9000));
        assert_eq!(parse_duration("1W1D"), Some(8 * 86400));
        assert_eq!(parse_duration("1m30"), Some(90));
        assert_eq!(parse_duration("1y"), Some(365 * 86400));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration("-5"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
    }

    #[test]
    fn format_is_parseable() {
        assert_eq!(format_duration(0), "0");
        assert_eq!(format_duration(90), "1m30s");
        assert_eq!(format_duration(86400 + 3600), "1d1h");
        assert_eq!(parse_duration(&format_duration(1_000_000)), Some(1_000_000));
    }
}
