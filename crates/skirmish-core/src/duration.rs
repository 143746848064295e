use crate::error::DurationParseError;

/// Parse a duration such as `"500ms"`, `"1s"`, `"2m"` or `"1m30s"` into milliseconds.
///
/// A bare number is taken as milliseconds. Segments are summed.
pub fn parse_duration_ms(input: &str) -> Result<u64, DurationParseError> {
    let fail = |reason| DurationParseError {
        input: input.to_string(),
        reason,
    };

    let text = input.trim();
    if text.is_empty() {
        return Err(fail("empty duration"));
    }
    if text.starts_with('-') {
        return Err(fail("duration cannot be negative"));
    }

    let mut total: u64 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(fail("expected a number"));
        }
        let amount: u64 = rest[..digits]
            .parse()
            .map_err(|_| fail("number out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let scale = match rest[..unit_len].trim() {
            "" | "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            _ => return Err(fail("unknown unit")),
        };
        rest = &rest[unit_len..];

        total = amount
            .checked_mul(scale)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| fail("duration out of range"))?;
    }

    Ok(total)
}

/// Convert milliseconds to scheduler ticks, rounding up
pub fn ms_to_ticks(ms: u64, ticks_per_second: u32) -> u64 {
    let tps = u64::from(ticks_per_second.max(1));
    ms.saturating_mul(tps).div_ceil(1_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration_ms("500ms").unwrap(), 500);
        assert_eq!(parse_duration_ms("1s").unwrap(), 1_000);
        assert_eq!(parse_duration_ms("2m").unwrap(), 120_000);
        assert_eq!(parse_duration_ms("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration_ms("250").unwrap(), 250);
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration_ms("1m30s").unwrap(), 90_000);
        assert_eq!(parse_duration_ms(" 1s500ms ").unwrap(), 1_500);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration_ms("").is_err());
        assert!(parse_duration_ms("-1s").is_err());
        assert!(parse_duration_ms("s").is_err());
        assert!(parse_duration_ms("5 parsecs").is_err());
        assert_eq!(
            parse_duration_ms("3y").unwrap_err().reason,
            "unknown unit"
        );
    }

    #[test]
    fn test_ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(1_000, 20), 20);
        assert_eq!(ms_to_ticks(50, 20), 1);
        assert_eq!(ms_to_ticks(51, 20), 2);
        assert_eq!(ms_to_ticks(0, 20), 0);
    }
}
