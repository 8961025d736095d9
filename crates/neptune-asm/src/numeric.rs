//! Numeric-literal and register-token parsing (spec.md §4.8).

/// Parses `0x...` hex (unsigned), `0b...` binary, or a signed decimal
/// literal wrapped to 32-bit two's complement.
#[must_use]
pub fn parse_numeric(token: &str) -> Option<u32> {
    let t = token.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return u32::from_str_radix(bin, 2).ok();
    }
    let value: i64 = t.parse().ok()?;
    if (i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}

/// Parses a register token: `r0`..`rN-1` (case-insensitive), or the
/// `pc`/`sp`/`hp` aliases (252/253/254).
#[must_use]
pub fn parse_register(token: &str) -> Option<u32> {
    let t = token.trim();
    match t.to_ascii_lowercase().as_str() {
        "pc" => return Some(252),
        "sp" => return Some(253),
        "hp" => return Some(254),
        _ => {}
    }
    let rest = t.strip_prefix(['r', 'R'])?;
    rest.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_binary_and_decimal() {
        assert_eq!(parse_numeric("0x1A"), Some(0x1A));
        assert_eq!(parse_numeric("0b101"), Some(5));
        assert_eq!(parse_numeric("42"), Some(42));
    }

    #[test]
    fn negative_decimal_wraps_to_two_s_complement() {
        assert_eq!(parse_numeric("-1"), Some(0xFFFF_FFFF));
    }

    #[test]
    fn register_tokens_and_aliases() {
        assert_eq!(parse_register("r0"), Some(0));
        assert_eq!(parse_register("R31"), Some(31));
        assert_eq!(parse_register("pc"), Some(252));
        assert_eq!(parse_register("SP"), Some(253));
        assert_eq!(parse_register("hp"), Some(254));
        assert_eq!(parse_register("x1"), None);
    }
}
