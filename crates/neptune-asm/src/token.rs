//! Line cleanup and tokenization (spec.md §4.8).

/// Strips a trailing `;`/`#` comment and surrounding whitespace. Returns
/// `None` for a blank or fully-commented line.
#[must_use]
pub fn clean_line(raw: &str) -> Option<String> {
    let end = raw.find([';', '#']).unwrap_or(raw.len());
    let trimmed = raw[..end].trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits an instruction line into its mnemonic and comma-separated,
/// trimmed argument tokens.
#[must_use]
pub fn split_mnemonic_args(line: &str) -> (&str, Vec<String>) {
    let mut parts = line.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim();
    if rest.is_empty() {
        (mnemonic, Vec::new())
    } else {
        (mnemonic, rest.split(',').map(|s| s.trim().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_blank_lines() {
        assert_eq!(clean_line("  MOVI r1, 5 ; set counter"), Some("MOVI r1, 5".to_string()));
        assert_eq!(clean_line("# just a comment"), None);
        assert_eq!(clean_line("   "), None);
    }

    #[test]
    fn splits_mnemonic_and_args() {
        let (m, args) = split_mnemonic_args("ADDI r1, 0x10");
        assert_eq!(m, "ADDI");
        assert_eq!(args, vec!["r1", "0x10"]);
    }

    #[test]
    fn no_operand_mnemonic_has_empty_args() {
        let (m, args) = split_mnemonic_args("HLT");
        assert_eq!(m, "HLT");
        assert!(args.is_empty());
    }
}
