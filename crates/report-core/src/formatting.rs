/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(-9876), "-9,876");
/// ```
pub fn format_count(value: i64) -> String {
    let grouped = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Share of `part` in `whole` as a percentage string with `decimals` places.
///
/// Returns `"-"` when `whole` is zero.
///
/// # Examples
///
/// ```
/// use report_core::formatting::format_share;
///
/// assert_eq!(format_share(50, 200, 1), "25.0%");
/// assert_eq!(format_share(1, 3, 2), "33.33%");
/// assert_eq!(format_share(5, 0, 1), "-");
/// ```
pub fn format_share(part: i64, whole: i64, decimals: usize) -> String {
    if whole == 0 {
        return "-".to_string();
    }
    let pct = part as f64 / whole as f64 * 100.0;
    format!("{:.prec$}%", pct, prec = decimals)
}

/// Keep at most `max_chars` characters of `s`.
///
/// Counts `char`s rather than bytes so multi-byte labels are never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_count ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_count_small() {
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn test_format_count_exact_thousands() {
        assert_eq!(format_count(1_000), "1,000");
    }

    #[test]
    fn test_format_count_negative() {
        assert_eq!(format_count(-1_234_567), "-1,234,567");
    }

    #[test]
    fn test_format_count_extremes() {
        assert_eq!(format_count(i64::MIN), "-9,223,372,036,854,775,808");
    }

    // ── format_share ─────────────────────────────────────────────────────────

    #[test]
    fn test_format_share_whole() {
        assert_eq!(format_share(100, 100, 0), "100%");
    }

    #[test]
    fn test_format_share_zero_total() {
        assert_eq!(format_share(0, 0, 2), "-");
    }

    // ── truncate_chars ───────────────────────────────────────────────────────

    #[test]
    fn test_truncate_chars_short_untouched() {
        assert_eq!(truncate_chars("VOD", 31), "VOD");
    }

    #[test]
    fn test_truncate_chars_limit() {
        let long = "A".repeat(40);
        assert_eq!(truncate_chars(&long, 31).len(), 31);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("Téléfilm", 3), "Tél");
    }

    // ── group_thousands ──────────────────────────────────────────────────────

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("123456"), "123,456");
        assert_eq!(group_thousands("12"), "12");
    }
}
