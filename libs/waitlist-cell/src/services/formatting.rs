// libs/waitlist-cell/src/services/formatting.rs
use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Longest national number we accept without a country code.
const MAX_NATIONAL_DIGITS: usize = 11;

/// Digits-only, country-code-prefixed phone number as the messaging
/// transport expects it. Returns `None` when the input holds no digits.
///
/// Numbers written with `+` or `00` already carry their country code and are
/// kept as dialled.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let all_digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let international = raw.trim_start().starts_with('+') || all_digits.starts_with("00");
    let digits = all_digits.strip_prefix("00").unwrap_or(&all_digits);

    if digits.is_empty() {
        return None;
    }

    if international {
        return Some(digits.to_string());
    }

    // A leading zero is a national trunk prefix, never part of a country code.
    if digits.starts_with('0') || digits.len() <= MAX_NATIONAL_DIGITS {
        let national = digits.trim_start_matches('0');
        if national.is_empty() {
            return None;
        }
        return Some(format!("{}{}", default_country_code, national));
    }

    Some(digits.to_string())
}

/// Human-readable slot start, e.g. `19/10/2026 14:30`.
pub fn format_slot(starts_at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or(Utc.fix());
    starts_at
        .with_timezone(&offset)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}
