//! Constructive generators for string formats.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Timelike};
use proptest::prelude::*;
use regex_syntax::hir::Hir;
use regex_syntax::ParserBuilder;

use super::Path;
use crate::error::ArbitraryError;
use crate::schema::{IpVersion, StringFormat, ULID_PATTERN, UUID_PATTERN};

const CUID_GENERATION_PATTERN: &str = "c[0-9a-z]{24}";
const CUID2_GENERATION_PATTERN: &str = "[a-z][0-9a-z]{23}";
const EMAIL_GENERATION_PATTERN: &str =
    r"[a-z0-9][a-z0-9_+\-]{0,15}@[a-z0-9][a-z0-9\-]{0,10}\.([a-z0-9][a-z0-9\-]{0,10}\.)?[a-z]{2,6}";
const URL_GENERATION_PATTERN: &str =
    r"https?://[a-z][a-z0-9\-]{0,15}(\.[a-z][a-z0-9\-]{0,10}){0,2}\.[a-z]{2,6}(/[a-zA-Z0-9_\-]{0,10}){0,3}";

/// Milliseconds since the epoch for 0001-01-01T00:00:00Z and 9999-12-31T23:59:59.999Z.
pub(super) const MIN_FOUR_DIGIT_YEAR_MS: i64 = -62_135_596_800_000;
pub(super) const MAX_FOUR_DIGIT_YEAR_MS: i64 = 253_402_300_799_999;

pub(super) fn format_strategy(
    format: &StringFormat,
    path: &Path,
) -> Result<SBoxedStrategy<String>, ArbitraryError> {
    match format {
        StringFormat::Uuid => regex_strategy(UUID_PATTERN, path),
        StringFormat::Ulid => regex_strategy(ULID_PATTERN, path),
        StringFormat::Cuid => regex_strategy(CUID_GENERATION_PATTERN, path),
        StringFormat::Cuid2 => regex_strategy(CUID2_GENERATION_PATTERN, path),
        StringFormat::Email => regex_strategy(EMAIL_GENERATION_PATTERN, path),
        StringFormat::Url => regex_strategy(URL_GENERATION_PATTERN, path),
        StringFormat::Ip(version) => Ok(ip_strategy(*version)),
        StringFormat::Datetime { offset, precision } => Ok(datetime_strategy(*offset, *precision)),
    }
}

fn regex_strategy(pattern: &str, path: &Path) -> Result<SBoxedStrategy<String>, ArbitraryError> {
    let hir = compile_generation_pattern(pattern).map_err(|reason| ArbitraryError::InvalidSchema {
        path: path.clone(),
        reason,
    })?;
    let strategy = proptest::string::string_regex_parsed(&hir).map_err(|error| {
        ArbitraryError::InvalidSchema {
            path: path.clone(),
            reason: format!("pattern must be a valid regex: {error}"),
        }
    })?;
    Ok(strategy.sboxed())
}

fn compile_generation_pattern(pattern: &str) -> Result<Hir, String> {
    let normalized = normalize_pattern_for_generation(pattern);
    ParserBuilder::new()
        .build()
        .parse(normalized)
        .map_err(|error| format!("pattern must be a valid regex: {error}"))
}

/// Strips the `^`/`$` anchors that the generator cannot honour.
fn normalize_pattern_for_generation(pattern: &str) -> &str {
    let bytes = pattern.as_bytes();
    let mut start = 0;
    let mut end = bytes.len();
    if bytes.first() == Some(&b'^') {
        start = 1;
    }
    if end > start && bytes[end - 1] == b'$' && !is_escaped(bytes, end - 1) {
        end -= 1;
    }
    &pattern[start..end]
}

fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    let backslashes = bytes[..idx]
        .iter()
        .rev()
        .take_while(|byte| **byte == b'\\')
        .count();
    backslashes % 2 == 1
}

fn ip_strategy(version: IpVersion) -> SBoxedStrategy<String> {
    let v4 = any::<[u8; 4]>().prop_map(|octets| Ipv4Addr::from(octets).to_string());
    let v6 = any::<[u16; 8]>().prop_map(|segments| Ipv6Addr::from(segments).to_string());
    match version {
        IpVersion::V4 => v4.sboxed(),
        IpVersion::V6 => v6.sboxed(),
        IpVersion::Any => prop_oneof![v4, v6].sboxed(),
    }
}

fn datetime_strategy(offset: bool, precision: Option<u8>) -> SBoxedStrategy<String> {
    let digits = match precision {
        Some(digits) => Just(digits).sboxed(),
        None => prop_oneof![Just(0u8), Just(3u8)].sboxed(),
    };
    let zone = if offset {
        prop_oneof![
            Just(None::<(bool, u32, u32)>),
            (any::<bool>(), 0u32..=23, 0u32..=59).prop_map(Some),
        ]
        .sboxed()
    } else {
        Just(None).sboxed()
    };
    (MIN_FOUR_DIGIT_YEAR_MS..=MAX_FOUR_DIGIT_YEAR_MS, 0u32..1_000_000, digits, zone)
        .prop_filter_map(
            "timestamp outside the representable range",
            |(millis, sub_millis, digits, zone)| {
                let instant = DateTime::from_timestamp_millis(millis)?;
                let nanos = instant.nanosecond() + sub_millis;
                let mut rendered = instant.format("%Y-%m-%dT%H:%M:%S").to_string();
                if digits > 0 {
                    // Precision past nanoseconds is padded with zeros.
                    let digits = usize::from(digits);
                    let mut fraction = format!("{nanos:09}");
                    fraction.truncate(digits);
                    rendered.push('.');
                    rendered.push_str(&format!("{fraction:0<digits$}"));
                }
                match zone {
                    None => rendered.push('Z'),
                    Some((ahead, hours, minutes)) => {
                        let sign = if ahead { '+' } else { '-' };
                        rendered.push_str(&format!("{sign}{hours:02}:{minutes:02}"));
                    }
                }
                Some(rendered)
            },
        )
        .sboxed()
}
