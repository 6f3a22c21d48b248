use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::checks::IpVersion;

static UUID: OnceLock<Option<Regex>> = OnceLock::new();
static CUID: OnceLock<Option<Regex>> = OnceLock::new();
static CUID2: OnceLock<Option<Regex>> = OnceLock::new();
static ULID: OnceLock<Option<Regex>> = OnceLock::new();
static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static URL: OnceLock<Option<Regex>> = OnceLock::new();

pub(crate) const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";
pub(crate) const CUID_PATTERN: &str = r"^c[^\s-]{8,}$";
pub(crate) const CUID2_PATTERN: &str = r"^[0-9a-z]+$";
pub(crate) const ULID_PATTERN: &str = r"^[0-9A-HJKMNP-TV-Z]{26}$";
const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$";
const URL_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+(?:[/?#]\S*)?$";

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}

pub(crate) fn is_uuid(value: &str) -> bool {
    matches(&UUID, UUID_PATTERN, value)
}

pub(crate) fn is_cuid(value: &str) -> bool {
    matches(&CUID, CUID_PATTERN, value)
}

pub(crate) fn is_cuid2(value: &str) -> bool {
    matches(&CUID2, CUID2_PATTERN, value)
}

pub(crate) fn is_ulid(value: &str) -> bool {
    matches(&ULID, ULID_PATTERN, value)
}

pub(crate) fn is_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && matches(&EMAIL, EMAIL_PATTERN, value)
}

pub(crate) fn is_url(value: &str) -> bool {
    matches(&URL, URL_PATTERN, value)
}

pub(crate) fn is_ip(value: &str, version: IpVersion) -> bool {
    let v4 = || value.parse::<Ipv4Addr>().is_ok();
    let v6 = || value.parse::<Ipv6Addr>().is_ok();
    match version {
        IpVersion::V4 => v4(),
        IpVersion::V6 => v6(),
        IpVersion::Any => v4() || v6(),
    }
}

/// ISO 8601 timestamps of the form `YYYY-MM-DDTHH:MM:SS[.fff](Z|±HH:MM)`.
pub(crate) fn is_datetime(value: &str, offset: bool, precision: Option<u8>) -> bool {
    let body = if let Some(body) = value.strip_suffix('Z') {
        body
    } else if offset {
        let split = value.len().saturating_sub(6);
        match (value.get(..split), value.get(split..)) {
            (Some(body), Some(zone)) if is_offset(zone) => body,
            _ => return false,
        }
    } else {
        return false;
    };

    let bytes = body.as_bytes();
    if bytes.len() < 19 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[10] != b'T' {
        return false;
    }
    let fraction = match body.get(19..) {
        Some("") => 0,
        Some(rest) => match rest.strip_prefix('.') {
            Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                digits.len()
            }
            _ => return false,
        },
        None => return false,
    };
    if let Some(precision) = precision {
        if fraction != usize::from(precision) {
            return false;
        }
    }
    NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

fn is_offset(zone: &str) -> bool {
    let bytes = zone.as_bytes();
    bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b':'
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit()
}
