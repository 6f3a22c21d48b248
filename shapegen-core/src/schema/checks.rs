use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::formats;
use crate::value::Value;

/// Predicate used by refinements and custom schemas.
pub type RefineFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Fallible mapping applied after the inner schema accepts a value.
pub type TransformFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Mapping applied to the raw input before the inner schema sees it.
pub type PreprocessFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// String formats with a dedicated shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StringFormat {
    Email,
    Url,
    Uuid,
    Cuid,
    Cuid2,
    Ulid,
    Datetime {
        /// Accept `+HH:MM`/`-HH:MM` offsets in addition to `Z`.
        offset: bool,
        /// Exact number of fractional-second digits, when fixed.
        precision: Option<u8>,
    },
    Ip(IpVersion),
}

impl StringFormat {
    pub fn name(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Url => "url",
            StringFormat::Uuid => "uuid",
            StringFormat::Cuid => "cuid",
            StringFormat::Cuid2 => "cuid2",
            StringFormat::Ulid => "ulid",
            StringFormat::Datetime { .. } => "datetime",
            StringFormat::Ip(_) => "ip",
        }
    }

    pub(crate) fn matches(&self, value: &str) -> bool {
        match self {
            StringFormat::Email => formats::is_email(value),
            StringFormat::Url => formats::is_url(value),
            StringFormat::Uuid => formats::is_uuid(value),
            StringFormat::Cuid => formats::is_cuid(value),
            StringFormat::Cuid2 => formats::is_cuid2(value),
            StringFormat::Ulid => formats::is_ulid(value),
            StringFormat::Datetime { offset, precision } => {
                formats::is_datetime(value, *offset, *precision)
            }
            StringFormat::Ip(version) => formats::is_ip(value, *version),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IpVersion {
    #[default]
    Any,
    V4,
    V6,
}

/// Constraints and normalizations attached to a string schema, applied in order.
#[derive(Clone, Debug)]
pub enum StringCheck {
    MinLength(usize),
    MaxLength(usize),
    Length(usize),
    Format(StringFormat),
    Regex(Regex),
    StartsWith(String),
    EndsWith(String),
    Includes(String),
    Trim,
    ToLowerCase,
    ToUpperCase,
}

impl StringCheck {
    /// Whether the check rewrites the string instead of testing it.
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            StringCheck::Trim | StringCheck::ToLowerCase | StringCheck::ToUpperCase
        )
    }

    pub(crate) fn apply(&self, value: String) -> String {
        match self {
            StringCheck::Trim => value.trim().to_string(),
            StringCheck::ToLowerCase => value.to_lowercase(),
            StringCheck::ToUpperCase => value.to_uppercase(),
            _ => value,
        }
    }

    /// Returns a message when `value` violates the check.
    pub(crate) fn violation(&self, value: &str) -> Option<String> {
        let len = value.chars().count();
        match self {
            StringCheck::MinLength(min) if len < *min => {
                Some(format!("string must contain at least {min} character(s)"))
            }
            StringCheck::MaxLength(max) if len > *max => {
                Some(format!("string must contain at most {max} character(s)"))
            }
            StringCheck::Length(exact) if len != *exact => {
                Some(format!("string must contain exactly {exact} character(s)"))
            }
            StringCheck::Format(format) if !format.matches(value) => {
                Some(format!("invalid {}", format.name()))
            }
            StringCheck::Regex(regex) if !regex.is_match(value) => {
                Some(format!("string must match pattern {}", regex.as_str()))
            }
            StringCheck::StartsWith(prefix) if !value.starts_with(prefix.as_str()) => {
                Some(format!("string must start with \"{prefix}\""))
            }
            StringCheck::EndsWith(suffix) if !value.ends_with(suffix.as_str()) => {
                Some(format!("string must end with \"{suffix}\""))
            }
            StringCheck::Includes(needle) if !value.contains(needle.as_str()) => {
                Some(format!("string must include \"{needle}\""))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberCheck {
    Min { value: f64, inclusive: bool },
    Max { value: f64, inclusive: bool },
    Int,
    MultipleOf(f64),
    Finite,
}

impl NumberCheck {
    pub(crate) fn violation(&self, value: f64) -> Option<String> {
        match *self {
            NumberCheck::Min { value: min, inclusive } => {
                let ok = if inclusive { value >= min } else { value > min };
                (!ok).then(|| {
                    let relation = if inclusive {
                        "greater than or equal to"
                    } else {
                        "greater than"
                    };
                    format!("number must be {relation} {min}")
                })
            }
            NumberCheck::Max { value: max, inclusive } => {
                let ok = if inclusive { value <= max } else { value < max };
                (!ok).then(|| {
                    let relation = if inclusive { "less than or equal to" } else { "less than" };
                    format!("number must be {relation} {max}")
                })
            }
            NumberCheck::Int if !(value.is_finite() && value.fract() == 0.0) => {
                Some("expected integer, received float".to_string())
            }
            NumberCheck::MultipleOf(step) if !is_multiple_of(value, step) => {
                Some(format!("number must be a multiple of {step}"))
            }
            NumberCheck::Finite if !value.is_finite() => {
                Some("number must be finite".to_string())
            }
            _ => None,
        }
    }
}

/// Tolerant multiple-of test; quotients within a relative epsilon of an integer count.
pub(crate) fn is_multiple_of(value: f64, step: f64) -> bool {
    if step == 0.0 || !value.is_finite() {
        return false;
    }
    let quotient = value / step;
    if !quotient.is_finite() {
        return false;
    }
    (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BigIntCheck {
    Min { value: i128, inclusive: bool },
    Max { value: i128, inclusive: bool },
    MultipleOf(i128),
}

impl BigIntCheck {
    pub(crate) fn violation(&self, value: i128) -> Option<String> {
        match *self {
            BigIntCheck::Min { value: min, inclusive } => {
                let ok = if inclusive { value >= min } else { value > min };
                (!ok).then(|| format!("bigint must be greater than {min}"))
            }
            BigIntCheck::Max { value: max, inclusive } => {
                let ok = if inclusive { value <= max } else { value < max };
                (!ok).then(|| format!("bigint must be less than {max}"))
            }
            BigIntCheck::MultipleOf(step) => {
                let ok = step != 0 && value % step == 0;
                (!ok).then(|| format!("bigint must be a multiple of {step}"))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DateCheck {
    Min(DateTime<Utc>),
    Max(DateTime<Utc>),
}

impl DateCheck {
    pub(crate) fn violation(&self, value: &DateTime<Utc>) -> Option<String> {
        match self {
            DateCheck::Min(min) if value < min => {
                Some(format!("date must be greater than or equal to {}", min.to_rfc3339()))
            }
            DateCheck::Max(max) if value > max => {
                Some(format!("date must be less than or equal to {}", max.to_rfc3339()))
            }
            _ => None,
        }
    }
}

/// Post-processing stage attached to an effects schema.
#[derive(Clone)]
pub enum Effect {
    Refinement { check: RefineFn, message: String },
    Transform(TransformFn),
    Preprocess(PreprocessFn),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Refinement { message, .. } => f
                .debug_struct("Refinement")
                .field("message", message)
                .finish_non_exhaustive(),
            Effect::Transform(_) => f.write_str("Transform(..)"),
            Effect::Preprocess(_) => f.write_str("Preprocess(..)"),
        }
    }
}
