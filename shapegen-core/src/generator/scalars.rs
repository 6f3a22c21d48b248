//! Range-narrowed generators for scalar schemas.
//!
//! Each builder returns a [`Candidate`]: a strategy plus whether every value it
//! yields already satisfies the schema. Inexact candidates are wrapped with the
//! acceptance monitor by the dispatcher.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use proptest::strategy::Union;

use super::formats::{self, MAX_FOUR_DIGIT_YEAR_MS, MIN_FOUR_DIGIT_YEAR_MS};
use super::{Path, ValueStrategy};
use crate::error::ArbitraryError;
use crate::schema::{
    BigIntCheck, BigIntDef, DateCheck, DateDef, NumberCheck, NumberDef, StringCheck, StringDef,
    StringFormat, MAX_SAFE_INTEGER,
};
use crate::value::Value;
use crate::GenerationConfig;

const EDGE_WEIGHT: u32 = 1;
const RANGE_WEIGHT: u32 = 8;
const SMALL_MAGNITUDE: f64 = 1e3;
/// Largest integer magnitude for which every `k * step` is exact.
const MAX_EXACT_MULTIPLE: f64 = 9_007_199_254_740_992.0;
const DEFAULT_BIGINT_SPAN: i128 = 1 << 64;

pub(super) struct Candidate {
    pub(super) strategy: ValueStrategy,
    pub(super) exact: bool,
}

impl Candidate {
    fn exact(strategy: ValueStrategy) -> Self {
        Self {
            strategy,
            exact: true,
        }
    }

    fn new(strategy: ValueStrategy, exact: bool) -> Self {
        Self { strategy, exact }
    }
}

fn invalid(path: &Path, reason: String) -> ArbitraryError {
    ArbitraryError::InvalidSchema {
        path: path.clone(),
        reason,
    }
}

#[derive(Debug, Default)]
struct StringPlan {
    min: usize,
    max: Option<usize>,
    formats: Vec<StringFormat>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    includes: Vec<String>,
    needs_filter: bool,
}

impl StringPlan {
    fn from_checks(checks: &[StringCheck]) -> Self {
        let mut plan = StringPlan::default();
        for check in checks {
            match check {
                StringCheck::MinLength(min) => plan.min = plan.min.max(*min),
                StringCheck::MaxLength(max) => {
                    plan.max = Some(plan.max.map_or(*max, |m| m.min(*max)));
                }
                StringCheck::Length(exact) => {
                    plan.min = plan.min.max(*exact);
                    plan.max = Some(plan.max.map_or(*exact, |m| m.min(*exact)));
                }
                StringCheck::Format(format) => plan.formats.push(*format),
                StringCheck::StartsWith(prefix) => plan.prefixes.push(prefix.clone()),
                StringCheck::EndsWith(suffix) => plan.suffixes.push(suffix.clone()),
                StringCheck::Includes(needle) => plan.includes.push(needle.clone()),
                StringCheck::Regex(_)
                | StringCheck::Trim
                | StringCheck::ToLowerCase
                | StringCheck::ToUpperCase => plan.needs_filter = true,
            }
        }
        plan
    }

    fn has_length_bounds(&self) -> bool {
        self.min > 0 || self.max.is_some()
    }

    fn has_affixes(&self) -> bool {
        !(self.prefixes.is_empty() && self.suffixes.is_empty() && self.includes.is_empty())
    }
}

pub(super) fn string_candidate(
    def: &StringDef,
    path: &Path,
    config: &GenerationConfig,
) -> Result<Candidate, ArbitraryError> {
    let plan = StringPlan::from_checks(&def.checks);
    if let Some(max) = plan.max {
        if max < plan.min {
            return Err(invalid(
                path,
                format!("maximum length {max} is below minimum length {}", plan.min),
            ));
        }
    }

    if let Some(format) = plan.formats.first() {
        let strategy = formats::format_strategy(format, path)?
            .prop_map(Value::String)
            .sboxed();
        let exact = plan.formats.len() == 1
            && !plan.needs_filter
            && !plan.has_length_bounds()
            && !plan.has_affixes();
        return Ok(Candidate::new(strategy, exact));
    }

    let prefix = plan.prefixes.first().cloned().unwrap_or_default();
    let suffix = plan.suffixes.first().cloned().unwrap_or_default();
    let infix: String = plan.includes.concat();
    let fixed_len = prefix.chars().count() + infix.chars().count() + suffix.chars().count();
    let mut exact = !plan.needs_filter && plan.prefixes.len() <= 1 && plan.suffixes.len() <= 1;
    if plan.max.is_some_and(|max| max < fixed_len) {
        exact = false;
    }

    let body_min = plan.min.saturating_sub(fixed_len);
    let body_max = match plan.max {
        Some(max) => max.saturating_sub(fixed_len).max(body_min),
        None => body_min + config.max_extra_len,
    };
    let strategy = proptest::collection::vec(proptest::char::any(), body_min..=body_max)
        .prop_map(move |body| {
            let mut value = String::with_capacity(fixed_len + body.len());
            value.push_str(&prefix);
            value.push_str(&infix);
            value.extend(body);
            value.push_str(&suffix);
            Value::String(value)
        })
        .sboxed();
    Ok(Candidate::new(strategy, exact))
}

/// Inclusive bounds after folding every min/max check.
#[derive(Debug, Default)]
struct FloatBounds {
    lo: Option<f64>,
    hi: Option<f64>,
}

pub(super) fn number_candidate(def: &NumberDef, path: &Path) -> Result<Candidate, ArbitraryError> {
    let mut bounds = FloatBounds::default();
    let mut integer = false;
    let mut steps = Vec::new();
    for check in &def.checks {
        match *check {
            NumberCheck::Min { value, inclusive } => {
                if value.is_nan() {
                    return Err(invalid(path, "minimum must not be NaN".to_string()));
                }
                let value = if inclusive { value } else { next_up(value) };
                bounds.lo = Some(bounds.lo.map_or(value, |lo| lo.max(value)));
            }
            NumberCheck::Max { value, inclusive } => {
                if value.is_nan() {
                    return Err(invalid(path, "maximum must not be NaN".to_string()));
                }
                let value = if inclusive { value } else { next_down(value) };
                bounds.hi = Some(bounds.hi.map_or(value, |hi| hi.min(value)));
            }
            NumberCheck::Int => integer = true,
            NumberCheck::MultipleOf(step) => steps.push(step),
            NumberCheck::Finite => {}
        }
    }
    if let (Some(lo), Some(hi)) = (bounds.lo, bounds.hi) {
        if lo > hi {
            return Err(invalid(path, format!("no number lies between {lo} and {hi}")));
        }
    }

    if integer || !steps.is_empty() {
        return multiple_candidate(def, path, &bounds, &steps);
    }
    float_candidate(def, path, &bounds)
}

fn multiple_candidate(
    def: &NumberDef,
    path: &Path,
    bounds: &FloatBounds,
    steps: &[f64],
) -> Result<Candidate, ArbitraryError> {
    let step = steps.first().copied().unwrap_or(1.0).abs();
    if step == 0.0 || !step.is_finite() {
        return Err(invalid(
            path,
            format!("multiple-of step must be finite and non-zero, got {step}"),
        ));
    }
    let lo = bounds.lo.unwrap_or_else(|| {
        (-MAX_SAFE_INTEGER).min(bounds.hi.map_or(0.0, |hi| hi - MAX_SAFE_INTEGER))
    });
    let hi = bounds.hi.unwrap_or_else(|| {
        MAX_SAFE_INTEGER.max(bounds.lo.map_or(0.0, |lo| lo + MAX_SAFE_INTEGER))
    });
    let within_bounds = |k: f64| {
        def.checks
            .iter()
            .filter(|check| matches!(check, NumberCheck::Min { .. } | NumberCheck::Max { .. }))
            .all(|check| check.violation(k * step).is_none())
    };
    let mut k_lo = (lo / step).ceil();
    let mut k_hi = (hi / step).floor();
    // An exclusive bound moved by one ulp can still round onto the excluded multiple.
    if !within_bounds(k_lo) {
        k_lo += 1.0;
    }
    if !within_bounds(k_hi) {
        k_hi -= 1.0;
    }
    if k_lo.is_nan() || k_hi.is_nan() || k_lo > k_hi {
        return Err(invalid(
            path,
            format!("no multiple of {step} lies between {lo} and {hi}"),
        ));
    }

    let step_is_integral = step.fract() == 0.0;
    let in_safe_range = lo >= -MAX_SAFE_INTEGER && hi <= MAX_SAFE_INTEGER;
    let exact = steps.len() <= 1
        && step_is_integral
        && in_safe_range
        && k_lo.abs() <= MAX_EXACT_MULTIPLE
        && k_hi.abs() <= MAX_EXACT_MULTIPLE;

    let k_lo = k_lo.clamp(-MAX_EXACT_MULTIPLE, MAX_EXACT_MULTIPLE) as i64;
    let k_hi = k_hi.clamp(-MAX_EXACT_MULTIPLE, MAX_EXACT_MULTIPLE) as i64;
    let multiples = Union::new_weighted(vec![
        (EDGE_WEIGHT, Just(k_lo).sboxed()),
        (EDGE_WEIGHT, Just(k_hi).sboxed()),
        (RANGE_WEIGHT, (k_lo..=k_hi).sboxed()),
    ]);
    let strategy = multiples
        .prop_map(move |k| Value::Number(k as f64 * step))
        .sboxed();
    log::trace!(
        "number schema with {} checks narrowed to multiples of {step} in [{lo}, {hi}]",
        def.checks.len()
    );
    Ok(Candidate::new(strategy, exact))
}

fn float_candidate(
    def: &NumberDef,
    path: &Path,
    bounds: &FloatBounds,
) -> Result<Candidate, ArbitraryError> {
    use proptest::num::f64 as float;

    if bounds.lo.is_none() && bounds.hi.is_none() {
        let kinds =
            float::POSITIVE | float::NEGATIVE | float::NORMAL | float::SUBNORMAL | float::ZERO;
        return Ok(Candidate::exact(kinds.prop_map(Value::Number).sboxed()));
    }

    let lo = bounds.lo.unwrap_or(f64::NEG_INFINITY);
    let hi = bounds.hi.unwrap_or(f64::INFINITY);
    let accepts = |value: f64| def.checks.iter().all(|check| check.violation(value).is_none());

    let mut options: Vec<(u32, SBoxedStrategy<f64>)> = Vec::new();
    // Infinite edges only appear when a bound names them explicitly.
    let mut edges = vec![lo, hi, 0.0];
    edges.retain(|edge| {
        edge.is_finite() || bounds.lo == Some(*edge) || bounds.hi == Some(*edge)
    });
    edges.dedup();
    for edge in edges.into_iter().filter(|edge| accepts(*edge)) {
        options.push((EDGE_WEIGHT, Just(edge).sboxed()));
    }

    let range_lo = lo.max(f64::MIN);
    let range_hi = hi.min(f64::MAX);
    if range_lo <= range_hi {
        for (start, end) in float_ranges(range_lo, range_hi) {
            options.push((RANGE_WEIGHT, (start..=end).sboxed()));
        }
        let small_lo = range_lo.max(-SMALL_MAGNITUDE);
        let small_hi = range_hi.min(SMALL_MAGNITUDE);
        if small_lo <= small_hi {
            options.push((RANGE_WEIGHT, (small_lo..=small_hi).sboxed()));
        }
    }

    if options.is_empty() {
        return Err(invalid(path, format!("no number lies between {lo} and {hi}")));
    }
    Ok(Candidate::exact(
        Union::new_weighted(options).prop_map(Value::Number).sboxed(),
    ))
}

/// Splits `[lo, hi]` at zero so no sampled span overflows to infinity.
fn float_ranges(lo: f64, hi: f64) -> Vec<(f64, f64)> {
    if lo < 0.0 && hi > 0.0 && !(hi - lo).is_finite() {
        vec![(lo, 0.0), (0.0, hi)]
    } else {
        vec![(lo, hi)]
    }
}

/// The least float strictly greater than `value`.
pub(super) fn next_up(value: f64) -> f64 {
    if value.is_nan() || value == f64::INFINITY {
        return value;
    }
    if value == 0.0 {
        return f64::from_bits(1);
    }
    let bits = value.to_bits();
    if value > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// The greatest float strictly less than `value`.
pub(super) fn next_down(value: f64) -> f64 {
    -next_up(-value)
}

pub(super) fn bigint_candidate(def: &BigIntDef, path: &Path) -> Result<Candidate, ArbitraryError> {
    let mut lo: Option<i128> = None;
    let mut hi: Option<i128> = None;
    let mut steps = Vec::new();
    for check in &def.checks {
        match *check {
            BigIntCheck::Min { value, inclusive } => {
                let value = if inclusive {
                    value
                } else {
                    value
                        .checked_add(1)
                        .ok_or_else(|| invalid(path, format!("no bigint is greater than {value}")))?
                };
                lo = Some(lo.map_or(value, |lo| lo.max(value)));
            }
            BigIntCheck::Max { value, inclusive } => {
                let value = if inclusive {
                    value
                } else {
                    value
                        .checked_sub(1)
                        .ok_or_else(|| invalid(path, format!("no bigint is less than {value}")))?
                };
                hi = Some(hi.map_or(value, |hi| hi.min(value)));
            }
            BigIntCheck::MultipleOf(step) => steps.push(step),
        }
    }

    let step = match steps.first() {
        Some(0) => return Err(invalid(path, "multiple-of step must be non-zero".to_string())),
        Some(step) => step
            .checked_abs()
            .ok_or_else(|| invalid(path, format!("multiple-of step {step} is out of range")))?,
        None => 1,
    };
    let lo_bound =
        lo.unwrap_or_else(|| hi.map_or(0, |hi| hi.min(0)).saturating_sub(DEFAULT_BIGINT_SPAN));
    let hi_bound =
        hi.unwrap_or_else(|| lo.map_or(0, |lo| lo.max(0)).saturating_add(DEFAULT_BIGINT_SPAN));
    let k_lo = div_ceil(lo_bound, step);
    let k_hi = div_floor(hi_bound, step);
    if k_lo > k_hi {
        return Err(invalid(
            path,
            format!("no multiple of {step} lies between {lo_bound} and {hi_bound}"),
        ));
    }

    let multiples = Union::new_weighted(vec![
        (EDGE_WEIGHT, Just(k_lo).sboxed()),
        (EDGE_WEIGHT, Just(k_hi).sboxed()),
        (RANGE_WEIGHT, (k_lo..=k_hi).sboxed()),
    ]);
    let strategy = multiples
        .prop_map(move |k| Value::BigInt(k * step))
        .sboxed();
    Ok(Candidate::new(strategy, steps.len() <= 1))
}

/// Floor division for a positive divisor.
fn div_floor(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor < 0 {
        quotient - 1
    } else {
        quotient
    }
}

/// Ceiling division for a positive divisor.
fn div_ceil(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor > 0 {
        quotient + 1
    } else {
        quotient
    }
}

pub(super) fn date_candidate(def: &DateDef, path: &Path) -> Result<Candidate, ArbitraryError> {
    let mut lo = MIN_FOUR_DIGIT_YEAR_MS;
    let mut hi = MAX_FOUR_DIGIT_YEAR_MS;
    for check in &def.checks {
        match check {
            DateCheck::Min(min) => lo = lo.max(ceil_millis(min)),
            DateCheck::Max(max) => hi = hi.min(max.timestamp_millis()),
        }
    }
    if lo > hi {
        return Err(invalid(path, format!("no date lies between {lo}ms and {hi}ms")));
    }
    let millis = Union::new_weighted(vec![
        (EDGE_WEIGHT, Just(lo).sboxed()),
        (EDGE_WEIGHT, Just(hi).sboxed()),
        (RANGE_WEIGHT, (lo..=hi).sboxed()),
    ]);
    let strategy = millis
        .prop_filter_map("timestamp outside the representable range", |millis| {
            DateTime::<Utc>::from_timestamp_millis(millis).map(Value::Date)
        })
        .sboxed();
    Ok(Candidate::exact(strategy))
}

/// Milliseconds since the epoch, rounding sub-millisecond instants up.
fn ceil_millis(instant: &DateTime<Utc>) -> i64 {
    let millis = instant.timestamp_millis();
    if instant.timestamp_subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis.saturating_add(1)
    }
}

/// Arbitrary values nested at most `depth` containers deep.
pub(super) fn any_value(depth: u32) -> ValueStrategy {
    let leaf = prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_map(Value::Number),
        any::<i64>().prop_map(|n| Value::BigInt(i128::from(n))),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::String),
    ]
    .sboxed();

    let mut current = leaf.clone();
    for _ in 0..depth {
        let inner = current.clone();
        current = prop_oneof![
            3 => leaf.clone(),
            1 => proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            1 => proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|entries: BTreeMap<String, Value>| Value::Object(entries)),
        ]
        .sboxed();
    }
    current
}
