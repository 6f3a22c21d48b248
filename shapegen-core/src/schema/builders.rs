use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::checks::{
    BigIntCheck, DateCheck, Effect, IpVersion, NumberCheck, StringCheck, StringFormat,
};
use super::{
    ArrayDef, BigIntDef, CustomDef, DateDef, DiscriminatedUnionDef, EffectsDef, FunctionDef,
    IntersectionDef, KeyValueDef, LazyDef, NumberDef, ObjectDef, Schema, SchemaDef, SetDef,
    StringDef, TupleDef, UnknownKeys,
};
use crate::value::Value;

/// Largest integer exactly representable as an `f64`.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Builder for string schemas.
#[derive(Clone, Debug, Default)]
pub struct StringSchema {
    checks: Vec<StringCheck>,
}

pub fn string() -> StringSchema {
    StringSchema::default()
}

impl StringSchema {
    pub fn check(mut self, check: StringCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn min(self, len: usize) -> Self {
        self.check(StringCheck::MinLength(len))
    }

    pub fn max(self, len: usize) -> Self {
        self.check(StringCheck::MaxLength(len))
    }

    pub fn length(self, len: usize) -> Self {
        self.check(StringCheck::Length(len))
    }

    pub fn nonempty(self) -> Self {
        self.min(1)
    }

    pub fn email(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Email))
    }

    pub fn url(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Url))
    }

    pub fn uuid(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Uuid))
    }

    pub fn cuid(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Cuid))
    }

    pub fn cuid2(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Cuid2))
    }

    pub fn ulid(self) -> Self {
        self.check(StringCheck::Format(StringFormat::Ulid))
    }

    /// UTC timestamps with a `Z` suffix and any fractional precision.
    pub fn datetime(self) -> Self {
        self.datetime_with(false, None)
    }

    pub fn datetime_with(self, offset: bool, precision: Option<u8>) -> Self {
        self.check(StringCheck::Format(StringFormat::Datetime { offset, precision }))
    }

    pub fn ip(self, version: IpVersion) -> Self {
        self.check(StringCheck::Format(StringFormat::Ip(version)))
    }

    pub fn regex(self, regex: Regex) -> Self {
        self.check(StringCheck::Regex(regex))
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        self.check(StringCheck::StartsWith(prefix.into()))
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        self.check(StringCheck::EndsWith(suffix.into()))
    }

    pub fn includes(self, needle: impl Into<String>) -> Self {
        self.check(StringCheck::Includes(needle.into()))
    }

    pub fn trim(self) -> Self {
        self.check(StringCheck::Trim)
    }

    pub fn to_lower_case(self) -> Self {
        self.check(StringCheck::ToLowerCase)
    }

    pub fn to_upper_case(self) -> Self {
        self.check(StringCheck::ToUpperCase)
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::String(StringDef {
            checks: self.checks,
        }))
    }
}

/// Builder for number schemas.
#[derive(Clone, Debug, Default)]
pub struct NumberSchema {
    checks: Vec<NumberCheck>,
}

pub fn number() -> NumberSchema {
    NumberSchema::default()
}

impl NumberSchema {
    pub fn check(mut self, check: NumberCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn gt(self, value: f64) -> Self {
        self.check(NumberCheck::Min {
            value,
            inclusive: false,
        })
    }

    pub fn gte(self, value: f64) -> Self {
        self.check(NumberCheck::Min {
            value,
            inclusive: true,
        })
    }

    pub fn min(self, value: f64) -> Self {
        self.gte(value)
    }

    pub fn lt(self, value: f64) -> Self {
        self.check(NumberCheck::Max {
            value,
            inclusive: false,
        })
    }

    pub fn lte(self, value: f64) -> Self {
        self.check(NumberCheck::Max {
            value,
            inclusive: true,
        })
    }

    pub fn max(self, value: f64) -> Self {
        self.lte(value)
    }

    pub fn int(self) -> Self {
        self.check(NumberCheck::Int)
    }

    pub fn positive(self) -> Self {
        self.gt(0.0)
    }

    pub fn nonnegative(self) -> Self {
        self.gte(0.0)
    }

    pub fn negative(self) -> Self {
        self.lt(0.0)
    }

    pub fn nonpositive(self) -> Self {
        self.lte(0.0)
    }

    pub fn multiple_of(self, step: f64) -> Self {
        self.check(NumberCheck::MultipleOf(step))
    }

    pub fn finite(self) -> Self {
        self.check(NumberCheck::Finite)
    }

    /// Integers within the exactly representable range.
    pub fn safe(self) -> Self {
        self.int().gte(-MAX_SAFE_INTEGER).lte(MAX_SAFE_INTEGER)
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::Number(NumberDef {
            checks: self.checks,
        }))
    }
}

/// Builder for bigint schemas.
#[derive(Clone, Debug, Default)]
pub struct BigIntSchema {
    checks: Vec<BigIntCheck>,
}

pub fn bigint() -> BigIntSchema {
    BigIntSchema::default()
}

impl BigIntSchema {
    pub fn check(mut self, check: BigIntCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn gt(self, value: i128) -> Self {
        self.check(BigIntCheck::Min {
            value,
            inclusive: false,
        })
    }

    pub fn min(self, value: i128) -> Self {
        self.check(BigIntCheck::Min {
            value,
            inclusive: true,
        })
    }

    pub fn lt(self, value: i128) -> Self {
        self.check(BigIntCheck::Max {
            value,
            inclusive: false,
        })
    }

    pub fn max(self, value: i128) -> Self {
        self.check(BigIntCheck::Max {
            value,
            inclusive: true,
        })
    }

    pub fn multiple_of(self, step: i128) -> Self {
        self.check(BigIntCheck::MultipleOf(step))
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::BigInt(BigIntDef {
            checks: self.checks,
        }))
    }
}

/// Builder for date schemas.
#[derive(Clone, Debug, Default)]
pub struct DateSchema {
    checks: Vec<DateCheck>,
}

pub fn date() -> DateSchema {
    DateSchema::default()
}

impl DateSchema {
    pub fn min(mut self, value: DateTime<Utc>) -> Self {
        self.checks.push(DateCheck::Min(value));
        self
    }

    pub fn max(mut self, value: DateTime<Utc>) -> Self {
        self.checks.push(DateCheck::Max(value));
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::Date(DateDef {
            checks: self.checks,
        }))
    }
}

/// Builder for array schemas.
#[derive(Clone, Debug)]
pub struct ArraySchema {
    def: ArrayDef,
}

pub fn array(item: impl Into<Schema>) -> ArraySchema {
    ArraySchema {
        def: ArrayDef {
            item: item.into(),
            min_len: None,
            max_len: None,
        },
    }
}

impl ArraySchema {
    pub fn min(mut self, len: usize) -> Self {
        self.def.min_len = Some(len);
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.def.max_len = Some(len);
        self
    }

    pub fn length(self, len: usize) -> Self {
        self.min(len).max(len)
    }

    pub fn nonempty(self) -> Self {
        self.min(1)
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::Array(self.def))
    }
}

/// Builder for set schemas.
#[derive(Clone, Debug)]
pub struct SetSchema {
    def: SetDef,
}

pub fn set(item: impl Into<Schema>) -> SetSchema {
    SetSchema {
        def: SetDef {
            item: item.into(),
            min_size: None,
            max_size: None,
        },
    }
}

impl SetSchema {
    pub fn min(mut self, size: usize) -> Self {
        self.def.min_size = Some(size);
        self
    }

    pub fn max(mut self, size: usize) -> Self {
        self.def.max_size = Some(size);
        self
    }

    pub fn size(self, size: usize) -> Self {
        self.min(size).max(size)
    }

    pub fn nonempty(self) -> Self {
        self.min(1)
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::Set(self.def))
    }
}

/// Builder for object schemas.
#[derive(Clone, Debug, Default)]
pub struct ObjectSchema {
    def: ObjectDef,
}

pub fn object() -> ObjectSchema {
    ObjectSchema::default()
}

impl ObjectSchema {
    /// Declares a property; redeclaring a name replaces its schema in place.
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let name = name.into();
        let schema = schema.into();
        match self.def.shape.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = schema,
            None => self.def.shape.push((name, schema)),
        }
        self
    }

    /// Rejects keys that are not declared.
    pub fn strict(mut self) -> Self {
        self.def.unknown_keys = UnknownKeys::Strict;
        self
    }

    /// Keeps undeclared keys in the parsed output.
    pub fn passthrough(mut self) -> Self {
        self.def.unknown_keys = UnknownKeys::Passthrough;
        self
    }

    /// Drops undeclared keys from the parsed output.
    pub fn strip(mut self) -> Self {
        self.def.unknown_keys = UnknownKeys::Strip;
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(SchemaDef::Object(self.def))
    }
}

macro_rules! into_schema {
    ($($builder:ty),* $(,)?) => {
        $(
            impl From<$builder> for Schema {
                fn from(builder: $builder) -> Self {
                    builder.build()
                }
            }
        )*
    };
}

into_schema!(
    StringSchema,
    NumberSchema,
    BigIntSchema,
    DateSchema,
    ArraySchema,
    SetSchema,
    ObjectSchema,
);

pub fn boolean() -> Schema {
    Schema::new(SchemaDef::Boolean)
}

pub fn undefined() -> Schema {
    Schema::new(SchemaDef::Undefined)
}

pub fn null() -> Schema {
    Schema::new(SchemaDef::Null)
}

pub fn void() -> Schema {
    Schema::new(SchemaDef::Void)
}

pub fn any() -> Schema {
    Schema::new(SchemaDef::Any)
}

pub fn unknown() -> Schema {
    Schema::new(SchemaDef::Unknown)
}

pub fn never() -> Schema {
    Schema::new(SchemaDef::Never)
}

pub fn nan() -> Schema {
    Schema::new(SchemaDef::NaN)
}

pub fn symbol() -> Schema {
    Schema::new(SchemaDef::Symbol)
}

pub fn literal(value: impl Into<Value>) -> Schema {
    Schema::new(SchemaDef::Literal(value.into()))
}

/// A schema accepting exactly one of the listed strings.
pub fn enum_of<I, S>(values: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::new(SchemaDef::Enum(values.into_iter().map(Into::into).collect()))
}

/// A schema accepting the values of a named enumeration.
pub fn native_enum<I, K, V>(members: I) -> Schema
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Schema::new(SchemaDef::NativeEnum(
        members
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect(),
    ))
}

pub fn tuple<I, S>(items: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    Schema::new(SchemaDef::Tuple(TupleDef {
        items: items.into_iter().map(Into::into).collect(),
        rest: None,
    }))
}

/// A tuple whose fixed slots are followed by any number of `rest` elements.
pub fn tuple_with_rest<I, S>(items: I, rest: impl Into<Schema>) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    Schema::new(SchemaDef::Tuple(TupleDef {
        items: items.into_iter().map(Into::into).collect(),
        rest: Some(rest.into()),
    }))
}

pub fn record(key: impl Into<Schema>, value: impl Into<Schema>) -> Schema {
    Schema::new(SchemaDef::Record(KeyValueDef {
        key: key.into(),
        value: value.into(),
    }))
}

pub fn map(key: impl Into<Schema>, value: impl Into<Schema>) -> Schema {
    Schema::new(SchemaDef::Map(KeyValueDef {
        key: key.into(),
        value: value.into(),
    }))
}

pub fn union<I, S>(options: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    Schema::new(SchemaDef::Union(options.into_iter().map(Into::into).collect()))
}

pub fn discriminated_union<I, S>(discriminator: impl Into<String>, options: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    Schema::new(SchemaDef::DiscriminatedUnion(DiscriminatedUnionDef {
        discriminator: discriminator.into(),
        options: options.into_iter().map(Into::into).collect(),
    }))
}

pub fn intersection(left: impl Into<Schema>, right: impl Into<Schema>) -> Schema {
    Schema::new(SchemaDef::Intersection(IntersectionDef {
        left: left.into(),
        right: right.into(),
    }))
}

pub fn function<I, S>(args: I, returns: impl Into<Schema>) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    Schema::new(SchemaDef::Function(FunctionDef {
        args: args.into_iter().map(Into::into).collect(),
        returns: returns.into(),
    }))
}

pub fn promise(inner: impl Into<Schema>) -> Schema {
    Schema::new(SchemaDef::Promise(inner.into()))
}

pub fn lazy<F>(getter: F) -> Schema
where
    F: Fn() -> Schema + Send + Sync + 'static,
{
    Schema::new(SchemaDef::Lazy(LazyDef {
        getter: Arc::new(getter),
    }))
}

/// Runs `prepare` over the raw input before `inner` validates it.
pub fn preprocess<F>(prepare: F, inner: impl Into<Schema>) -> Schema
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Schema::new(SchemaDef::Effects(EffectsDef {
        inner: inner.into(),
        effect: Effect::Preprocess(Arc::new(prepare)),
    }))
}

/// A schema kind outside the built-in set, validated by `check`.
pub fn custom<F>(type_name: impl Into<String>, check: F) -> Schema
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Schema::new(SchemaDef::Custom(CustomDef {
        type_name: type_name.into(),
        check: Arc::new(check),
    }))
}
