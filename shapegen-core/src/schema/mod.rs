//! Declarative data-shape schemas with identity-stable nodes and a validator.
//!
//! A [`Schema`] is a cheap handle around an immutable definition node. Every
//! constructed node receives a process-unique [`SchemaId`]; clones of a handle
//! share that id, while two separately built but structurally identical schemas
//! never do. Generator overrides are keyed on this id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::value::Value;

mod builders;
mod checks;
mod formats;
mod parse;

pub use builders::*;
pub use checks::{
    BigIntCheck, DateCheck, Effect, IpVersion, NumberCheck, PreprocessFn, RefineFn, StringCheck,
    StringFormat, TransformFn,
};
pub use parse::{Issue, ParseError, PathSegment};

pub(crate) use formats::{ULID_PATTERN, UUID_PATTERN};

#[cfg(test)]
#[path = "../../tests/internal/schema_unit_tests.rs"]
mod tests;

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Identity token minted for every constructed schema node.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        Self(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct SchemaNode {
    id: SchemaId,
    def: SchemaDef,
}

/// Handle to an immutable schema node.
#[derive(Clone)]
pub struct Schema(Arc<SchemaNode>);

impl Schema {
    pub fn new(def: SchemaDef) -> Self {
        Self(Arc::new(SchemaNode {
            id: SchemaId::next(),
            def,
        }))
    }

    pub fn id(&self) -> SchemaId {
        self.0.id
    }

    pub fn def(&self) -> &SchemaDef {
        &self.0.def
    }

    pub fn kind(&self) -> SchemaKind {
        self.0.def.kind()
    }

    /// Concrete type name, including the declared name of custom schemas.
    pub fn type_name(&self) -> String {
        match self.def() {
            SchemaDef::Custom(custom) => custom.type_name.clone(),
            def => def.kind().type_name().to_string(),
        }
    }

    /// Validates `value`, returning the parsed (and possibly transformed) output.
    pub fn safe_parse(&self, value: &Value) -> Result<Value, ParseError> {
        parse::parse_root(self, value)
    }

    pub fn optional(&self) -> Schema {
        Schema::new(SchemaDef::Optional(self.clone()))
    }

    pub fn nullable(&self) -> Schema {
        Schema::new(SchemaDef::Nullable(self.clone()))
    }

    pub fn nullish(&self) -> Schema {
        self.nullable().optional()
    }

    /// Substitutes `value` when the input is `undefined`.
    pub fn default_value(&self, value: impl Into<Value>) -> Schema {
        Schema::new(SchemaDef::Default(DefaultDef {
            inner: self.clone(),
            value: value.into(),
        }))
    }

    /// Substitutes `value` when the inner schema rejects the input.
    pub fn catch_value(&self, value: impl Into<Value>) -> Schema {
        Schema::new(SchemaDef::Catch(CatchDef {
            inner: self.clone(),
            value: value.into(),
        }))
    }

    pub fn array(&self) -> ArraySchema {
        array(self)
    }

    pub fn refine<F>(&self, check: F, message: impl Into<String>) -> Schema
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with_effect(Effect::Refinement {
            check: Arc::new(check),
            message: message.into(),
        })
    }

    pub fn transform<F>(&self, transform: F) -> Schema
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.with_effect(Effect::Transform(Arc::new(move |value| Ok(transform(value)))))
    }

    /// Like [`Schema::transform`], but the mapping may reject the value.
    pub fn try_transform<F>(&self, transform: F) -> Schema
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.with_effect(Effect::Transform(Arc::new(transform)))
    }

    /// Feeds this schema's output into `next`.
    pub fn pipe(&self, next: impl Into<Schema>) -> Schema {
        Schema::new(SchemaDef::Pipeline(PipelineDef {
            input: self.clone(),
            output: next.into(),
        }))
    }

    pub fn brand(&self, brand: impl Into<String>) -> Schema {
        Schema::new(SchemaDef::Branded(BrandedDef {
            inner: self.clone(),
            brand: brand.into(),
        }))
    }

    pub fn readonly(&self) -> Schema {
        Schema::new(SchemaDef::Readonly(self.clone()))
    }

    fn with_effect(&self, effect: Effect) -> Schema {
        Schema::new(SchemaDef::Effects(EffectsDef {
            inner: self.clone(),
            effect,
        }))
    }
}

impl From<&Schema> for Schema {
    fn from(schema: &Schema) -> Self {
        schema.clone()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish()
    }
}

/// The closed set of schema type tags.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SchemaKind {
    String,
    Number,
    BigInt,
    Boolean,
    Date,
    Undefined,
    Null,
    Void,
    Any,
    Unknown,
    Never,
    NaN,
    Symbol,
    Literal,
    Enum,
    NativeEnum,
    Array,
    Set,
    Object,
    Tuple,
    Record,
    Map,
    Union,
    DiscriminatedUnion,
    Intersection,
    Function,
    Promise,
    Lazy,
    Optional,
    Nullable,
    Default,
    Catch,
    Effects,
    Pipeline,
    Branded,
    Readonly,
    Custom,
}

impl SchemaKind {
    pub fn type_name(self) -> &'static str {
        match self {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            SchemaKind::BigInt => "bigint",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Date => "date",
            SchemaKind::Undefined => "undefined",
            SchemaKind::Null => "null",
            SchemaKind::Void => "void",
            SchemaKind::Any => "any",
            SchemaKind::Unknown => "unknown",
            SchemaKind::Never => "never",
            SchemaKind::NaN => "nan",
            SchemaKind::Symbol => "symbol",
            SchemaKind::Literal => "literal",
            SchemaKind::Enum => "enum",
            SchemaKind::NativeEnum => "native enum",
            SchemaKind::Array => "array",
            SchemaKind::Set => "set",
            SchemaKind::Object => "object",
            SchemaKind::Tuple => "tuple",
            SchemaKind::Record => "record",
            SchemaKind::Map => "map",
            SchemaKind::Union => "union",
            SchemaKind::DiscriminatedUnion => "discriminated union",
            SchemaKind::Intersection => "intersection",
            SchemaKind::Function => "function",
            SchemaKind::Promise => "promise",
            SchemaKind::Lazy => "lazy",
            SchemaKind::Optional => "optional",
            SchemaKind::Nullable => "nullable",
            SchemaKind::Default => "default",
            SchemaKind::Catch => "catch",
            SchemaKind::Effects => "effects",
            SchemaKind::Pipeline => "pipeline",
            SchemaKind::Branded => "branded",
            SchemaKind::Readonly => "readonly",
            SchemaKind::Custom => "custom",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Tag-specific definition of a schema node.
#[derive(Clone, Debug)]
pub enum SchemaDef {
    String(StringDef),
    Number(NumberDef),
    BigInt(BigIntDef),
    Boolean,
    Date(DateDef),
    Undefined,
    Null,
    Void,
    Any,
    Unknown,
    Never,
    NaN,
    Symbol,
    Literal(Value),
    Enum(Vec<String>),
    /// Named members and their values.
    NativeEnum(Vec<(String, Value)>),
    Array(ArrayDef),
    Set(SetDef),
    Object(ObjectDef),
    Tuple(TupleDef),
    Record(KeyValueDef),
    Map(KeyValueDef),
    Union(Vec<Schema>),
    DiscriminatedUnion(DiscriminatedUnionDef),
    Intersection(IntersectionDef),
    Function(FunctionDef),
    Promise(Schema),
    Lazy(LazyDef),
    Optional(Schema),
    Nullable(Schema),
    Default(DefaultDef),
    Catch(CatchDef),
    Effects(EffectsDef),
    Pipeline(PipelineDef),
    Branded(BrandedDef),
    Readonly(Schema),
    Custom(CustomDef),
}

impl SchemaDef {
    pub fn kind(&self) -> SchemaKind {
        match self {
            SchemaDef::String(_) => SchemaKind::String,
            SchemaDef::Number(_) => SchemaKind::Number,
            SchemaDef::BigInt(_) => SchemaKind::BigInt,
            SchemaDef::Boolean => SchemaKind::Boolean,
            SchemaDef::Date(_) => SchemaKind::Date,
            SchemaDef::Undefined => SchemaKind::Undefined,
            SchemaDef::Null => SchemaKind::Null,
            SchemaDef::Void => SchemaKind::Void,
            SchemaDef::Any => SchemaKind::Any,
            SchemaDef::Unknown => SchemaKind::Unknown,
            SchemaDef::Never => SchemaKind::Never,
            SchemaDef::NaN => SchemaKind::NaN,
            SchemaDef::Symbol => SchemaKind::Symbol,
            SchemaDef::Literal(_) => SchemaKind::Literal,
            SchemaDef::Enum(_) => SchemaKind::Enum,
            SchemaDef::NativeEnum(_) => SchemaKind::NativeEnum,
            SchemaDef::Array(_) => SchemaKind::Array,
            SchemaDef::Set(_) => SchemaKind::Set,
            SchemaDef::Object(_) => SchemaKind::Object,
            SchemaDef::Tuple(_) => SchemaKind::Tuple,
            SchemaDef::Record(_) => SchemaKind::Record,
            SchemaDef::Map(_) => SchemaKind::Map,
            SchemaDef::Union(_) => SchemaKind::Union,
            SchemaDef::DiscriminatedUnion(_) => SchemaKind::DiscriminatedUnion,
            SchemaDef::Intersection(_) => SchemaKind::Intersection,
            SchemaDef::Function(_) => SchemaKind::Function,
            SchemaDef::Promise(_) => SchemaKind::Promise,
            SchemaDef::Lazy(_) => SchemaKind::Lazy,
            SchemaDef::Optional(_) => SchemaKind::Optional,
            SchemaDef::Nullable(_) => SchemaKind::Nullable,
            SchemaDef::Default(_) => SchemaKind::Default,
            SchemaDef::Catch(_) => SchemaKind::Catch,
            SchemaDef::Effects(_) => SchemaKind::Effects,
            SchemaDef::Pipeline(_) => SchemaKind::Pipeline,
            SchemaDef::Branded(_) => SchemaKind::Branded,
            SchemaDef::Readonly(_) => SchemaKind::Readonly,
            SchemaDef::Custom(_) => SchemaKind::Custom,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StringDef {
    pub checks: Vec<StringCheck>,
}

#[derive(Clone, Debug, Default)]
pub struct NumberDef {
    pub checks: Vec<NumberCheck>,
}

#[derive(Clone, Debug, Default)]
pub struct BigIntDef {
    pub checks: Vec<BigIntCheck>,
}

#[derive(Clone, Debug, Default)]
pub struct DateDef {
    pub checks: Vec<DateCheck>,
}

#[derive(Clone, Debug)]
pub struct ArrayDef {
    pub item: Schema,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct SetDef {
    pub item: Schema,
    pub min_size: Option<usize>,
    pub max_size: Option<usize>,
}

/// How an object schema treats keys missing from its shape.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnknownKeys {
    #[default]
    Strip,
    Strict,
    Passthrough,
}

#[derive(Clone, Debug, Default)]
pub struct ObjectDef {
    /// Declared properties in declaration order.
    pub shape: Vec<(String, Schema)>,
    pub unknown_keys: UnknownKeys,
}

#[derive(Clone, Debug)]
pub struct TupleDef {
    pub items: Vec<Schema>,
    pub rest: Option<Schema>,
}

#[derive(Clone, Debug)]
pub struct KeyValueDef {
    pub key: Schema,
    pub value: Schema,
}

#[derive(Clone, Debug)]
pub struct DiscriminatedUnionDef {
    pub discriminator: String,
    pub options: Vec<Schema>,
}

impl DiscriminatedUnionDef {
    /// Maps every discriminator tag to its option, sorted by tag.
    ///
    /// Each option must be an object whose discriminator property is a string
    /// literal or enum; anything else makes the union inconsistent.
    pub fn options_by_tag(&self) -> Result<BTreeMap<String, Schema>, String> {
        let mut tags = BTreeMap::new();
        for option in &self.options {
            let SchemaDef::Object(object) = option.def() else {
                return Err(format!(
                    "discriminated union option must be an object, got {}",
                    option.type_name()
                ));
            };
            let field = object
                .shape
                .iter()
                .find(|(name, _)| *name == self.discriminator)
                .map(|(_, schema)| schema)
                .ok_or_else(|| {
                    format!(
                        "discriminated union option is missing discriminator '{}'",
                        self.discriminator
                    )
                })?;
            let values = match field.def() {
                SchemaDef::Literal(Value::String(tag)) => vec![tag.clone()],
                SchemaDef::Enum(values) => values.clone(),
                _ => {
                    return Err(format!(
                        "discriminator '{}' must be a string literal or enum, got {}",
                        self.discriminator,
                        field.type_name()
                    ))
                }
            };
            for tag in values {
                if tags.insert(tag.clone(), option.clone()).is_some() {
                    return Err(format!("discriminator value '{tag}' is declared twice"));
                }
            }
        }
        Ok(tags)
    }
}

#[derive(Clone, Debug)]
pub struct IntersectionDef {
    pub left: Schema,
    pub right: Schema,
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub args: Vec<Schema>,
    pub returns: Schema,
}

/// Deferred schema, resolved on every use.
#[derive(Clone)]
pub struct LazyDef {
    pub getter: Arc<dyn Fn() -> Schema + Send + Sync>,
}

impl fmt::Debug for LazyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyDef(..)")
    }
}

#[derive(Clone, Debug)]
pub struct DefaultDef {
    pub inner: Schema,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub struct CatchDef {
    pub inner: Schema,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub struct EffectsDef {
    pub inner: Schema,
    pub effect: Effect,
}

#[derive(Clone, Debug)]
pub struct PipelineDef {
    pub input: Schema,
    pub output: Schema,
}

#[derive(Clone, Debug)]
pub struct BrandedDef {
    pub inner: Schema,
    pub brand: String,
}

/// A schema kind defined outside the built-in set.
#[derive(Clone)]
pub struct CustomDef {
    pub type_name: String,
    pub check: RefineFn,
}

impl fmt::Debug for CustomDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDef")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
