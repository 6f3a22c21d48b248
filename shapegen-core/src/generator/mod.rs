//! Proptest strategy generation driven by schemas.
//!
//! A [`Compiler`] walks a schema once and assembles a boxed strategy that yields
//! values the schema accepts (`input_of`) or values the schema produces after
//! validation and transformation (`output_of`). Nodes whose constraints cannot
//! be expressed constructively fall back to rejection sampling guarded by an
//! acceptance-rate breaker.

use std::fmt;
use std::sync::Arc;

use proptest::prelude::*;
use proptest::strategy::Union;

use crate::error::ArbitraryError;
use crate::schema::{Schema, SchemaDef, SchemaKind, StringCheck};
use crate::value::{FunctionValue, Symbol, Value};
use crate::GenerationConfig;

mod formats;
mod monitor;
mod overrides;
mod path;
mod scalars;

use monitor::monitored;
pub use overrides::OverrideFactory;
use overrides::{Override, OverrideRegistry};
pub use path::Path;

#[cfg(test)]
#[path = "../../tests/internal/generator_unit_tests.rs"]
mod tests;

/// Boxed, thread-safe strategy over schema values.
pub type ValueStrategy = SBoxedStrategy<Value>;

/// Compiles schemas into strategies, consulting registered overrides first.
///
/// Compilers are immutable: registering an override returns a new compiler and
/// leaves the receiver unchanged.
#[derive(Clone, Default)]
pub struct Compiler {
    config: GenerationConfig,
    overrides: OverrideRegistry,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GenerationConfig) -> Self {
        Self {
            config,
            overrides: OverrideRegistry::default(),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Returns a compiler that uses `strategy` wherever `schema` is reached.
    ///
    /// Matching is by schema identity; a later registration for the same schema
    /// replaces the earlier one.
    pub fn with_override<S>(&self, schema: &Schema, strategy: S) -> Compiler
    where
        S: Strategy<Value = Value> + Send + Sync + 'static,
    {
        self.register(schema, Override::Strategy(strategy.sboxed()))
    }

    /// Like [`Compiler::with_override`], but builds the strategy on demand from
    /// the compiler resolving the schema.
    pub fn with_override_fn<F>(&self, schema: &Schema, factory: F) -> Compiler
    where
        F: Fn(&Compiler) -> Result<ValueStrategy, ArbitraryError> + Send + Sync + 'static,
    {
        self.register(schema, Override::Factory(Arc::new(factory)))
    }

    fn register(&self, schema: &Schema, replacement: Override) -> Compiler {
        Compiler {
            config: self.config.clone(),
            overrides: self.overrides.with(schema.id(), replacement),
        }
    }

    /// Strategy over values `schema` accepts as input.
    pub fn input_of(&self, schema: &Schema) -> Result<ValueStrategy, ArbitraryError> {
        self.input_at(schema, &Path::root())
    }

    /// Strategy over values `schema` yields after successful validation.
    pub fn output_of(&self, schema: &Schema) -> Result<ValueStrategy, ArbitraryError> {
        self.output_at(schema, &Path::root())
    }

    fn output_at(&self, schema: &Schema, path: &Path) -> Result<ValueStrategy, ArbitraryError> {
        let input = self.input_at(schema, path)?;
        if is_output_identical(schema) {
            return Ok(input);
        }
        let validator = schema.clone();
        Ok(monitored(input, path.clone(), &self.config, move |value| {
            validator.safe_parse(&value).ok()
        }))
    }

    fn input_at(&self, schema: &Schema, path: &Path) -> Result<ValueStrategy, ArbitraryError> {
        if let Some(replacement) = self.overrides.resolve(schema.id()) {
            log::trace!("override replaces {} schema at '{path}'", schema.kind());
            return replacement.build(self);
        }
        log::trace!("dispatching {} schema at '{path}'", schema.kind());

        match schema.def() {
            SchemaDef::String(def) => {
                let candidate = scalars::string_candidate(def, path, &self.config)?;
                Ok(self.settle(schema, path, candidate))
            }
            SchemaDef::Number(def) => {
                let candidate = scalars::number_candidate(def, path)?;
                Ok(self.settle(schema, path, candidate))
            }
            SchemaDef::BigInt(def) => {
                let candidate = scalars::bigint_candidate(def, path)?;
                Ok(self.settle(schema, path, candidate))
            }
            SchemaDef::Date(def) => {
                let candidate = scalars::date_candidate(def, path)?;
                Ok(self.settle(schema, path, candidate))
            }
            SchemaDef::Boolean => Ok(any::<bool>().prop_map(Value::Bool).sboxed()),
            SchemaDef::Undefined | SchemaDef::Void => Ok(Just(Value::Undefined).sboxed()),
            SchemaDef::Null => Ok(Just(Value::Null).sboxed()),
            SchemaDef::NaN => Ok(Just(Value::Number(f64::NAN)).sboxed()),
            SchemaDef::Any | SchemaDef::Unknown => Ok(scalars::any_value(self.config.any_depth)),
            SchemaDef::Symbol => Ok(Just(())
                .prop_map(|()| Value::Symbol(Symbol::new(None)))
                .sboxed()),
            SchemaDef::Literal(value) => Ok(Just(value.clone()).sboxed()),
            SchemaDef::Enum(members) => {
                let values = members.iter().cloned().map(Value::String).collect();
                select_among(values, path, "enum")
            }
            SchemaDef::NativeEnum(members) => {
                let values = members.iter().map(|(_, value)| value.clone()).collect();
                select_among(values, path, "native enum")
            }
            SchemaDef::Array(def) => {
                let item = self.input_at(&def.item, &path.element())?;
                let (min, max) = self.size_bounds(def.min_len, def.max_len, path)?;
                Ok(proptest::collection::vec(item, min..=max)
                    .prop_map(Value::Array)
                    .sboxed())
            }
            SchemaDef::Set(def) => {
                let item = self.input_at(&def.item, &path.element())?;
                let (min, max) = self.size_bounds(def.min_size, def.max_size, path)?;
                let sets =
                    proptest::collection::vec(item, min..=max).prop_map(Value::set_from_items);
                if min == 0 {
                    return Ok(sets.sboxed());
                }
                Ok(monitored(sets, path.clone(), &self.config, move |set| {
                    matches!(&set, Value::Set(items) if items.len() >= min).then_some(set)
                }))
            }
            SchemaDef::Object(def) => {
                let mut names = Vec::with_capacity(def.shape.len());
                let mut fields = Vec::with_capacity(def.shape.len());
                for (name, field) in &def.shape {
                    fields.push(self.input_at(field, &path.property(name))?);
                    names.push(name.clone());
                }
                Ok(fields
                    .prop_map(move |values| {
                        Value::Object(names.iter().cloned().zip(values).collect())
                    })
                    .sboxed())
            }
            SchemaDef::Tuple(def) => {
                let mut slots = Vec::with_capacity(def.items.len());
                for (index, item) in def.items.iter().enumerate() {
                    slots.push(self.input_at(item, &path.index(index))?);
                }
                match &def.rest {
                    None => Ok(slots.prop_map(Value::Array).sboxed()),
                    Some(rest) => {
                        let rest = self.input_at(rest, &path.element())?;
                        let extra = proptest::collection::vec(rest, 0..=self.config.max_extra_len);
                        Ok((slots, extra)
                            .prop_map(|(mut items, extra)| {
                                items.extend(extra);
                                Value::Array(items)
                            })
                            .sboxed())
                    }
                }
            }
            SchemaDef::Record(def) => {
                let key = self.input_at(&def.key, &path.key())?;
                let value = self.input_at(&def.value, &path.value())?;
                Ok(
                    proptest::collection::vec((key, value), 0..=self.config.max_extra_len)
                        .prop_map(|pairs| {
                            Value::Object(
                                pairs
                                    .into_iter()
                                    .filter_map(|(key, value)| match key {
                                        Value::String(key) => Some((key, value)),
                                        _ => None,
                                    })
                                    .collect(),
                            )
                        })
                        .sboxed(),
                )
            }
            SchemaDef::Map(def) => {
                let key = self.input_at(&def.key, &path.key())?;
                let value = self.input_at(&def.value, &path.value())?;
                Ok(
                    proptest::collection::vec((key, value), 0..=self.config.max_extra_len)
                        .prop_map(Value::map_from_pairs)
                        .sboxed(),
                )
            }
            SchemaDef::Union(options) => {
                if options.is_empty() {
                    return Err(ArbitraryError::InvalidSchema {
                        path: path.clone(),
                        reason: "union must include at least one option".to_string(),
                    });
                }
                let strategies = options
                    .iter()
                    .map(|option| self.input_at(option, path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Union::new(strategies).sboxed())
            }
            SchemaDef::DiscriminatedUnion(def) => {
                let by_tag = def
                    .options_by_tag()
                    .map_err(|reason| ArbitraryError::InvalidSchema {
                        path: path.clone(),
                        reason,
                    })?;
                if by_tag.is_empty() {
                    return Err(ArbitraryError::InvalidSchema {
                        path: path.clone(),
                        reason: "discriminated union must include at least one option".to_string(),
                    });
                }
                let strategies = by_tag
                    .values()
                    .map(|option| self.input_at(option, path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Union::new(strategies).sboxed())
            }
            SchemaDef::Intersection(_)
            | SchemaDef::Lazy(_)
            | SchemaDef::Never
            | SchemaDef::Custom(_) => Err(ArbitraryError::UnsupportedSchema {
                path: path.clone(),
                type_name: schema.type_name(),
            }),
            SchemaDef::Function(def) => {
                let returns = self.input_at(&def.returns, &path.return_type())?;
                Ok(returns
                    .prop_map(|value| Value::Function(FunctionValue::returning(value)))
                    .sboxed())
            }
            SchemaDef::Promise(inner) => {
                let resolved = self.input_at(inner, &path.resolved_type())?;
                Ok(resolved.prop_map(Value::promise).sboxed())
            }
            SchemaDef::Optional(inner) => {
                let present = self.input_at(inner, path)?;
                Ok(self.with_absent(present, Value::Undefined))
            }
            SchemaDef::Nullable(inner) => {
                let present = self.input_at(inner, path)?;
                Ok(self.with_absent(present, Value::Null))
            }
            SchemaDef::Default(def) => {
                let present = self.input_at(&def.inner, path)?;
                Ok(self.with_absent(present, Value::Undefined))
            }
            SchemaDef::Catch(def) => {
                let inner = self.input_at(&def.inner, path)?;
                Ok(Union::new(vec![inner, scalars::any_value(self.config.any_depth)]).sboxed())
            }
            SchemaDef::Effects(def) => {
                let inner = self.input_at(&def.inner, path)?;
                Ok(self.refined(schema, path, inner))
            }
            SchemaDef::Pipeline(def) => {
                let inner = self.input_at(&def.input, path)?;
                Ok(self.refined(schema, path, inner))
            }
            SchemaDef::Branded(def) => self.input_at(&def.inner, path),
            SchemaDef::Readonly(inner) => self.input_at(inner, path),
        }
    }

    /// Keeps exact candidates as they are and monitors the rest against `schema`.
    fn settle(&self, schema: &Schema, path: &Path, candidate: scalars::Candidate) -> ValueStrategy {
        if candidate.exact {
            candidate.strategy
        } else {
            self.refined(schema, path, candidate.strategy)
        }
    }

    /// Filters `candidates` down to values `schema` accepts, yielding the raw input.
    fn refined(&self, schema: &Schema, path: &Path, candidates: ValueStrategy) -> ValueStrategy {
        let validator = schema.clone();
        monitored(candidates, path.clone(), &self.config, move |value| {
            validator.safe_parse(&value).is_ok().then_some(value)
        })
    }

    fn with_absent(&self, present: ValueStrategy, absent: Value) -> ValueStrategy {
        if self.config.absent_weight == 0 {
            return present;
        }
        Union::new_weighted(vec![
            (self.config.present_weight, present),
            (self.config.absent_weight, Just(absent).sboxed()),
        ])
        .sboxed()
    }

    fn size_bounds(
        &self,
        min: Option<usize>,
        max: Option<usize>,
        path: &Path,
    ) -> Result<(usize, usize), ArbitraryError> {
        let min = min.unwrap_or(0);
        let max = max.unwrap_or(min + self.config.max_extra_len);
        if max < min {
            return Err(ArbitraryError::InvalidSchema {
                path: path.clone(),
                reason: format!("maximum size {max} is below minimum size {min}"),
            });
        }
        Ok((min, max))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

fn select_among(
    values: Vec<Value>,
    path: &Path,
    kind: &str,
) -> Result<ValueStrategy, ArbitraryError> {
    if values.is_empty() {
        return Err(ArbitraryError::InvalidSchema {
            path: path.clone(),
            reason: format!("{kind} must include at least one value"),
        });
    }
    Ok(proptest::sample::select(values).sboxed())
}

/// Kinds whose validated output always equals the accepted input.
fn is_output_identical(schema: &Schema) -> bool {
    match schema.def() {
        SchemaDef::String(def) => !def.checks.iter().any(StringCheck::is_transform),
        _ => matches!(
            schema.kind(),
            SchemaKind::Number
                | SchemaKind::BigInt
                | SchemaKind::Boolean
                | SchemaKind::Date
                | SchemaKind::Undefined
                | SchemaKind::Null
                | SchemaKind::Void
                | SchemaKind::Literal
                | SchemaKind::Enum
                | SchemaKind::NativeEnum
                | SchemaKind::Any
                | SchemaKind::Unknown
                | SchemaKind::NaN
                | SchemaKind::Symbol
        ),
    }
}
