use std::collections::BTreeMap;
use std::fmt;

use nonempty::NonEmpty;

use super::checks::Effect;
use super::{Schema, SchemaDef, UnknownKeys};
use crate::value::{FunctionValue, Value};

/// One step into a value's structure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{key}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// A single validation failure and where it happened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issue {
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, ".: {}", self.message);
        }
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Validation failure carrying at least one issue.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    issues: NonEmpty<Issue>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            issues: NonEmpty::new(Issue {
                path: Vec::new(),
                message: message.into(),
            }),
        }
    }

    pub fn issues(&self) -> &NonEmpty<Issue> {
        &self.issues
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.issues.head)?;
        for issue in self.issues.tail.iter() {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

type Parsed = Result<Value, Vec<Issue>>;

pub(super) fn parse_root(schema: &Schema, value: &Value) -> Result<Value, ParseError> {
    parse(schema, value, &[]).map_err(|issues| ParseError {
        issues: NonEmpty::from_vec(issues).unwrap_or_else(|| {
            NonEmpty::new(Issue {
                path: Vec::new(),
                message: "invalid input".to_string(),
            })
        }),
    })
}

fn issue(path: &[PathSegment], message: impl Into<String>) -> Vec<Issue> {
    vec![Issue {
        path: path.to_vec(),
        message: message.into(),
    }]
}

fn type_issue(path: &[PathSegment], expected: &str, received: &Value) -> Vec<Issue> {
    issue(
        path,
        format!("expected {expected}, received {}", received.type_name()),
    )
}

fn child(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut next = path.to_vec();
    next.push(segment);
    next
}

fn finish(value: Value, issues: Vec<Issue>) -> Parsed {
    if issues.is_empty() {
        Ok(value)
    } else {
        Err(issues)
    }
}

fn parse(schema: &Schema, value: &Value, path: &[PathSegment]) -> Parsed {
    match schema.def() {
        SchemaDef::String(def) => {
            let Value::String(raw) = value else {
                return Err(type_issue(path, "string", value));
            };
            let mut current = raw.clone();
            let mut issues = Vec::new();
            for check in &def.checks {
                if check.is_transform() {
                    current = check.apply(current);
                } else if let Some(message) = check.violation(&current) {
                    issues.extend(issue(path, message));
                }
            }
            finish(Value::String(current), issues)
        }
        SchemaDef::Number(def) => match value {
            Value::Number(number) if !number.is_nan() => {
                let issues = def
                    .checks
                    .iter()
                    .filter_map(|check| check.violation(*number))
                    .flat_map(|message| issue(path, message))
                    .collect();
                finish(value.clone(), issues)
            }
            _ => Err(type_issue(path, "number", value)),
        },
        SchemaDef::BigInt(def) => match value {
            Value::BigInt(number) => {
                let issues = def
                    .checks
                    .iter()
                    .filter_map(|check| check.violation(*number))
                    .flat_map(|message| issue(path, message))
                    .collect();
                finish(value.clone(), issues)
            }
            _ => Err(type_issue(path, "bigint", value)),
        },
        SchemaDef::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(type_issue(path, "boolean", value)),
        },
        SchemaDef::Date(def) => match value {
            Value::Date(date) => {
                let issues = def
                    .checks
                    .iter()
                    .filter_map(|check| check.violation(date))
                    .flat_map(|message| issue(path, message))
                    .collect();
                finish(value.clone(), issues)
            }
            _ => Err(type_issue(path, "date", value)),
        },
        SchemaDef::Undefined | SchemaDef::Void => match value {
            Value::Undefined => Ok(Value::Undefined),
            _ => Err(type_issue(path, "undefined", value)),
        },
        SchemaDef::Null => match value {
            Value::Null => Ok(Value::Null),
            _ => Err(type_issue(path, "null", value)),
        },
        SchemaDef::Any | SchemaDef::Unknown => Ok(value.clone()),
        SchemaDef::Never => Err(type_issue(path, "never", value)),
        SchemaDef::NaN => match value {
            Value::Number(number) if number.is_nan() => Ok(value.clone()),
            _ => Err(type_issue(path, "nan", value)),
        },
        SchemaDef::Symbol => match value {
            Value::Symbol(_) => Ok(value.clone()),
            _ => Err(type_issue(path, "symbol", value)),
        },
        SchemaDef::Literal(expected) => {
            if value == expected {
                Ok(value.clone())
            } else {
                Err(issue(path, format!("invalid literal value, expected {expected:?}")))
            }
        }
        SchemaDef::Enum(options) => match value {
            Value::String(member) if options.contains(member) => Ok(value.clone()),
            _ => Err(issue(
                path,
                format!("invalid enum value, expected one of {options:?}"),
            )),
        },
        SchemaDef::NativeEnum(members) => {
            if members.iter().any(|(_, member)| member == value) {
                Ok(value.clone())
            } else {
                Err(issue(path, "invalid enum value"))
            }
        }
        SchemaDef::Array(def) => {
            let Value::Array(items) = value else {
                return Err(type_issue(path, "array", value));
            };
            let mut issues = Vec::new();
            if let Some(min) = def.min_len {
                if items.len() < min {
                    issues.extend(issue(
                        path,
                        format!("array must contain at least {min} element(s)"),
                    ));
                }
            }
            if let Some(max) = def.max_len {
                if items.len() > max {
                    issues.extend(issue(
                        path,
                        format!("array must contain at most {max} element(s)"),
                    ));
                }
            }
            let parsed = parse_items(&def.item, items, path, &mut issues);
            finish(Value::Array(parsed), issues)
        }
        SchemaDef::Set(def) => {
            let Value::Set(items) = value else {
                return Err(type_issue(path, "set", value));
            };
            let mut issues = Vec::new();
            if let Some(min) = def.min_size {
                if items.len() < min {
                    issues.extend(issue(
                        path,
                        format!("set must contain at least {min} element(s)"),
                    ));
                }
            }
            if let Some(max) = def.max_size {
                if items.len() > max {
                    issues.extend(issue(
                        path,
                        format!("set must contain at most {max} element(s)"),
                    ));
                }
            }
            let parsed = parse_items(&def.item, items, path, &mut issues);
            finish(Value::set_from_items(parsed), issues)
        }
        SchemaDef::Object(def) => {
            let Value::Object(input) = value else {
                return Err(type_issue(path, "object", value));
            };
            let mut output = BTreeMap::new();
            let mut issues = Vec::new();
            for (key, field) in &def.shape {
                let present = input.get(key);
                let candidate = present.cloned().unwrap_or(Value::Undefined);
                match parse(field, &candidate, &child(path, PathSegment::Key(key.clone()))) {
                    Ok(parsed) => {
                        if present.is_some() || !parsed.is_undefined() {
                            output.insert(key.clone(), parsed);
                        }
                    }
                    Err(field_issues) => issues.extend(field_issues),
                }
            }
            let declared = |key: &String| def.shape.iter().any(|(name, _)| name == key);
            for (key, extra) in input.iter().filter(|(key, _)| !declared(key)) {
                match def.unknown_keys {
                    UnknownKeys::Strip => {}
                    UnknownKeys::Strict => {
                        issues.extend(issue(path, format!("unrecognized key '{key}'")))
                    }
                    UnknownKeys::Passthrough => {
                        output.insert(key.clone(), extra.clone());
                    }
                }
            }
            finish(Value::Object(output), issues)
        }
        SchemaDef::Tuple(def) => {
            let Value::Array(items) = value else {
                return Err(type_issue(path, "array", value));
            };
            let fixed = def.items.len();
            let arity_ok = match def.rest {
                Some(_) => items.len() >= fixed,
                None => items.len() == fixed,
            };
            if !arity_ok {
                return Err(issue(
                    path,
                    format!("expected tuple of {fixed} element(s), received {}", items.len()),
                ));
            }
            let mut issues = Vec::new();
            let mut output = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let slot = match def.items.get(index) {
                    Some(slot) => slot,
                    None => match &def.rest {
                        Some(rest) => rest,
                        None => break,
                    },
                };
                match parse(slot, item, &child(path, PathSegment::Index(index))) {
                    Ok(parsed) => output.push(parsed),
                    Err(item_issues) => issues.extend(item_issues),
                }
            }
            finish(Value::Array(output), issues)
        }
        SchemaDef::Record(def) => {
            let Value::Object(input) = value else {
                return Err(type_issue(path, "object", value));
            };
            let mut output = BTreeMap::new();
            let mut issues = Vec::new();
            for (key, entry) in input {
                let entry_path = child(path, PathSegment::Key(key.clone()));
                let parsed_key = parse(&def.key, &Value::String(key.clone()), &entry_path);
                let parsed_value = parse(&def.value, entry, &entry_path);
                match (parsed_key, parsed_value) {
                    (Ok(Value::String(key)), Ok(entry)) => {
                        output.insert(key, entry);
                    }
                    (Ok(Value::String(_)), Err(value_issues)) => issues.extend(value_issues),
                    (Ok(other), value_result) => {
                        issues.extend(issue(
                            &entry_path,
                            format!(
                                "record key must parse to a string, got {}",
                                other.type_name()
                            ),
                        ));
                        issues.extend(value_result.err().unwrap_or_default());
                    }
                    (Err(key_issues), value_result) => {
                        issues.extend(key_issues);
                        issues.extend(value_result.err().unwrap_or_default());
                    }
                }
            }
            finish(Value::Object(output), issues)
        }
        SchemaDef::Map(def) => {
            let Value::Map(entries) = value else {
                return Err(type_issue(path, "map", value));
            };
            let mut output = Vec::with_capacity(entries.len());
            let mut issues = Vec::new();
            for (index, (key, entry)) in entries.iter().enumerate() {
                let entry_path = child(path, PathSegment::Index(index));
                match (
                    parse(&def.key, key, &entry_path),
                    parse(&def.value, entry, &entry_path),
                ) {
                    (Ok(key), Ok(entry)) => output.push((key, entry)),
                    (key_result, value_result) => {
                        issues.extend(key_result.err().unwrap_or_default());
                        issues.extend(value_result.err().unwrap_or_default());
                    }
                }
            }
            finish(Value::map_from_pairs(output), issues)
        }
        SchemaDef::Union(options) => options
            .iter()
            .find_map(|option| parse(option, value, path).ok())
            .ok_or_else(|| issue(path, "invalid input: no union member matched")),
        SchemaDef::DiscriminatedUnion(def) => {
            let Value::Object(input) = value else {
                return Err(type_issue(path, "object", value));
            };
            let tags = def.options_by_tag().map_err(|reason| issue(path, reason))?;
            let tag_path = child(path, PathSegment::Key(def.discriminator.clone()));
            match input.get(&def.discriminator) {
                Some(Value::String(tag)) => match tags.get(tag) {
                    Some(option) => parse(option, value, path),
                    None => Err(issue(&tag_path, "invalid discriminator value")),
                },
                _ => Err(issue(&tag_path, "invalid discriminator value")),
            }
        }
        SchemaDef::Intersection(def) => {
            let left = parse(&def.left, value, path);
            let right = parse(&def.right, value, path);
            match (left, right) {
                (Ok(left), Ok(right)) => merge_values(left, right)
                    .ok_or_else(|| issue(path, "intersection results could not be merged")),
                (left, right) => {
                    let mut issues = left.err().unwrap_or_default();
                    issues.extend(right.err().unwrap_or_default());
                    Err(issues)
                }
            }
        }
        SchemaDef::Function(def) => {
            let Value::Function(inner) = value else {
                return Err(type_issue(path, "function", value));
            };
            let inner = inner.clone();
            let args = def.args.clone();
            let returns = def.returns.clone();
            Ok(Value::Function(FunctionValue::new(move |call_args| {
                if call_args.len() != args.len() {
                    return Err(ParseError::new(format!(
                        "expected {} argument(s), received {}",
                        args.len(),
                        call_args.len()
                    )));
                }
                let parsed_args = args
                    .iter()
                    .zip(call_args)
                    .map(|(schema, arg)| schema.safe_parse(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = inner.call(&parsed_args)?;
                returns.safe_parse(&result)
            })))
        }
        SchemaDef::Promise(inner) => match value {
            Value::Promise(settled) => parse(inner, settled, path).map(Value::promise),
            _ => Err(type_issue(path, "promise", value)),
        },
        SchemaDef::Lazy(def) => parse(&(def.getter)(), value, path),
        SchemaDef::Optional(inner) => match value {
            Value::Undefined => Ok(Value::Undefined),
            _ => parse(inner, value, path),
        },
        SchemaDef::Nullable(inner) => match value {
            Value::Null => Ok(Value::Null),
            _ => parse(inner, value, path),
        },
        SchemaDef::Default(def) => match value {
            Value::Undefined => parse(&def.inner, &def.value, path),
            _ => parse(&def.inner, value, path),
        },
        SchemaDef::Catch(def) => {
            Ok(parse(&def.inner, value, path).unwrap_or_else(|_| def.value.clone()))
        }
        SchemaDef::Effects(def) => match &def.effect {
            Effect::Refinement { check, message } => {
                let parsed = parse(&def.inner, value, path)?;
                if check(&parsed) {
                    Ok(parsed)
                } else {
                    Err(issue(path, message.clone()))
                }
            }
            Effect::Transform(transform) => {
                let parsed = parse(&def.inner, value, path)?;
                transform(parsed).map_err(|message| issue(path, message))
            }
            Effect::Preprocess(prepare) => parse(&def.inner, &prepare(value.clone()), path),
        },
        SchemaDef::Pipeline(def) => {
            let intermediate = parse(&def.input, value, path)?;
            parse(&def.output, &intermediate, path)
        }
        SchemaDef::Branded(def) => parse(&def.inner, value, path),
        SchemaDef::Readonly(inner) => parse(inner, value, path),
        SchemaDef::Custom(def) => {
            if (def.check)(value) {
                Ok(value.clone())
            } else {
                Err(issue(path, format!("invalid {}", def.type_name)))
            }
        }
    }
}

fn parse_items(
    item: &Schema,
    items: &[Value],
    path: &[PathSegment],
    issues: &mut Vec<Issue>,
) -> Vec<Value> {
    let mut parsed = Vec::with_capacity(items.len());
    for (index, value) in items.iter().enumerate() {
        match parse(item, value, &child(path, PathSegment::Index(index))) {
            Ok(value) => parsed.push(value),
            Err(item_issues) => issues.extend(item_issues),
        }
    }
    parsed
}

fn merge_values(left: Value, right: Value) -> Option<Value> {
    match (left, right) {
        (Value::Object(mut left), Value::Object(right)) => {
            for (key, value) in right {
                let merged = match left.remove(&key) {
                    Some(existing) => merge_values(existing, value)?,
                    None => value,
                };
                left.insert(key, merged);
            }
            Some(Value::Object(left))
        }
        (Value::Array(left), Value::Array(right)) if left.len() == right.len() => left
            .into_iter()
            .zip(right)
            .map(|(left, right)| merge_values(left, right))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        (left, right) if left == right => Some(left),
        _ => None,
    }
}
