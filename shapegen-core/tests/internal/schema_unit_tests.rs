use super::*;
use crate::value::{FunctionValue, Symbol};
use chrono::{TimeZone, Utc};
use regex::Regex;
use serde_json::json;

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn first_message(schema: &Schema, value: &Value) -> String {
    schema
        .safe_parse(value)
        .expect_err("expected rejection")
        .issues()
        .head
        .message
        .clone()
}

#[test]
fn schema_identity_survives_clone_but_not_rebuild() {
    let first: Schema = string().into();
    let copy = first.clone();
    let rebuilt: Schema = string().into();
    assert_eq!(first.id(), copy.id());
    assert_ne!(first.id(), rebuilt.id());
}

#[test]
fn type_names_are_lowercase_kind_names() {
    assert_eq!(Schema::from(string()).type_name(), "string");
    assert_eq!(native_enum([("A", 1.0)]).type_name(), "native enum");
    assert_eq!(lazy(boolean).type_name(), "lazy");
    assert_eq!(custom("color", |_| true).type_name(), "color");
    assert_eq!(SchemaKind::DiscriminatedUnion.to_string(), "discriminated union");
}

#[test]
fn string_checks_count_characters() {
    let schema: Schema = string().min(2).max(3).into();
    assert!(schema.safe_parse(&v(json!("éé"))).is_ok());
    assert!(schema.safe_parse(&v(json!("é"))).is_err());
    assert!(schema.safe_parse(&v(json!("abcd"))).is_err());
    assert_eq!(
        first_message(&schema, &v(json!(3))),
        "expected string, received number"
    );
}

#[test]
fn string_transforms_apply_before_later_checks() {
    let schema: Schema = string().trim().min(2).to_upper_case().into();
    assert_eq!(
        schema.safe_parse(&v(json!("  ab  "))).expect("parse"),
        v(json!("AB"))
    );
    assert!(schema.safe_parse(&v(json!("  a  "))).is_err());
}

#[test]
fn string_formats_validate_their_shapes() {
    let uuid: Schema = string().uuid().into();
    assert!(uuid
        .safe_parse(&v(json!("123e4567-e89b-12d3-a456-426614174000")))
        .is_ok());
    assert!(uuid.safe_parse(&v(json!("123e4567"))).is_err());

    let email: Schema = string().email().into();
    assert!(email.safe_parse(&v(json!("ada@example.com"))).is_ok());
    assert!(email.safe_parse(&v(json!("ada..lovelace@example.com"))).is_err());
    assert!(email.safe_parse(&v(json!("not-an-email"))).is_err());

    let url: Schema = string().url().into();
    assert!(url.safe_parse(&v(json!("https://example.com/path"))).is_ok());
    assert!(url.safe_parse(&v(json!("example.com"))).is_err());

    let ulid: Schema = string().ulid().into();
    assert!(ulid
        .safe_parse(&v(json!("01ARZ3NDEKTSV4RRFFQ69G5FAV")))
        .is_ok());
    assert!(ulid.safe_parse(&v(json!("01ARZ3NDEKTSV4RRFFQ69G5FAU!"))).is_err());

    let v4: Schema = string().ip(IpVersion::V4).into();
    assert!(v4.safe_parse(&v(json!("192.168.0.1"))).is_ok());
    assert!(v4.safe_parse(&v(json!("::1"))).is_err());
    let any_ip: Schema = string().ip(IpVersion::Any).into();
    assert!(any_ip.safe_parse(&v(json!("::1"))).is_ok());
}

#[test]
fn datetime_format_honors_offset_and_precision() {
    let plain: Schema = string().datetime().into();
    assert!(plain.safe_parse(&v(json!("2020-01-01T00:00:00Z"))).is_ok());
    assert!(plain.safe_parse(&v(json!("2020-01-01T00:00:00.123Z"))).is_ok());
    assert!(plain.safe_parse(&v(json!("2020-01-01T00:00:00+02:00"))).is_err());
    assert!(plain.safe_parse(&v(json!("2020-02-30T00:00:00Z"))).is_err());

    let offset: Schema = string().datetime_with(true, Some(3)).into();
    assert!(offset
        .safe_parse(&v(json!("2020-01-01T00:00:00.000+02:00")))
        .is_ok());
    assert!(offset.safe_parse(&v(json!("2020-01-01T00:00:00+02:00"))).is_err());
}

#[test]
fn regex_and_affix_checks() {
    let schema: Schema = string()
        .regex(Regex::new("^[a-f]+$").expect("regex"))
        .starts_with("ab")
        .ends_with("ef")
        .includes("cd")
        .into();
    assert!(schema.safe_parse(&v(json!("abcdef"))).is_ok());
    assert!(schema.safe_parse(&v(json!("abef"))).is_err());
    assert!(schema.safe_parse(&v(json!("abcdefg"))).is_err());
}

#[test]
fn number_checks_respect_inclusivity() {
    let schema: Schema = number().gt(0.0).lte(10.0).into();
    assert!(schema.safe_parse(&Value::Number(10.0)).is_ok());
    assert!(schema.safe_parse(&Value::Number(0.0)).is_err());
    assert!(schema.safe_parse(&Value::Number(f64::NAN)).is_err());

    let int: Schema = number().int().into();
    assert!(int.safe_parse(&Value::Number(3.0)).is_ok());
    assert_eq!(
        first_message(&int, &Value::Number(3.5)),
        "expected integer, received float"
    );

    let finite: Schema = number().finite().into();
    assert!(finite.safe_parse(&Value::Number(f64::INFINITY)).is_err());
}

#[test]
fn multiple_of_tolerates_float_rounding() {
    let schema: Schema = number().multiple_of(0.1).into();
    assert!(schema.safe_parse(&Value::Number(0.3)).is_ok());
    assert!(schema.safe_parse(&Value::Number(0.35)).is_err());
}

#[test]
fn bigint_and_date_bounds() {
    let bigint: Schema = bigint().min(-5).lt(5).multiple_of(5).into();
    assert!(bigint.safe_parse(&Value::BigInt(-5)).is_ok());
    assert!(bigint.safe_parse(&Value::BigInt(5)).is_err());
    assert!(bigint.safe_parse(&Value::Number(0.0)).is_err());

    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    let dates: Schema = date().min(start).max(end).into();
    assert!(dates.safe_parse(&Value::Date(start)).is_ok());
    let late = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    assert!(dates.safe_parse(&Value::Date(late)).is_err());
}

#[test]
fn object_policies_handle_unknown_keys() {
    let base = || object().field("name", string());
    let input = v(json!({"name": "ada", "extra": 1}));

    let stripped = Schema::from(base()).safe_parse(&input).expect("strip");
    assert_eq!(stripped, v(json!({"name": "ada"})));

    let error = Schema::from(base().strict()).safe_parse(&input).unwrap_err();
    assert_eq!(error.issues().head.message, "unrecognized key 'extra'");

    let kept = Schema::from(base().passthrough()).safe_parse(&input).expect("passthrough");
    assert_eq!(kept, input);
}

#[test]
fn object_reports_nested_issue_paths() {
    let schema: Schema = object()
        .field("tags", array(string()))
        .field("age", Schema::from(number()).optional())
        .into();
    let error = schema
        .safe_parse(&v(json!({"tags": ["a", 1]})))
        .unwrap_err();
    let issue = &error.issues().head;
    assert_eq!(
        issue.path,
        vec![PathSegment::Key("tags".to_string()), PathSegment::Index(1)]
    );
    assert_eq!(issue.to_string(), ".tags[1]: expected string, received number");
}

#[test]
fn optional_fields_may_be_missing_or_undefined() {
    let schema: Schema = object().field("age", Schema::from(number()).optional()).into();
    assert_eq!(
        schema.safe_parse(&v(json!({}))).expect("missing"),
        v(json!({}))
    );
    let explicit = Value::object([("age", Value::Undefined)]);
    assert_eq!(schema.safe_parse(&explicit).expect("undefined"), explicit);
}

#[test]
fn default_fills_in_undefined_input() {
    let schema = Schema::from(number()).default_value(7.0);
    assert_eq!(
        schema.safe_parse(&Value::Undefined).expect("default"),
        Value::Number(7.0)
    );
    assert_eq!(
        schema.safe_parse(&Value::Number(1.0)).expect("present"),
        Value::Number(1.0)
    );
}

#[test]
fn catch_replaces_any_failure() {
    let schema = Schema::from(number()).catch_value("fallback");
    assert_eq!(
        schema.safe_parse(&v(json!("oops"))).expect("catch"),
        v(json!("fallback"))
    );
}

#[test]
fn tuple_checks_arity_and_rest() {
    let fixed = tuple([Schema::from(string()), Schema::from(number())]);
    assert!(fixed.safe_parse(&v(json!(["a", 1]))).is_ok());
    assert!(fixed.safe_parse(&v(json!(["a", 1, 2]))).is_err());

    let rest = tuple_with_rest([Schema::from(string())], number());
    assert!(rest.safe_parse(&v(json!(["a", 1, 2, 3]))).is_ok());
    assert!(rest.safe_parse(&v(json!(["a", 1, "b"]))).is_err());
    assert!(rest.safe_parse(&v(json!([]))).is_err());
}

#[test]
fn record_validates_keys_and_values() {
    let schema = record(string().min(2), number());
    assert!(schema.safe_parse(&v(json!({"ab": 1, "cd": 2}))).is_ok());
    assert!(schema.safe_parse(&v(json!({"a": 1}))).is_err());
    assert!(schema.safe_parse(&v(json!({"ab": "x"}))).is_err());
}

#[test]
fn map_and_set_keep_unique_entries() {
    let schema = map(string(), number());
    let input = Value::map_from_pairs([
        (v(json!("a")), Value::Number(1.0)),
        (v(json!("a")), Value::Number(2.0)),
    ]);
    assert_eq!(
        schema.safe_parse(&input).expect("map"),
        Value::Map(vec![(v(json!("a")), Value::Number(2.0))])
    );

    let sets: Schema = set(number()).min(2).into();
    let single = Value::set_from_items([Value::Number(1.0), Value::Number(1.0)]);
    assert!(sets.safe_parse(&single).is_err());
}

#[test]
fn unions_pick_the_first_matching_option() {
    let schema = union([Schema::from(number()), Schema::from(string())]);
    assert!(schema.safe_parse(&v(json!("x"))).is_ok());
    assert!(schema.safe_parse(&Value::Bool(true)).is_err());
}

#[test]
fn discriminated_union_resolves_tags() {
    let circle: Schema = object()
        .field("kind", literal("circle"))
        .field("radius", number())
        .into();
    let square: Schema = object()
        .field("kind", literal("square"))
        .field("side", number())
        .into();
    let schema = discriminated_union("kind", [square, circle]);
    assert!(schema
        .safe_parse(&v(json!({"kind": "circle", "radius": 1})))
        .is_ok());
    let error = schema.safe_parse(&v(json!({"kind": "blob"}))).unwrap_err();
    assert_eq!(error.issues().head.message, "invalid discriminator value");

    let SchemaDef::DiscriminatedUnion(def) = schema.def() else {
        panic!("expected discriminated union");
    };
    let tags: Vec<_> = def.options_by_tag().expect("tags").into_keys().collect();
    assert_eq!(tags, vec!["circle".to_string(), "square".to_string()]);
}

#[test]
fn discriminated_union_rejects_inconsistent_options() {
    let tags_of = |schema: Schema| match schema.def() {
        SchemaDef::DiscriminatedUnion(def) => def.options_by_tag(),
        other => panic!("expected discriminated union, got {other:?}"),
    };

    let untagged: Schema = object().field("radius", number()).into();
    let error = tags_of(discriminated_union("kind", [untagged])).unwrap_err();
    assert!(error.contains("missing discriminator 'kind'"));

    let first: Schema = object().field("kind", literal("a")).into();
    let second: Schema = object().field("kind", literal("a")).into();
    let error = tags_of(discriminated_union("kind", [first, second])).unwrap_err();
    assert_eq!(error, "discriminator value 'a' is declared twice");
}

#[test]
fn intersection_merges_object_results() {
    let left: Schema = object().field("a", number()).into();
    let right: Schema = object().field("b", string()).into();
    let schema = intersection(left, right);
    assert_eq!(
        schema
            .safe_parse(&v(json!({"a": 1, "b": "x"})))
            .expect("merge"),
        v(json!({"a": 1, "b": "x"}))
    );
    assert!(schema.safe_parse(&v(json!({"a": 1}))).is_err());
}

#[test]
fn functions_are_wrapped_with_argument_and_return_validation() {
    let schema = function([Schema::from(number())], string());
    let echo = Value::Function(FunctionValue::new(|args| Ok(args[0].clone())));
    let Value::Function(wrapped) = schema.safe_parse(&echo).expect("function") else {
        panic!("expected function");
    };
    assert!(wrapped.call(&[Value::Number(1.0)]).is_err());
    assert!(wrapped.call(&[]).is_err());

    let constant = Value::Function(FunctionValue::returning(v(json!("ok"))));
    let Value::Function(wrapped) = schema.safe_parse(&constant).expect("function") else {
        panic!("expected function");
    };
    assert_eq!(wrapped.call(&[Value::Number(1.0)]).expect("call"), v(json!("ok")));
}

#[test]
fn promises_validate_their_settled_value() {
    let schema = promise(number());
    assert!(schema.safe_parse(&Value::promise(Value::Number(1.0))).is_ok());
    assert!(schema.safe_parse(&Value::promise(v(json!("x")))).is_err());
    assert!(schema.safe_parse(&Value::Number(1.0)).is_err());
}

#[test]
fn effects_refine_transform_and_preprocess() {
    let even = Schema::from(number()).refine(
        |value| value.as_f64().is_some_and(|n| n % 2.0 == 0.0),
        "must be even",
    );
    assert!(even.safe_parse(&Value::Number(2.0)).is_ok());
    assert_eq!(first_message(&even, &Value::Number(3.0)), "must be even");

    let stringify = Schema::from(number()).transform(|value| match value {
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    });
    assert_eq!(
        stringify.safe_parse(&Value::Number(4.0)).expect("transform"),
        v(json!("4"))
    );

    let failing = Schema::from(string()).try_transform(|_| Err("nope".to_string()));
    assert_eq!(first_message(&failing, &v(json!("x"))), "nope");

    let parsed_number = preprocess(
        |value| match value {
            Value::String(text) => match text.parse::<f64>() {
                Ok(number) => Value::Number(number),
                Err(_) => Value::String(text),
            },
            other => other,
        },
        number(),
    );
    assert_eq!(
        parsed_number.safe_parse(&v(json!("2.5"))).expect("preprocess"),
        Value::Number(2.5)
    );
}

#[test]
fn pipeline_feeds_output_into_next_schema() {
    let trimmed: Schema = string().trim().into();
    let schema = trimmed.pipe(string().min(3));
    assert!(schema.safe_parse(&v(json!("  abc  "))).is_ok());
    assert!(schema.safe_parse(&v(json!("  ab  "))).is_err());
}

#[test]
fn wrappers_are_transparent_to_validation() {
    let branded = Schema::from(number()).brand("Meters");
    let frozen = Schema::from(string()).readonly();
    assert!(branded.safe_parse(&Value::Number(1.0)).is_ok());
    assert!(frozen.safe_parse(&v(json!("x"))).is_ok());
    assert!(frozen.safe_parse(&Value::Null).is_err());
}

#[test]
fn leaves_accept_their_own_values() {
    assert!(nan().safe_parse(&Value::Number(f64::NAN)).is_ok());
    assert!(nan().safe_parse(&Value::Number(1.0)).is_err());
    assert!(symbol().safe_parse(&Value::Symbol(Symbol::new(None))).is_ok());
    assert!(void().safe_parse(&Value::Undefined).is_ok());
    assert!(null().safe_parse(&Value::Undefined).is_err());
    assert!(never().safe_parse(&Value::Null).is_err());
    assert!(unknown().safe_parse(&v(json!({"x": [1]}))).is_ok());
    assert!(enum_of(["a", "b"]).safe_parse(&v(json!("b"))).is_ok());
    assert!(native_enum([("Up", 1.0), ("Down", 2.0)])
        .safe_parse(&Value::Number(2.0))
        .is_ok());
}

#[test]
fn lazy_resolves_through_its_getter() {
    let schema = lazy(|| object().field("name", string()).into());
    assert!(schema.safe_parse(&v(json!({"name": "x"}))).is_ok());
    assert!(schema.safe_parse(&v(json!({"name": 1}))).is_err());
}

#[test]
fn custom_schemas_use_their_check() {
    let schema = custom("positive", |value| value.as_f64().is_some_and(|n| n > 0.0));
    assert!(schema.safe_parse(&Value::Number(1.0)).is_ok());
    assert_eq!(first_message(&schema, &Value::Number(-1.0)), "invalid positive");
}

#[test]
fn parse_error_display_lists_every_issue() {
    let schema: Schema = object()
        .field("a", number())
        .field("b", number())
        .into();
    let error = schema.safe_parse(&v(json!({"a": "x", "b": "y"}))).unwrap_err();
    assert_eq!(
        error.to_string(),
        "validation failed: .a: expected number, received string; .b: expected number, received string"
    );
}
