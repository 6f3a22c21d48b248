use super::monitor::Monitored;
use super::scalars::{self, next_down, next_up};
use super::*;
use crate::schema::{self, StringFormat};
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use std::fmt;

fn sample<T: fmt::Debug>(strategy: &SBoxedStrategy<T>) -> T {
    let mut runner = TestRunner::deterministic();
    strategy
        .new_tree(&mut runner)
        .expect("value tree")
        .current()
}

fn samples<T: fmt::Debug>(strategy: &SBoxedStrategy<T>, count: usize) -> Vec<T> {
    let mut runner = TestRunner::deterministic();
    (0..count)
        .map(|_| strategy.new_tree(&mut runner).expect("value tree").current())
        .collect()
}

fn small_config() -> GenerationConfig {
    GenerationConfig {
        min_trials: 20,
        ..GenerationConfig::default()
    }
}

fn depth(value: &Value) -> u32 {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(entries) => 1 + entries.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

#[test]
fn path_renders_root_as_dot() {
    assert_eq!(Path::root().to_string(), ".");
    assert!(Path::root().is_root());
    assert_eq!(Path::root().as_str(), "");
}

#[test]
fn path_appends_segments_in_order() {
    let path = Path::root().property("foo").element().index(2);
    assert_eq!(path.to_string(), ".foo[*][2]");
    assert_eq!(
        Path::root().property("m").key().to_string(),
        ".m.(key)"
    );
    assert_eq!(Path::root().value().to_string(), ".(value)");
    assert_eq!(
        Path::root().property("f").return_type().to_string(),
        ".f.(return type)"
    );
    assert_eq!(Path::root().resolved_type().to_string(), ".(resolved type)");
}

#[test]
fn next_up_and_next_down_step_one_ulp() {
    assert_eq!(next_up(0.0), f64::from_bits(1));
    assert_eq!(next_down(0.0), -f64::from_bits(1));
    assert!(next_up(1.0) > 1.0);
    assert_eq!(next_down(next_up(1.0)), 1.0);
    assert_eq!(next_up(-1.0), -next_down(1.0));
    assert_eq!(next_up(f64::INFINITY), f64::INFINITY);
    assert_eq!(next_up(f64::MAX), f64::INFINITY);
    assert!(next_up(f64::NAN).is_nan());
}

#[test]
fn monitor_trips_after_warm_up_when_nothing_is_accepted() {
    let config = small_config();
    let path = Path::root().property("foo").element();
    let monitored = Monitored::new(Just(7u8), path, &config, |_: u8| None::<u8>);
    let stats = monitored.stats();
    let mut runner = TestRunner::deterministic();

    let reason = monitored.new_tree(&mut runner).unwrap_err();

    assert_eq!(stats.snapshot(), (20, 0));
    assert!(reason.message().contains("'.foo[*]'"));
    assert!(reason.message().contains("0 of 20 candidates accepted"));
}

#[test]
fn monitor_counts_every_candidate_across_draws() {
    let config = small_config();
    let monitored = Monitored::new(0u32..100, Path::root(), &config, |value: u32| {
        (value % 2 == 0).then_some(value)
    });
    let stats = monitored.stats();
    let mut runner = TestRunner::deterministic();

    for _ in 0..200 {
        let tree = monitored.new_tree(&mut runner).expect("accepted value");
        assert_eq!(tree.current() % 2, 0);
    }

    let (trials, successes) = stats.snapshot();
    assert_eq!(successes, 200);
    assert!(trials >= successes);
}

#[test]
fn monitor_counters_are_scoped_to_one_strategy() {
    let config = small_config();
    let first = Monitored::new(Just(1u8), Path::root(), &config, Some);
    let second = Monitored::new(Just(1u8), Path::root(), &config, Some);
    let mut runner = TestRunner::deterministic();
    first.new_tree(&mut runner).expect("first");
    first.new_tree(&mut runner).expect("first again");
    second.new_tree(&mut runner).expect("second");
    assert_eq!(first.stats().snapshot(), (2, 2));
    assert_eq!(second.stats().snapshot(), (1, 1));
}

#[test]
fn monitor_keeps_shrunk_values_accepted() {
    let config = small_config();
    let monitored = Monitored::new(0u32..10_000, Path::root(), &config, |value: u32| {
        (value % 3 == 0).then_some(value)
    });
    let mut runner = TestRunner::deterministic();
    let mut tree = monitored.new_tree(&mut runner).expect("tree");
    for _ in 0..64 {
        assert_eq!(tree.current() % 3, 0);
        if !tree.simplify() {
            break;
        }
    }
    assert_eq!(tree.current() % 3, 0);
}

#[test]
fn override_registry_leaves_earlier_registries_untouched() {
    let first = schema::boolean();
    let second = schema::boolean();
    let empty = OverrideRegistry::default();
    let one = empty.with(first.id(), Override::Strategy(Just(Value::Null).sboxed()));
    let two = one.with(second.id(), Override::Strategy(Just(Value::Null).sboxed()));

    assert_eq!(empty.len(), 0);
    assert_eq!(one.len(), 1);
    assert_eq!(two.len(), 2);
    assert!(one.resolve(second.id()).is_none());
    assert!(two.resolve(first.id()).is_some());
}

#[test]
fn override_registry_resolves_the_newest_registration() {
    let target = schema::boolean();
    let registry = OverrideRegistry::default()
        .with(target.id(), Override::Strategy(Just(Value::from("old")).sboxed()))
        .with(target.id(), Override::Strategy(Just(Value::from("new")).sboxed()));
    assert_eq!(registry.len(), 1);

    let strategy = registry
        .resolve(target.id())
        .expect("registered")
        .build(&Compiler::new())
        .expect("strategy");
    assert_eq!(sample(&strategy), Value::from("new"));
}

#[test]
fn override_factory_receives_the_resolving_compiler() {
    let target = schema::boolean();
    let inner: Schema = schema::string().length(3).into();
    let compiler = Compiler::new().with_override_fn(&target, {
        let inner = inner.clone();
        move |compiler: &Compiler| compiler.input_of(&inner)
    });
    let value = sample(&compiler.input_of(&target).expect("strategy"));
    assert_eq!(value.as_str().map(|text| text.chars().count()), Some(3));
}

#[test]
fn compiler_debug_reports_override_count() {
    let schema = schema::null();
    let compiler = Compiler::new().with_override(&schema, Just(Value::Null));
    let debug = format!("{compiler:?}");
    assert!(debug.contains("overrides: 1"));
}

#[test]
fn format_strategies_produce_matching_strings() {
    let cases = [
        StringFormat::Uuid,
        StringFormat::Cuid,
        StringFormat::Cuid2,
        StringFormat::Ulid,
        StringFormat::Email,
        StringFormat::Url,
        StringFormat::Ip(schema::IpVersion::Any),
        StringFormat::Ip(schema::IpVersion::V6),
        StringFormat::Datetime {
            offset: false,
            precision: None,
        },
        StringFormat::Datetime {
            offset: true,
            precision: Some(6),
        },
    ];
    for format in cases {
        let strategy = formats::format_strategy(&format, &Path::root()).expect("format");
        for value in samples(&strategy, 50) {
            assert!(format.matches(&value), "{} rejected {value:?}", format.name());
        }
    }
}

#[test]
fn datetime_precision_beyond_nanoseconds_is_exact() {
    let format = StringFormat::Datetime {
        offset: false,
        precision: Some(12),
    };
    let strategy = formats::format_strategy(&format, &Path::root()).expect("format");
    for value in samples(&strategy, 50) {
        assert_eq!(value.len(), "2020-01-01T00:00:00.000000000000Z".len());
        assert!(format.matches(&value), "{value:?}");
    }
    let schema: Schema = schema::string().datetime_with(false, Some(12)).into();
    let SchemaDef::String(def) = schema.def() else {
        panic!("expected string");
    };
    let candidate = scalars::string_candidate(def, &Path::root(), &GenerationConfig::default())
        .expect("candidate");
    assert!(candidate.exact);
}

#[test]
fn string_candidates_are_exact_only_when_constructive() {
    let config = GenerationConfig::default();
    let exact = |schema: Schema| match schema.def() {
        SchemaDef::String(def) => scalars::string_candidate(def, &Path::root(), &config)
            .expect("candidate")
            .exact,
        _ => panic!("expected string"),
    };
    assert!(exact(schema::string().min(2).max(5).into()));
    assert!(exact(schema::string().starts_with("ab").ends_with("z").into()));
    assert!(exact(schema::string().uuid().into()));
    assert!(!exact(schema::string().uuid().max(10).into()));
    assert!(!exact(schema::string().trim().into()));
    assert!(!exact(
        schema::string()
            .regex(regex::Regex::new("^a+$").expect("regex"))
            .into()
    ));
    assert!(!exact(schema::string().starts_with("ab").starts_with("cd").into()));
    assert!(!exact(schema::string().includes("long").max(2).into()));
}

#[test]
fn string_candidate_rejects_inverted_length_bounds() {
    let schema: Schema = schema::string().min(5).max(2).into();
    let SchemaDef::String(def) = schema.def() else {
        panic!("expected string");
    };
    let error = scalars::string_candidate(def, &Path::root(), &GenerationConfig::default())
        .err()
        .expect("inverted bounds");
    assert!(matches!(error, ArbitraryError::InvalidSchema { .. }));
}

#[test]
fn number_candidates_narrow_to_multiples() {
    let schema: Schema = schema::number().multiple_of(3.0).gt(0.0).lt(30.0).into();
    let SchemaDef::Number(def) = schema.def() else {
        panic!("expected number");
    };
    let candidate = scalars::number_candidate(def, &Path::root()).expect("candidate");
    assert!(candidate.exact);
    for value in samples(&candidate.strategy, 100) {
        let number = value.as_f64().expect("number");
        assert!(number > 0.0 && number < 30.0, "{number}");
        assert_eq!(number % 3.0, 0.0);
    }
}

#[test]
fn fractional_steps_fall_back_to_filtering() {
    let schema: Schema = schema::number().multiple_of(0.1).min(0.0).max(1.0).into();
    let SchemaDef::Number(def) = schema.def() else {
        panic!("expected number");
    };
    let candidate = scalars::number_candidate(def, &Path::root()).expect("candidate");
    assert!(!candidate.exact);
}

#[test]
fn number_candidate_rejects_empty_ranges() {
    let cases: Vec<Schema> = vec![
        schema::number().gt(1.0).lt(1.0).into(),
        schema::number().int().gt(1.0).lt(2.0).into(),
        schema::number().multiple_of(0.0).into(),
        schema::number().gte(f64::NAN).into(),
    ];
    for schema in cases {
        let SchemaDef::Number(def) = schema.def() else {
            panic!("expected number");
        };
        assert!(scalars::number_candidate(def, &Path::root()).is_err());
    }
}

#[test]
fn float_candidates_cover_huge_spans_without_overflow() {
    let schema: Schema = schema::number().min(-f64::MAX).max(f64::MAX).into();
    let SchemaDef::Number(def) = schema.def() else {
        panic!("expected number");
    };
    let candidate = scalars::number_candidate(def, &Path::root()).expect("candidate");
    for value in samples(&candidate.strategy, 200) {
        assert!(value.as_f64().expect("number").is_finite());
    }
}

#[test]
fn bigint_candidate_uses_floor_and_ceiling_division() {
    let schema: Schema = schema::bigint().min(-7).max(7).multiple_of(-3).into();
    let SchemaDef::BigInt(def) = schema.def() else {
        panic!("expected bigint");
    };
    let candidate = scalars::bigint_candidate(def, &Path::root()).expect("candidate");
    for value in samples(&candidate.strategy, 100) {
        let Value::BigInt(number) = value else {
            panic!("expected bigint, got {value:?}");
        };
        assert!((-6..=6).contains(&number));
        assert_eq!(number % 3, 0);
    }

    let empty: Schema = schema::bigint().min(1).max(2).multiple_of(5).into();
    let SchemaDef::BigInt(def) = empty.def() else {
        panic!("expected bigint");
    };
    assert!(scalars::bigint_candidate(def, &Path::root()).is_err());
}

#[test]
fn any_value_respects_depth() {
    let strategy = scalars::any_value(2);
    for value in samples(&strategy, 200) {
        assert!(depth(&value) <= 2, "{value:?}");
    }
    for value in samples(&scalars::any_value(0), 50) {
        assert_eq!(depth(&value), 0);
    }
}

#[test]
fn output_identity_covers_scalar_kinds_only() {
    assert!(is_output_identical(&schema::string().min(1).into()));
    assert!(!is_output_identical(&schema::string().to_lower_case().into()));
    assert!(is_output_identical(&schema::number().into()));
    assert!(is_output_identical(&schema::enum_of(["a"])));
    assert!(!is_output_identical(&schema::object().into()));
    assert!(!is_output_identical(&schema::boolean().optional()));
    assert!(!is_output_identical(&schema::array(schema::number()).into()));
}

#[test]
fn absent_weight_of_zero_drops_the_absent_marker() {
    let compiler = Compiler::with_config(GenerationConfig {
        absent_weight: 0,
        ..GenerationConfig::default()
    });
    let schema = schema::boolean().optional();
    let strategy = compiler.input_of(&schema).expect("strategy");
    for value in samples(&strategy, 100) {
        assert!(matches!(value, Value::Bool(_)));
    }
}
