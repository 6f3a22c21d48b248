//! Shared helpers for shapegen integration tests.

use ctor::ctor;

#[ctor]
fn init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .is_test(true)
        .try_init();
}

use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::{Reason, TestRunner};
use shapegen_core::schema::{self, Schema};
use shapegen_core::{Value, ValueStrategy};

/// Draws one value from `strategy` with a deterministic runner.
pub fn sample(strategy: &ValueStrategy) -> Value {
    samples(strategy, 1).remove(0)
}

/// Draws `count` values from `strategy` with a deterministic runner.
///
/// Panics when the strategy refuses to produce a value.
pub fn samples(strategy: &ValueStrategy, count: usize) -> Vec<Value> {
    let mut runner = TestRunner::deterministic();
    (0..count)
        .map(|_| {
            strategy
                .new_tree(&mut runner)
                .unwrap_or_else(|reason| panic!("strategy rejected: {}", reason.message()))
                .current()
        })
        .collect()
}

/// Draws values until the strategy refuses, returning the refusal and the number of
/// values produced before it. Returns `None` if `limit` draws all succeed.
pub fn draw_until_rejected(strategy: &ValueStrategy, limit: usize) -> Option<(Reason, usize)> {
    let mut runner = TestRunner::deterministic();
    for drawn in 0..limit {
        if let Err(reason) = strategy.new_tree(&mut runner) {
            return Some((reason, drawn));
        }
    }
    None
}

/// `{firstName: string, lastName: string}`.
pub fn person_schema() -> Schema {
    schema::object()
        .field("firstName", schema::string())
        .field("lastName", schema::string())
        .build()
}

/// A shape with one field of every common wrapper kind.
pub fn account_schema() -> Schema {
    schema::object()
        .field("id", schema::string().uuid())
        .field("email", schema::string().email())
        .field("age", schema::number().int().gte(0.0).lte(150.0))
        .field("nickname", schema::string().min(1).max(12).build().optional())
        .field("manager", schema::string().cuid().build().nullable())
        .field("tags", schema::array(schema::enum_of(["admin", "staff", "guest"])).max(3))
        .field("created", schema::date())
        .build()
}

/// A tagged union of two shapes keyed on `kind`.
pub fn shape_schema() -> Schema {
    schema::discriminated_union(
        "kind",
        [
            schema::object()
                .field("kind", schema::literal("circle"))
                .field("radius", schema::number().positive().finite())
                .build(),
            schema::object()
                .field("kind", schema::literal("square"))
                .field("side", schema::number().int().positive().lte(1000.0))
                .build(),
        ],
    )
}

/// Strings of exactly forty lowercase hexadecimal digits.
pub fn sha1_schema() -> Schema {
    let pattern = regex::Regex::new("^[0-9a-f]{40}$").expect("valid pattern");
    schema::string().regex(pattern).build()
}

/// Whether `value` passes `schema`.
pub fn accepts(schema: &Schema, value: &Value) -> bool {
    schema.safe_parse(value).is_ok()
}
