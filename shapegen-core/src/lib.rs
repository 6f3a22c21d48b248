//! Compiles declarative data-shape schemas into proptest generators.
//!
//! Build a [`Schema`] with the constructors in [`schema`], then ask a
//! [`Compiler`] for a strategy over the values it accepts ([`Compiler::input_of`])
//! or the values it produces once validated ([`Compiler::output_of`]).

use serde::{Deserialize, Serialize};

mod error;
mod generator;
pub mod schema;
pub mod value;

pub use error::ArbitraryError;
pub use generator::{Compiler, OverrideFactory, Path, ValueStrategy};
pub use schema::{ParseError, Schema, SchemaId, SchemaKind};
pub use value::Value;

#[cfg(test)]
#[path = "../tests/internal/lib_unit_tests.rs"]
mod tests;

fn default_min_trials() -> u64 {
    1000
}

fn default_min_success_rate() -> f64 {
    0.01
}

fn default_present_weight() -> u32 {
    2
}

fn default_absent_weight() -> u32 {
    1
}

fn default_max_extra_len() -> usize {
    10
}

fn default_any_depth() -> u32 {
    3
}

/// Tuning knobs for generator construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct GenerationConfig {
    /// Candidates drawn before the acceptance breaker may trip.
    #[serde(default = "default_min_trials")]
    pub min_trials: u64,
    /// Lowest tolerated ratio of accepted to drawn candidates.
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,
    /// Relative weight of the inner value for optional, nullable and defaulted schemas.
    #[serde(default = "default_present_weight")]
    pub present_weight: u32,
    /// Relative weight of the absent marker for optional, nullable and defaulted schemas.
    #[serde(default = "default_absent_weight")]
    pub absent_weight: u32,
    /// Extra length allowed above the minimum when no maximum is declared.
    #[serde(default = "default_max_extra_len")]
    pub max_extra_len: usize,
    /// Container nesting depth for arbitrary values.
    #[serde(default = "default_any_depth")]
    pub any_depth: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_trials: default_min_trials(),
            min_success_rate: default_min_success_rate(),
            present_weight: default_present_weight(),
            absent_weight: default_absent_weight(),
            max_extra_len: default_max_extra_len(),
            any_depth: default_any_depth(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_trials < 1 {
            return Err("min-trials must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err("min-success-rate must be between 0 and 1".to_string());
        }
        if self.present_weight < 1 {
            return Err("present-weight must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Strategy over values `schema` accepts, using a compiler without overrides.
pub fn input_of(schema: &Schema) -> Result<ValueStrategy, ArbitraryError> {
    Compiler::new().input_of(schema)
}

/// Strategy over values `schema` produces, using a compiler without overrides.
pub fn output_of(schema: &Schema) -> Result<ValueStrategy, ArbitraryError> {
    Compiler::new().output_of(schema)
}
