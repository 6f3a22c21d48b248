//! Rejection sampling with a running acceptance-rate breaker.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use proptest::strategy::{NewTree, SBoxedStrategy, Strategy, ValueTree};
use proptest::test_runner::TestRunner;

use super::Path;
use crate::error::ArbitraryError;
use crate::GenerationConfig;

/// Trial and success counts for one monitored strategy instance.
#[derive(Debug, Default)]
pub(crate) struct SuccessRate {
    trials: AtomicU64,
    successes: AtomicU64,
}

impl SuccessRate {
    fn record(&self, accepted: bool) -> (u64, u64) {
        let trials = self.trials.fetch_add(1, Ordering::Relaxed) + 1;
        let successes = if accepted {
            self.successes.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.successes.load(Ordering::Relaxed)
        };
        (trials, successes)
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> (u64, u64) {
        (
            self.trials.load(Ordering::Relaxed),
            self.successes.load(Ordering::Relaxed),
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Breaker {
    min_trials: u64,
    min_success_rate: f64,
}

impl Breaker {
    fn tripped(&self, trials: u64, successes: u64) -> bool {
        trials >= self.min_trials && (successes as f64) < self.min_success_rate * trials as f64
    }
}

/// Filters `source` through `accept`, failing once the acceptance rate collapses.
///
/// `accept` maps a candidate to the value to yield, or `None` to reject it.
/// Counters live as long as the returned strategy and are never reset.
pub(crate) fn monitored<S, F, O>(
    source: S,
    path: Path,
    config: &GenerationConfig,
    accept: F,
) -> SBoxedStrategy<O>
where
    S: Strategy + Send + Sync + 'static,
    F: Fn(S::Value) -> Option<O> + Send + Sync + 'static,
    O: fmt::Debug + Clone + 'static,
{
    Monitored::new(source, path, config, accept).sboxed()
}

pub(crate) struct Monitored<S, F> {
    source: S,
    accept: Arc<F>,
    path: Path,
    breaker: Breaker,
    stats: Arc<SuccessRate>,
}

impl<S, F> Monitored<S, F> {
    pub(crate) fn new(source: S, path: Path, config: &GenerationConfig, accept: F) -> Self {
        Self {
            source,
            accept: Arc::new(accept),
            path,
            breaker: Breaker {
                min_trials: config.min_trials,
                min_success_rate: config.min_success_rate,
            },
            stats: Arc::new(SuccessRate::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn stats(&self) -> Arc<SuccessRate> {
        Arc::clone(&self.stats)
    }
}

impl<S: fmt::Debug, F> fmt::Debug for Monitored<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitored")
            .field("source", &self.source)
            .field("path", &self.path)
            .field("breaker", &self.breaker)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<S, F, O> Strategy for Monitored<S, F>
where
    S: Strategy,
    F: Fn(S::Value) -> Option<O>,
    O: fmt::Debug + Clone,
{
    type Tree = MonitoredTree<S::Tree, F, O>;
    type Value = O;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        loop {
            let source = self.source.new_tree(runner)?;
            let accepted = (self.accept)(source.current());
            let (trials, successes) = self.stats.record(accepted.is_some());
            if self.breaker.tripped(trials, successes) {
                let error = ArbitraryError::GenerationInfeasible {
                    path: self.path.clone(),
                    trials,
                    successes,
                };
                log::debug!("acceptance breaker tripped: {error}");
                return Err(error.to_string().into());
            }
            if let Some(current) = accepted {
                return Ok(MonitoredTree {
                    source,
                    accept: Arc::clone(&self.accept),
                    current,
                });
            }
        }
    }
}

/// Value tree that only ever exposes accepted values while shrinking.
pub(crate) struct MonitoredTree<T, F, O> {
    source: T,
    accept: Arc<F>,
    current: O,
}

impl<T, F, O> MonitoredTree<T, F, O>
where
    T: ValueTree,
    F: Fn(T::Value) -> Option<O>,
{
    fn settle(&mut self) -> bool {
        loop {
            if let Some(current) = (self.accept)(self.source.current()) {
                self.current = current;
                return true;
            }
            if !self.source.complicate() {
                return false;
            }
        }
    }
}

impl<T: fmt::Debug, F, O: fmt::Debug> fmt::Debug for MonitoredTree<T, F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoredTree")
            .field("source", &self.source)
            .field("current", &self.current)
            .finish()
    }
}

impl<T, F, O> ValueTree for MonitoredTree<T, F, O>
where
    T: ValueTree,
    F: Fn(T::Value) -> Option<O>,
    O: fmt::Debug + Clone,
{
    type Value = O;

    fn current(&self) -> O {
        self.current.clone()
    }

    fn simplify(&mut self) -> bool {
        self.source.simplify() && self.settle()
    }

    fn complicate(&mut self) -> bool {
        self.source.complicate() && self.settle()
    }
}
