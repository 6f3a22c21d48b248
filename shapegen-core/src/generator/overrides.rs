use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{Compiler, ValueStrategy};
use crate::error::ArbitraryError;
use crate::schema::SchemaId;

/// Builds a replacement generator from the compiler that resolved it.
pub type OverrideFactory =
    Arc<dyn Fn(&Compiler) -> Result<ValueStrategy, ArbitraryError> + Send + Sync>;

/// Caller-supplied replacement for one schema node.
#[derive(Clone)]
pub(crate) enum Override {
    Strategy(ValueStrategy),
    Factory(OverrideFactory),
}

impl Override {
    pub(crate) fn build(&self, compiler: &Compiler) -> Result<ValueStrategy, ArbitraryError> {
        match self {
            Override::Strategy(strategy) => Ok(strategy.clone()),
            Override::Factory(factory) => factory(compiler),
        }
    }
}

impl fmt::Debug for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Override::Strategy(_) => f.write_str("Strategy(..)"),
            Override::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Identity-keyed overrides shared between derived compilers.
///
/// Registrations form a persistent list: each compiler points at its newest
/// entry, and derived compilers share every older entry. Lookups return the
/// newest registration for an id.
#[derive(Clone, Default)]
pub(crate) struct OverrideRegistry {
    head: Option<Arc<Entry>>,
}

struct Entry {
    id: SchemaId,
    replacement: Override,
    next: Option<Arc<Entry>>,
}

impl OverrideRegistry {
    pub(crate) fn with(&self, id: SchemaId, replacement: Override) -> Self {
        Self {
            head: Some(Arc::new(Entry {
                id,
                replacement,
                next: self.head.clone(),
            })),
        }
    }

    pub(crate) fn resolve(&self, id: SchemaId) -> Option<&Override> {
        self.entries()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.replacement)
    }

    /// Number of distinct schemas with an override.
    pub(crate) fn len(&self) -> usize {
        self.entries()
            .map(|entry| entry.id)
            .collect::<HashSet<_>>()
            .len()
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        std::iter::successors(self.head.as_deref(), |entry| entry.next.as_deref())
    }
}

impl fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries().map(|entry| (entry.id, &entry.replacement)))
            .finish()
    }
}
