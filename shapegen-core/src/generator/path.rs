use std::fmt;

/// Structural location of a sub-schema, used only in diagnostics.
///
/// The root is the empty path and renders as `.`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Path(String);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// The raw path text; empty at the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// A declared object property: `.name`.
    pub fn property(&self, name: &str) -> Self {
        self.join(&format!(".{name}"))
    }

    /// Any element of a collection: `[*]`.
    pub fn element(&self) -> Self {
        self.join("[*]")
    }

    /// A positional tuple slot: `[n]`.
    pub fn index(&self, index: usize) -> Self {
        self.join(&format!("[{index}]"))
    }

    pub fn key(&self) -> Self {
        self.join(".(key)")
    }

    pub fn value(&self) -> Self {
        self.join(".(value)")
    }

    pub fn return_type(&self) -> Self {
        self.join(".(return type)")
    }

    pub fn resolved_type(&self) -> Self {
        self.join(".(resolved type)")
    }

    fn join(&self, segment: &str) -> Self {
        let mut next = String::with_capacity(self.0.len() + segment.len());
        next.push_str(&self.0);
        next.push_str(segment);
        Self(next)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.0)
        }
    }
}
