//! Method registry with dot-separated prefix routing.
//!
//! A registry maps method names to handlers and can have further registries
//! attached under a prefix: a registry attached as `math` exposes its
//! `add` method as `math.add`. Registration is explicit and happens at
//! startup; there is no dynamic class loading by name.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate registration of method: {0}")]
    DuplicateMethod(String),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("prefix {0:?} is already in use by another registry")]
    PrefixInUse(String),
}

/// A name-to-handler map with attached sub-registries.
#[derive(Debug)]
pub struct MethodRegistry<H> {
    methods: HashMap<String, H>,
    attached: Vec<(String, MethodRegistry<H>)>,
}

impl<H> Default for MethodRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> MethodRegistry<H> {
    pub fn new() -> Self {
        Self { methods: HashMap::new(), attached: Vec::new() }
    }

    /// Register a handler under a method name. Duplicate names are an error
    /// rather than a silent overwrite.
    pub fn register(&mut self, name: impl Into<String>, handler: H) -> Result<(), RegistryError> {
        let name = name.into();
        if self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod(name));
        }
        self.methods.insert(name, handler);
        Ok(())
    }

    /// Attach another registry under the given dot-separated prefix.
    ///
    /// The attached registry's methods become reachable as
    /// `prefix.method`.
    pub fn attach(&mut self, prefix: &str, registry: MethodRegistry<H>) -> Result<(), RegistryError> {
        if !valid_prefix(prefix) {
            return Err(RegistryError::InvalidPrefix(prefix.to_string()));
        }

        let prefix = format!("{prefix}.");
        if self.attached.iter().any(|(existing, _)| *existing == prefix) {
            return Err(RegistryError::PrefixInUse(prefix));
        }

        self.attached.push((prefix, registry));
        Ok(())
    }

    /// Look up the handler for a method name, resolving through attached
    /// registries. Returns `None` when no handler matches.
    pub fn route(&self, method: &str) -> Option<&H> {
        if let Some(handler) = self.methods.get(method) {
            return Some(handler);
        }

        for (prefix, registry) in &self.attached {
            if let Some(rest) = method.strip_prefix(prefix.as_str()) {
                return registry.route(rest);
            }
        }

        None
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.attached.is_empty()
    }
}

/// A prefix is one or more non-empty segments separated by dots.
fn valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.split('.').all(|segment| !segment.is_empty())
}
