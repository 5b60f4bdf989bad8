//! Tool registry: the name → spec mapping presented to the oracle
//!
//! Built once at startup and shared read-only (behind an `Arc`) afterwards;
//! only [`ToolRegistry::register`] takes `&mut self`.

use std::collections::HashMap;

use thiserror::Error;

use super::entities::ToolSpec;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Ordered registry of tool specs.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolSpec, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// All specs in registration order.
    pub fn list_specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
