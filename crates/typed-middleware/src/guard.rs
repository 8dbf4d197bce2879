//! Per-compile resolution state
//!
//! One `ResolutionState` exists per compile and is threaded by `&mut`
//! through the recursive descent. It owns the component cache and the stack
//! of capabilities currently being resolved on the active call path.

use std::collections::HashMap;

use crate::error::{CompileError, Result};
use crate::graph::ComponentId;
use crate::symbols::QualifiedName;

#[derive(Debug, Default)]
pub struct ResolutionState {
    resolved: HashMap<QualifiedName, ComponentId>,
    in_progress: Vec<QualifiedName>,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Component already resolved earlier in this compile
    pub fn cached(&self, key: &QualifiedName) -> Option<ComponentId> {
        self.resolved.get(key).copied()
    }

    pub fn is_in_progress(&self, key: &QualifiedName) -> bool {
        self.in_progress.contains(key)
    }

    /// Mark `key` as being resolved on the current path
    ///
    /// Fails when `key` is already on the path: the reference closes a cycle.
    pub fn enter(&mut self, key: &QualifiedName) -> Result<()> {
        if let Some(start) = self.in_progress.iter().position(|k| k == key) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(ToString::to_string)
                .collect();
            chain.push(key.to_string());
            return Err(CompileError::CyclicDependency {
                capability: key.to_string(),
                chain,
            });
        }
        self.in_progress.push(key.clone());
        Ok(())
    }

    /// Clear the marker for `key`, whether its resolution succeeded or not
    pub fn leave(&mut self, key: &QualifiedName) {
        if let Some(pos) = self.in_progress.iter().rposition(|k| k == key) {
            self.in_progress.remove(pos);
        }
    }

    pub fn remember(&mut self, key: QualifiedName, id: ComponentId) {
        self.resolved.insert(key, id);
    }

    /// Current resolution path, outermost first
    pub fn path(&self) -> &[QualifiedName] {
        &self.in_progress
    }
}
