//! Pipeline assembly
//!
//! Turns an ordered graph into a serializable description of invocation
//! steps. Nothing here executes; a code generator emits the description as
//! source, or [`crate::runtime::Executor`] interprets it directly.

use serde::Serialize;
use tracing::debug;

use crate::graph::{ComponentId, DependencyGraph};
use crate::runtime::Outcome;
use crate::symbols::QualifiedName;

/// What the pipeline does after a step reports an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Run the next step, or succeed after the last one
    Continue,
    /// Stop and return the step's early response as the override result
    ReturnOverride,
    /// Stop and return the step's error wrapped as an error response
    ReturnWrappedError,
}

/// Short-circuit contract applied to every step's `(early_response, error)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShortCircuit {
    pub on_early_response: Transition,
    pub on_error: Transition,
}

impl Default for ShortCircuit {
    fn default() -> Self {
        Self {
            on_early_response: Transition::ReturnOverride,
            on_error: Transition::ReturnWrappedError,
        }
    }
}

impl ShortCircuit {
    /// An early response takes precedence over an error
    pub fn evaluate(&self, outcome: &Outcome) -> Transition {
        if outcome.early_response.is_some() {
            self.on_early_response
        } else if outcome.error.is_some() {
            self.on_error
        } else {
            Transition::Continue
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub position: usize,
    pub component: ComponentId,
    /// Capability key of the invoked component
    pub capability: String,
    pub implementation: QualifiedName,
    /// Whether the invocation receives the dependency bundle
    pub pass_bundle: bool,
    pub bundle: Option<QualifiedName>,
    pub short_circuit: ShortCircuit,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineDescription {
    /// Composition root the pipeline realizes
    pub target: QualifiedName,
    pub steps: Vec<Step>,
}

impl PipelineDescription {
    pub fn step(&self, capability: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.capability == capability)
    }

    /// Capability keys in invocation order
    pub fn invocation_order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.capability.as_str()).collect()
    }
}

/// One step per ordered component
pub fn assemble(graph: &DependencyGraph, order: &[ComponentId]) -> PipelineDescription {
    let steps: Vec<Step> = order
        .iter()
        .filter_map(|id| graph.get(*id))
        .enumerate()
        .map(|(position, component)| Step {
            position,
            component: component.id,
            capability: component.key(),
            implementation: component.implementation.clone(),
            pass_bundle: component.takes_bundle(),
            bundle: component.bundle.clone(),
            short_circuit: ShortCircuit::default(),
        })
        .collect();

    debug!(target = %graph.root, steps = steps.len(), "assembled pipeline");
    PipelineDescription {
        target: graph.root.clone(),
        steps,
    }
}
