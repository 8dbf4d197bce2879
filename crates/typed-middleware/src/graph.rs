//! Dependency graph construction
//!
//! Components live in an arena indexed by [`ComponentId`]; edges point from a
//! component to the components its invocation depends on. Ids are assigned
//! when a component finishes resolving, so a component's dependencies always
//! carry smaller ids than the component itself.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::conventions::Conventions;
use crate::error::{CompileError, Result};
use crate::guard::ResolutionState;
use crate::resolver::{Resolution, Resolver};
use crate::symbols::{MethodSig, QualifiedName, SymbolTable, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentId(pub usize);

/// A resolved capability implementation
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub id: ComponentId,
    /// Capability this component satisfies; also its identity key
    pub capability: QualifiedName,
    pub implementation: QualifiedName,
    pub invocation: MethodSig,
    /// Dependency contract passed as the second invocation argument
    pub bundle: Option<QualifiedName>,
    pub dependencies: Vec<ComponentId>,
}

impl Component {
    pub fn key(&self) -> String {
        self.capability.to_string()
    }

    pub fn takes_bundle(&self) -> bool {
        self.bundle.is_some()
    }
}

/// Every component reachable from a composition root
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub root: QualifiedName,
    /// Components the root requires directly, in declaration order
    pub direct: Vec<ComponentId>,
    components: Vec<Component>,
    #[serde(skip)]
    by_key: HashMap<QualifiedName, ComponentId>,
}

impl DependencyGraph {
    pub fn new(root: QualifiedName) -> Self {
        Self {
            root,
            direct: Vec::new(),
            components: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Add a component and its outgoing edges, returning its id
    ///
    /// Adding a capability that is already present returns the existing id.
    pub fn add(&mut self, resolution: Resolution, dependencies: Vec<ComponentId>) -> ComponentId {
        if let Some(id) = self.by_key.get(&resolution.capability) {
            return *id;
        }
        let id = ComponentId(self.components.len());
        self.by_key.insert(resolution.capability.clone(), id);
        self.components.push(Component {
            id,
            capability: resolution.capability,
            implementation: resolution.implementation,
            invocation: resolution.invocation,
            bundle: resolution.bundle,
            dependencies,
        });
        id
    }

    /// Replace a component's outgoing edges
    pub fn set_dependencies(&mut self, id: ComponentId, dependencies: Vec<ComponentId>) {
        if let Some(component) = self.components.get_mut(id.0) {
            component.dependencies = dependencies;
        }
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    pub fn find(&self, capability: &QualifiedName) -> Option<&Component> {
        self.by_key.get(capability).and_then(|id| self.get(*id))
    }

    /// Components in discovery order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Direct dependency ids of a component
    pub fn adjacent(&self, id: ComponentId) -> &[ComponentId] {
        self.get(id).map_or(&[], |c| c.dependencies.as_slice())
    }

    /// Adjacency by key: component → its direct dependencies
    pub fn adjacency(&self) -> Vec<(String, Vec<String>)> {
        self.components
            .iter()
            .map(|c| {
                let deps = c
                    .dependencies
                    .iter()
                    .filter_map(|d| self.get(*d))
                    .map(Component::key)
                    .collect();
                (c.key(), deps)
            })
            .collect()
    }
}

/// Recursive graph construction over one resolver and one resolution state
pub struct GraphBuilder<'a, T: SymbolTable + ?Sized> {
    resolver: Resolver<'a, T>,
    state: ResolutionState,
}

impl<'a, T: SymbolTable + ?Sized> GraphBuilder<'a, T> {
    pub fn new(table: &'a T, conventions: &'a Conventions) -> Self {
        Self {
            resolver: Resolver::new(table, conventions),
            state: ResolutionState::new(),
        }
    }

    /// Build the graph of everything reachable from `root`
    pub fn build(mut self, root: &QualifiedName) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new(root.clone());
        graph.direct = self.resolve_stack(root, &mut graph)?;
        debug!(root = %root, components = graph.len(), "built dependency graph");
        Ok(graph)
    }

    /// Resolve every capability embedded in a composition contract
    fn resolve_stack(
        &mut self,
        stack: &QualifiedName,
        graph: &mut DependencyGraph,
    ) -> Result<Vec<ComponentId>> {
        let contract = self.resolver.interface(stack)?;
        let mut ids = Vec::new();

        for embed in &contract.embeds {
            let TypeRef::Declared(capability) = embed else {
                debug!(%stack, embed = %embed, "skipping embed outside the symbol table");
                continue;
            };
            let symbol = self.resolver.interface(capability);
            if let Err(CompileError::NotAnInterface { .. }) = symbol {
                debug!(%stack, %capability, "skipping embed that is not a capability");
                continue;
            }
            symbol?;

            let id = self.resolve_component(capability, graph)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn resolve_component(
        &mut self,
        capability: &QualifiedName,
        graph: &mut DependencyGraph,
    ) -> Result<ComponentId> {
        self.state.enter(capability)?;
        if let Some(id) = self.state.cached(capability) {
            self.state.leave(capability);
            return Ok(id);
        }

        let result = self.resolve_uncached(capability, graph);
        self.state.leave(capability);
        result
    }

    fn resolve_uncached(
        &mut self,
        capability: &QualifiedName,
        graph: &mut DependencyGraph,
    ) -> Result<ComponentId> {
        let resolution = self.resolver.resolve(capability)?;
        let dependencies = match &resolution.bundle {
            Some(bundle) => self.resolve_stack(bundle, graph)?,
            None => Vec::new(),
        };

        let id = graph.add(resolution, dependencies);
        self.state.remember(capability.clone(), id);
        debug!(%capability, id = id.0, "resolved component");
        Ok(id)
    }
}
