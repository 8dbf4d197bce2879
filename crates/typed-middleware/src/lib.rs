//! Compiles a middleware stack contract into an ordered, short-circuiting
//! pipeline.
//!
//! A stack is a capability contract whose embedded contracts name the
//! middleware a handler needs. Each capability `Foo` is implemented by a type
//! `FooMiddleware` with a `run` method taking the request and, optionally, a
//! contract bundling its own dependencies. [`compile`] resolves everything
//! reachable from the stack, orders it so dependencies run first, and
//! assembles a [`PipelineDescription`] that a code generator emits or an
//! [`Executor`] interprets.

pub mod contract;
pub mod conventions;
pub mod error;
pub mod graph;
pub mod guard;
pub mod order;
pub mod pipeline;
pub mod resolver;
pub mod runtime;
pub mod symbols;

use serde::Serialize;
use tracing::{debug, info};

pub use conventions::Conventions;
pub use error::{CompileError, Result};
pub use graph::{Component, ComponentId, DependencyGraph, GraphBuilder};
pub use pipeline::{PipelineDescription, ShortCircuit, Step, Transition, assemble};
pub use resolver::{Resolution, Resolver};
pub use runtime::{
    BoxError, Bundle, Executor, Middleware, MiddlewareResponse, Outcome, ResponseSpec,
    WiringError,
};
pub use symbols::{
    InMemorySymbolTable, InterfaceDecl, MethodSig, Param, QualifiedName, ROOT_PACKAGE, Receiver,
    Symbol, SymbolKind, SymbolTable, TypeDecl, TypeRef,
};

/// Everything one compile produces
#[derive(Debug, Clone, Serialize)]
pub struct CompiledStack {
    pub graph: DependencyGraph,
    pub order: Vec<ComponentId>,
    pub pipeline: PipelineDescription,
}

impl CompiledStack {
    /// Components in invocation order
    pub fn ordered_components(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|id| self.graph.get(*id))
    }
}

/// Compile the stack contract `root` declared in package `scope`
pub fn compile<T>(
    table: &T,
    conventions: &Conventions,
    scope: &str,
    root: &str,
) -> Result<CompiledStack>
where
    T: SymbolTable + ?Sized,
{
    let packages = table.packages_matching(scope);
    let [package] = packages.as_slice() else {
        return Err(CompileError::DuplicatePackageLoad {
            scope: scope.to_string(),
            found: packages.len(),
        });
    };

    let root = QualifiedName::new(package.clone(), root);
    Resolver::new(table, conventions).interface(&root)?;
    debug!(%root, "compiling stack");

    let graph = GraphBuilder::new(table, conventions).build(&root)?;
    let order = order::order(&graph)?;
    let pipeline = assemble(&graph, &order);

    info!(%root, steps = pipeline.steps.len(), "compiled stack");
    Ok(CompiledStack {
        graph,
        order,
        pipeline,
    })
}
