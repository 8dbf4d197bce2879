//! Capability resolution
//!
//! Maps a capability contract to the concrete type implementing it, by
//! naming convention, and validates that type's contract and invocation
//! method. Resolution is a pure function of the symbol table; recursion into
//! a component's own dependency contract is driven by the graph builder.

use tracing::trace;

use crate::contract::{self, Satisfaction};
use crate::conventions::Conventions;
use crate::error::{CompileError, Result};
use crate::symbols::{InterfaceDecl, MethodSig, QualifiedName, SymbolTable, TypeRef};

/// A capability bound to its validated implementation
#[derive(Debug, Clone)]
pub struct Resolution {
    pub capability: QualifiedName,
    pub implementation: QualifiedName,
    pub invocation: MethodSig,
    /// Dependency contract taken as the second invocation argument
    pub bundle: Option<QualifiedName>,
}

pub struct Resolver<'a, T: SymbolTable + ?Sized> {
    table: &'a T,
    conventions: &'a Conventions,
}

impl<'a, T: SymbolTable + ?Sized> Resolver<'a, T> {
    pub fn new(table: &'a T, conventions: &'a Conventions) -> Self {
        Self { table, conventions }
    }

    pub fn table(&self) -> &'a T {
        self.table
    }

    /// Look up a capability contract, failing if the symbol is something else
    pub fn interface(&self, name: &QualifiedName) -> Result<&'a InterfaceDecl> {
        let symbol = self
            .table
            .lookup(name)
            .ok_or_else(|| CompileError::SymbolNotFound {
                package: name.package.clone(),
                name: name.name.clone(),
            })?;
        symbol
            .as_interface()
            .ok_or_else(|| CompileError::NotAnInterface {
                name: name.to_string(),
            })
    }

    /// Resolve one capability to its implementation
    pub fn resolve(&self, capability: &QualifiedName) -> Result<Resolution> {
        let contract = self.interface(capability)?;

        let implementation =
            capability.sibling(self.conventions.implementation_name(&capability.name));
        let candidate = self
            .table
            .lookup(&implementation)
            .and_then(|s| s.as_type())
            .ok_or_else(|| CompileError::ImplementationNotFound {
                capability: capability.to_string(),
                implementation: implementation.to_string(),
            })?;
        trace!(%capability, %implementation, "found implementation");

        match contract::check(self.table, contract, candidate) {
            Satisfaction::Satisfied => {}
            Satisfaction::MissingMethod(method) => {
                return Err(CompileError::ImplementationIncomplete {
                    capability: capability.to_string(),
                    implementation: implementation.to_string(),
                    method,
                });
            }
            Satisfaction::SignatureMismatch(method) => {
                return Err(CompileError::ImplementationMismatched {
                    capability: capability.to_string(),
                    implementation: implementation.to_string(),
                    method,
                });
            }
        }

        let method = &self.conventions.invocation_method;
        let invocation = candidate
            .method_set()
            .find(|m| &m.name == method)
            .ok_or_else(|| CompileError::NoInvocationMethod {
                implementation: implementation.to_string(),
                method: method.clone(),
            })?;

        let bundle = self.validate_invocation(&implementation, invocation)?;

        Ok(Resolution {
            capability: capability.clone(),
            implementation,
            invocation: invocation.clone(),
            bundle,
        })
    }

    /// Check arity and parameter types, returning the dependency contract
    fn validate_invocation(
        &self,
        implementation: &QualifiedName,
        invocation: &MethodSig,
    ) -> Result<Option<QualifiedName>> {
        let invalid = |reason: String| CompileError::InvalidSignature {
            implementation: implementation.to_string(),
            method: invocation.name.clone(),
            reason,
        };

        let (request, deps) = match invocation.params.as_slice() {
            [request] => (request, None),
            [request, deps] => (request, Some(deps)),
            _ => return Err(invalid("method should have one or two params".to_string())),
        };

        // Every step borrows the same request, so only `&Request` will do
        let request_type = &self.conventions.request_type;
        let borrowed = match &request.ty {
            TypeRef::Ref {
                mutable: false,
                inner,
            } => inner.path(),
            _ => None,
        };
        if borrowed.as_deref() != Some(request_type.as_str()) {
            return Err(invalid(format!(
                "should accept a &{} as its first argument, got {}",
                request_type, request.ty
            )));
        }

        let Some(deps) = deps else {
            return Ok(None);
        };
        let bundle = match deps.ty.nominal() {
            TypeRef::Declared(name)
                if self
                    .table
                    .lookup(name)
                    .is_some_and(|s| s.as_interface().is_some()) =>
            {
                name.clone()
            }
            other => {
                return Err(invalid(format!(
                    "second argument should be a middleware interface stack, got {other}"
                )));
            }
        };
        Ok(Some(bundle))
    }
}
