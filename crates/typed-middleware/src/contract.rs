//! Structural capability satisfaction
//!
//! A capability is satisfied when the candidate type's method set carries
//! every required method with an exactly matching signature. Required
//! methods include those of every capability contract the capability embeds.

use std::collections::HashSet;

use crate::symbols::{InterfaceDecl, MethodSig, QualifiedName, SymbolTable, TypeDecl, TypeRef};

/// Outcome of checking a type against a capability contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Satisfaction {
    Satisfied,
    MissingMethod(String),
    SignatureMismatch(String),
}

/// Every method a capability requires, embedded contracts included
///
/// Methods are returned in declaration order, own methods first; each
/// embedded contract is visited once so cyclic embeddings terminate.
pub fn required_methods<'t, T>(table: &'t T, interface: &'t InterfaceDecl) -> Vec<&'t MethodSig>
where
    T: SymbolTable + ?Sized,
{
    let mut seen: HashSet<&QualifiedName> = HashSet::new();
    let mut methods = Vec::new();
    collect_methods(table, interface, &mut seen, &mut methods);
    methods
}

fn collect_methods<'t, T>(
    table: &'t T,
    interface: &'t InterfaceDecl,
    seen: &mut HashSet<&'t QualifiedName>,
    methods: &mut Vec<&'t MethodSig>,
) where
    T: SymbolTable + ?Sized,
{
    for method in &interface.methods {
        if !methods.iter().any(|m: &&MethodSig| m.name == method.name) {
            methods.push(method);
        }
    }
    for embed in &interface.embeds {
        let TypeRef::Declared(name) = embed else {
            continue;
        };
        if !seen.insert(name) {
            continue;
        }
        if let Some(embedded) = table.lookup(name).and_then(|s| s.as_interface()) {
            collect_methods(table, embedded, seen, methods);
        }
    }
}

/// Check a candidate type against a capability contract
pub fn check<T>(table: &T, interface: &InterfaceDecl, candidate: &TypeDecl) -> Satisfaction
where
    T: SymbolTable + ?Sized,
{
    for required in required_methods(table, interface) {
        if let Some(found) = candidate.method_set().find(|m| m.name == required.name) {
            if !found.same_signature(required) {
                return Satisfaction::SignatureMismatch(required.name.clone());
            }
            continue;
        }
        // Declared with another receiver: present, but the wrong shape
        if candidate.declared(&required.name).is_some() {
            return Satisfaction::SignatureMismatch(required.name.clone());
        }
        return Satisfaction::MissingMethod(required.name.clone());
    }
    Satisfaction::Satisfied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{InMemorySymbolTable, Receiver};

    fn token() -> MethodSig {
        MethodSig::new("token").returns(TypeRef::external("String"))
    }

    fn client_id() -> MethodSig {
        MethodSig::new("client_id").returns(TypeRef::opaque("u64"))
    }

    #[test]
    fn test_satisfied_with_extra_methods() {
        let table = InMemorySymbolTable::new();
        let iface = InterfaceDecl::new().method(token());
        let candidate = TypeDecl::new()
            .method(token())
            .method(MethodSig::new("run"));

        assert_eq!(check(&table, &iface, &candidate), Satisfaction::Satisfied);
    }

    #[test]
    fn test_missing_method_is_named() {
        let table = InMemorySymbolTable::new();
        let iface = InterfaceDecl::new().method(token()).method(client_id());
        let candidate = TypeDecl::new().method(token());

        assert_eq!(
            check(&table, &iface, &candidate),
            Satisfaction::MissingMethod("client_id".to_string())
        );
    }

    #[test]
    fn test_signature_mismatch_is_named() {
        let table = InMemorySymbolTable::new();
        let iface = InterfaceDecl::new().method(token());
        let candidate =
            TypeDecl::new().method(MethodSig::new("token").returns(TypeRef::opaque("&str")));

        assert_eq!(
            check(&table, &iface, &candidate),
            Satisfaction::SignatureMismatch("token".to_string())
        );
    }

    #[test]
    fn test_wrong_receiver_is_a_mismatch() {
        let table = InMemorySymbolTable::new();
        let iface = InterfaceDecl::new().method(token());
        let candidate = TypeDecl::new().method(token().receiver(Receiver::Value));

        assert_eq!(
            check(&table, &iface, &candidate),
            Satisfaction::SignatureMismatch("token".to_string())
        );
    }

    #[test]
    fn test_embedded_contract_methods_are_required() {
        let mut table = InMemorySymbolTable::new();
        table.interface("self", "HasToken", InterfaceDecl::new().method(token()));
        let iface = InterfaceDecl::new()
            .embed(TypeRef::declared("self", "HasToken"))
            .method(client_id());

        let names: Vec<_> = required_methods(&table, &iface)
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["client_id", "token"]);

        let candidate = TypeDecl::new().method(client_id());
        assert_eq!(
            check(&table, &iface, &candidate),
            Satisfaction::MissingMethod("token".to_string())
        );
    }

    #[test]
    fn test_cyclic_embedding_terminates() {
        let mut table = InMemorySymbolTable::new();
        table
            .interface(
                "self",
                "A",
                InterfaceDecl::new()
                    .embed(TypeRef::declared("self", "B"))
                    .method(token()),
            )
            .interface(
                "self",
                "B",
                InterfaceDecl::new().embed(TypeRef::declared("self", "A")),
            );
        let a = table
            .lookup(&QualifiedName::new("self", "A"))
            .and_then(|s| s.as_interface())
            .unwrap();

        assert_eq!(required_methods(&table, a).len(), 1);
    }
}
