//! Rust source front-end
//!
//! Reads one source file with `syn` and describes it as a symbol table.
//! Traits become capability contracts whose supertraits are their embeds;
//! structs, enums and unions become types carrying the methods of every
//! inherent and trait `impl` block in the file.

mod scope;

pub use scope::{ItemClass, ModuleIndex, render};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quote::format_ident;
use syn::{
    FnArg, Ident, ImplItem, Item, ItemImpl, ItemTrait, Pat, PatIdent, ReturnType, Signature,
    TraitBoundModifier, TraitItem, Type, TypeParamBound,
};
use tracing::debug;
use typed_middleware::{
    InMemorySymbolTable, InterfaceDecl, MethodSig, Param, QualifiedName, ROOT_PACKAGE, Receiver,
    SymbolKind, TypeDecl, TypeRef,
};

/// Read and describe a source file
pub fn load_file(path: &Path) -> Result<InMemorySymbolTable> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read source: {}", path.display()))?;

    parse_source(&content).context(format!("Failed to parse source: {}", path.display()))
}

/// Describe Rust source text; the file's top level is package `self`
pub fn parse_source(content: &str) -> syn::Result<InMemorySymbolTable> {
    let file = syn::parse_file(content)?;
    let index = ModuleIndex::collect(&file.items);

    let mut builder = TableBuilder::new(&index);
    builder.visit(ROOT_PACKAGE, &file.items);
    Ok(builder.finish())
}

struct TableBuilder<'a> {
    index: &'a ModuleIndex,
    table: InMemorySymbolTable,
    types: BTreeMap<QualifiedName, TypeDecl>,
    /// Methods from impl blocks, keyed by the implementing type
    impls: BTreeMap<QualifiedName, Vec<MethodSig>>,
}

impl<'a> TableBuilder<'a> {
    fn new(index: &'a ModuleIndex) -> Self {
        let mut table = InMemorySymbolTable::new();
        for package in index.packages() {
            table.package(package);
        }

        Self {
            index,
            table,
            types: BTreeMap::new(),
            impls: BTreeMap::new(),
        }
    }

    fn visit(&mut self, package: &str, items: &[Item]) {
        for item in items {
            match item {
                Item::Trait(t) => self.declare_trait(package, t),
                Item::Struct(s) => self.declare_type(package, &s.ident),
                Item::Enum(e) => self.declare_type(package, &e.ident),
                Item::Union(u) => self.declare_type(package, &u.ident),
                Item::Type(alias) => {
                    self.table.insert(
                        QualifiedName::new(package, alias.ident.to_string()),
                        SymbolKind::Other,
                    );
                }
                Item::Impl(imp) => self.collect_impl(package, imp),
                Item::Mod(m) => match &m.content {
                    Some((_, content)) => self.visit(&format!("{package}::{}", m.ident), content),
                    None => debug!(module = %m.ident, "skipping out-of-line module"),
                },
                _ => {}
            }
        }
    }

    fn declare_trait(&mut self, package: &str, item: &ItemTrait) {
        let mut decl = InterfaceDecl::new();

        for bound in &item.supertraits {
            if let TypeParamBound::Trait(bound) = bound
                && !matches!(bound.modifier, TraitBoundModifier::Maybe(_))
            {
                decl = decl.embed(self.index.path_ref(package, &bound.path));
            }
        }
        for trait_item in &item.items {
            if let TraitItem::Fn(f) = trait_item {
                decl = decl.method(method_sig(self.index, package, &f.sig));
            }
        }

        self.table.interface(package, &item.ident.to_string(), decl);
    }

    fn declare_type(&mut self, package: &str, ident: &Ident) {
        let name = QualifiedName::new(package, ident.to_string());
        self.types.insert(name, TypeDecl::new());
    }

    fn collect_impl(&mut self, package: &str, imp: &ItemImpl) {
        let (TypeRef::Declared(target) | TypeRef::Generic { base: target, .. }) =
            self.index.type_ref(package, &imp.self_ty)
        else {
            debug!(package, "skipping impl for a type declared elsewhere");
            return;
        };

        let methods: Vec<MethodSig> = imp
            .items
            .iter()
            .filter_map(|item| match item {
                ImplItem::Fn(f) => Some(method_sig(self.index, package, &f.sig)),
                _ => None,
            })
            .collect();
        self.impls.entry(target).or_default().extend(methods);
    }

    fn finish(mut self) -> InMemorySymbolTable {
        for (name, mut decl) in std::mem::take(&mut self.types) {
            if let Some(methods) = self.impls.remove(&name) {
                decl.methods.extend(methods);
            }
            self.table.insert(name, SymbolKind::Type(decl));
        }
        for name in self.impls.keys() {
            debug!(%name, "dropping methods of a name that is not a type");
        }
        self.table
    }
}

/// Describe a signature, naming pattern parameters `argN`
fn method_sig(index: &ModuleIndex, package: &str, sig: &Signature) -> MethodSig {
    let mut method = MethodSig::new(sig.ident.to_string()).receiver(receiver(sig));
    let mut rendered = sig.clone();

    for (position, input) in rendered.inputs.iter_mut().enumerate() {
        let FnArg::Typed(arg) = input else {
            continue;
        };
        let ident = match &*arg.pat {
            Pat::Ident(p) => p.ident.clone(),
            _ => format_ident!("arg{}", position),
        };
        *arg.pat = Pat::Ident(PatIdent {
            attrs: Vec::new(),
            by_ref: None,
            mutability: None,
            ident: ident.clone(),
            subpat: None,
        });

        let param = Param::new(ident.to_string(), index.type_ref(package, &arg.ty))
            .with_rendered(render(&*arg.ty));
        method.params.push(param);
    }

    if let ReturnType::Type(_, ty) = &sig.output {
        method = method.returns(index.type_ref(package, ty));
    }
    method.rendered(render(&rendered))
}

fn receiver(sig: &Signature) -> Receiver {
    let Some(r) = sig.receiver() else {
        return Receiver::None;
    };
    if r.reference.is_some() {
        return if r.mutability.is_some() {
            Receiver::RefMut
        } else {
            Receiver::Ref
        };
    }
    match &*r.ty {
        Type::Reference(reference) if r.colon_token.is_some() => {
            if reference.mutability.is_some() {
                Receiver::RefMut
            } else {
                Receiver::Ref
            }
        }
        _ => Receiver::Value,
    }
}
