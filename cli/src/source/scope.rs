//! Module index and path resolution for a single source file
//!
//! Every inline module becomes a package named by its path from the file
//! root (`self`, `self::auth`, ...). Paths are expanded through `self::`,
//! `super::` and `crate::` prefixes, `use` imports and local items; whatever
//! is left unresolved is treated as an external type.

use std::collections::HashMap;

use proc_macro2::TokenStream;
use quote::ToTokens;
use syn::{GenericArgument, Item, Path, PathArguments, Type, TypeParamBound, UseTree};
use tracing::trace;
use typed_middleware::{QualifiedName, ROOT_PACKAGE, TypeRef};

/// Expansion limit for chains of `use` imports
const MAX_IMPORT_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Trait,
    Type,
    Module,
    Other,
}

#[derive(Debug, Default)]
pub struct ModuleInfo {
    pub items: HashMap<String, ItemClass>,
    /// Imported name → path as written
    pub imports: HashMap<String, Vec<String>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Expanded {
    /// Absolute path starting at the file root
    Local(Vec<String>),
    External(Vec<String>),
}

/// Names declared and imported by every module of one file
#[derive(Debug, Default)]
pub struct ModuleIndex {
    modules: HashMap<String, ModuleInfo>,
}

impl ModuleIndex {
    pub fn collect(items: &[Item]) -> Self {
        let mut index = Self::default();
        index.collect_module(ROOT_PACKAGE, items);
        index
    }

    /// Packages in the file, one per module
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    fn collect_module(&mut self, package: &str, items: &[Item]) {
        let mut info = ModuleInfo::default();

        for item in items {
            match item {
                Item::Trait(t) => {
                    info.items.insert(t.ident.to_string(), ItemClass::Trait);
                }
                Item::Struct(s) => {
                    info.items.insert(s.ident.to_string(), ItemClass::Type);
                }
                Item::Enum(e) => {
                    info.items.insert(e.ident.to_string(), ItemClass::Type);
                }
                Item::Union(u) => {
                    info.items.insert(u.ident.to_string(), ItemClass::Type);
                }
                Item::Type(alias) => {
                    info.items.insert(alias.ident.to_string(), ItemClass::Other);
                }
                Item::Mod(m) => {
                    info.items.insert(m.ident.to_string(), ItemClass::Module);
                    if let Some((_, content)) = &m.content {
                        self.collect_module(&format!("{package}::{}", m.ident), content);
                    }
                }
                Item::Use(u) => flatten_use(&u.tree, Vec::new(), &mut info.imports),
                _ => {}
            }
        }

        self.modules.insert(package.to_string(), info);
    }

    pub fn class_of(&self, name: &QualifiedName) -> Option<ItemClass> {
        self.modules
            .get(&name.package)?
            .items
            .get(&name.name)
            .copied()
    }

    /// Resolve a type as written in `package`
    ///
    /// References keep their mutability and generic arguments are resolved
    /// too, so `&Wrap<u8>` and `Wrap<String>` stay distinct. Only the first
    /// trait of a `dyn`/`impl` bound list is recorded.
    pub fn type_ref(&self, package: &str, ty: &Type) -> TypeRef {
        match ty {
            Type::Reference(r) => {
                let inner = self.type_ref(package, &r.elem);
                if r.mutability.is_some() {
                    TypeRef::exclusive(inner)
                } else {
                    TypeRef::shared(inner)
                }
            }
            Type::Paren(p) => self.type_ref(package, &p.elem),
            Type::Group(g) => self.type_ref(package, &g.elem),
            Type::Path(p) if p.qself.is_none() => self.path_ref(package, &p.path),
            Type::TraitObject(t) => match first_trait(t.bounds.iter()) {
                Some(path) => TypeRef::dyn_trait(self.path_ref(package, path)),
                None => TypeRef::opaque(render(ty)),
            },
            Type::ImplTrait(t) => match first_trait(t.bounds.iter()) {
                Some(path) => TypeRef::Impl(Box::new(self.path_ref(package, path))),
                None => TypeRef::opaque(render(ty)),
            },
            _ => TypeRef::opaque(render(ty)),
        }
    }

    /// Resolve a nominal path as written in `package`
    pub fn path_ref(&self, package: &str, path: &Path) -> TypeRef {
        let segments: Vec<String> = path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect();
        let arguments = path.segments.last().map(|s| &s.arguments);

        let expanded = if path.leading_colon.is_some() {
            Expanded::External(segments)
        } else {
            self.expand(package, segments, 0)
        };
        trace!(package, path = %render(path), ?expanded, "resolved path");

        match (expanded, arguments) {
            (Expanded::Local(mut absolute), arguments) if absolute.len() > 1 => {
                let name = absolute.pop().unwrap_or_default();
                let base = QualifiedName::new(absolute.join("::"), name);
                match arguments {
                    None | Some(PathArguments::None) => TypeRef::Declared(base),
                    Some(PathArguments::AngleBracketed(generics)) => {
                        let args: Vec<TypeRef> = generics
                            .args
                            .iter()
                            .filter_map(|arg| match arg {
                                GenericArgument::Lifetime(_) => None,
                                GenericArgument::Type(ty) => Some(self.type_ref(package, ty)),
                                other => Some(TypeRef::opaque(render(other))),
                            })
                            .collect();
                        if args.is_empty() {
                            TypeRef::Declared(base)
                        } else {
                            TypeRef::generic(base, args)
                        }
                    }
                    Some(PathArguments::Parenthesized(_)) => TypeRef::opaque(render(path)),
                }
            }
            (Expanded::Local(_), _) => TypeRef::opaque(render(path)),
            (Expanded::External(segments), arguments) => {
                let generics = match arguments {
                    None | Some(PathArguments::None) => String::new(),
                    Some(arguments) => render(arguments),
                };
                TypeRef::external(format!("{}{generics}", segments.join("::")))
            }
        }
    }

    fn expand(&self, package: &str, segments: Vec<String>, depth: usize) -> Expanded {
        if segments.is_empty() || depth > MAX_IMPORT_DEPTH {
            return Expanded::External(segments);
        }
        let first = segments[0].clone();
        let here: Vec<String> = package.split("::").map(str::to_string).collect();

        match first.as_str() {
            "crate" => {
                return Expanded::Local(join(&[ROOT_PACKAGE.to_string()], &segments[1..]));
            }
            "self" => return Expanded::Local(join(&here, &segments[1..])),
            "super" => {
                let ups = segments.iter().take_while(|s| *s == "super").count();
                if ups >= here.len() {
                    return Expanded::External(segments);
                }
                return Expanded::Local(join(&here[..here.len() - ups], &segments[ups..]));
            }
            _ => {}
        }

        let Some(module) = self.modules.get(package) else {
            return Expanded::External(segments);
        };
        // `use http::{self}` maps `http` to itself; fall through to items
        if let Some(imported) = module.imports.get(&first)
            && imported.first() != Some(&first)
        {
            let rewritten = join(imported, &segments[1..]);
            return self.expand(package, rewritten, depth + 1);
        }
        if module.items.contains_key(&first) {
            return Expanded::Local(join(&here, &segments));
        }
        Expanded::External(segments)
    }
}

fn join(prefix: &[String], rest: &[String]) -> Vec<String> {
    prefix.iter().chain(rest).cloned().collect()
}

fn first_trait<'a>(mut bounds: impl Iterator<Item = &'a TypeParamBound>) -> Option<&'a Path> {
    bounds.find_map(|bound| match bound {
        TypeParamBound::Trait(t) => Some(&t.path),
        _ => None,
    })
}

/// Record every name a `use` tree brings into scope
fn flatten_use(tree: &UseTree, prefix: Vec<String>, imports: &mut HashMap<String, Vec<String>>) {
    match tree {
        UseTree::Path(p) => {
            let mut prefix = prefix;
            prefix.push(p.ident.to_string());
            flatten_use(&p.tree, prefix, imports);
        }
        UseTree::Name(n) => {
            let ident = n.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    imports.insert(last.clone(), prefix.clone());
                }
            } else {
                let mut path = prefix;
                path.push(ident.clone());
                imports.insert(ident, path);
            }
        }
        UseTree::Rename(r) => {
            let alias = r.rename.to_string();
            if alias == "_" {
                return;
            }
            let mut path = prefix;
            if r.ident != "self" {
                path.push(r.ident.to_string());
            }
            imports.insert(alias, path);
        }
        UseTree::Glob(_) => {
            trace!(prefix = %prefix.join("::"), "ignoring glob import");
        }
        UseTree::Group(g) => {
            for item in &g.items {
                flatten_use(item, prefix.clone(), imports);
            }
        }
    }
}

/// Token text with the spacing a person would write
pub fn render(tokens: impl ToTokens) -> String {
    let stream: TokenStream = tokens.to_token_stream();
    let mut text = stream.to_string();
    for (from, to) in [
        (" :: ", "::"),
        (":: ", "::"),
        ("& ", "&"),
        ("< ", "<"),
        (" <", "<"),
        (" >", ">"),
        (" ,", ","),
        (" : ", ": "),
        ("( ", "("),
        (" )", ")"),
    ] {
        text = text.replace(from, to);
    }
    attach_parens(&text)
}

/// `fn run (` → `fn run(`, leaving `-> (` and `: (` alone
fn attach_parens(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, c) in chars.iter().enumerate() {
        let attaches = *c == ' '
            && chars.get(i + 1) == Some(&'(')
            && i > 0
            && (chars[i - 1].is_alphanumeric()
                || chars[i - 1] == '_'
                || (chars[i - 1] == '>' && (i < 2 || chars[i - 2] != '-')));
        if !attaches {
            out.push(*c);
        }
    }
    out
}
