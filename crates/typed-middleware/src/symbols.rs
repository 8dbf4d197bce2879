//! Symbol-table model consumed by the compiler
//!
//! The compiler never parses source itself. A front-end (the CLI's Rust
//! source reader, or a JSON manifest) describes the declared capabilities and
//! types through [`SymbolTable`], and resolution runs purely over that view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Package path used for the top-level module of a parsed source file
pub const ROOT_PACKAGE: &str = "self";

/// Fully qualified declaration name, e.g. `self::auth::Token`
///
/// The rendered form is the stable, collision-free key for components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Sibling declaration in the same package
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.package.clone(), name)
    }

    /// Parse `a::b::Name` into package `a::b` and name `Name`
    pub fn parse(path: &str) -> Option<Self> {
        let (package, name) = path.rsplit_once("::")?;
        if package.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(package, name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.package, self.name)
    }
}

/// Reference to a type as written in a signature or supertrait list
///
/// Equality is structural: `&T`, `&mut T` and `T` differ, as do `Wrap<u8>`
/// and `Wrap<String>`. Lifetimes are not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeRef {
    /// A declaration known to the symbol table
    Declared(QualifiedName),
    /// A table declaration applied to generic arguments
    Generic {
        base: QualifiedName,
        args: Vec<TypeRef>,
    },
    /// A nominal type from outside the table, by its expanded path and any
    /// generic arguments as written
    External(String),
    /// `&T` or `&mut T`
    Ref { mutable: bool, inner: Box<TypeRef> },
    /// `dyn Trait`
    Dyn(Box<TypeRef>),
    /// `impl Trait`
    Impl(Box<TypeRef>),
    /// Tuples, function pointers and anything else
    Opaque(String),
}

impl TypeRef {
    pub fn declared(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Declared(QualifiedName::new(package, name))
    }

    pub fn external(path: impl Into<String>) -> Self {
        Self::External(path.into())
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        Self::Opaque(text.into())
    }

    /// `&inner`
    pub fn shared(inner: TypeRef) -> Self {
        Self::Ref {
            mutable: false,
            inner: Box::new(inner),
        }
    }

    /// `&mut inner`
    pub fn exclusive(inner: TypeRef) -> Self {
        Self::Ref {
            mutable: true,
            inner: Box::new(inner),
        }
    }

    pub fn dyn_trait(inner: TypeRef) -> Self {
        Self::Dyn(Box::new(inner))
    }

    pub fn generic(base: QualifiedName, args: Vec<TypeRef>) -> Self {
        Self::Generic { base, args }
    }

    /// The type with references, `dyn` and `impl` looked through
    ///
    /// Used where only the named contract matters, e.g. `&dyn AuthDeps`.
    pub fn nominal(&self) -> &TypeRef {
        match self {
            Self::Ref { inner, .. } | Self::Dyn(inner) | Self::Impl(inner) => inner.nominal(),
            other => other,
        }
    }

    /// Nominal path of the type without generic arguments, if it has one
    ///
    /// References and trait objects have no path of their own.
    pub fn path(&self) -> Option<String> {
        match self {
            Self::Declared(name) | Self::Generic { base: name, .. } => Some(name.to_string()),
            Self::External(path) => Some(
                path.split_once('<')
                    .map_or(path.as_str(), |(nominal, _)| nominal)
                    .to_string(),
            ),
            Self::Ref { .. } | Self::Dyn(_) | Self::Impl(_) | Self::Opaque(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared(name) => write!(f, "{name}"),
            Self::Generic { base, args } => {
                write!(f, "{base}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Self::External(path) => f.write_str(path),
            Self::Ref { mutable: false, inner } => write!(f, "&{inner}"),
            Self::Ref { mutable: true, inner } => write!(f, "&mut {inner}"),
            Self::Dyn(inner) => write!(f, "dyn {inner}"),
            Self::Impl(inner) => write!(f, "impl {inner}"),
            Self::Opaque(text) => f.write_str(text),
        }
    }
}

/// How a method takes its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    /// Associated function, no receiver
    None,
    /// `&self`
    #[default]
    Ref,
    /// `&mut self`
    RefMut,
    /// `self`
    Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    /// Type exactly as written, used by code generation; empty when unknown
    #[serde(default)]
    pub rendered: String,
}

impl Param {
    /// A parameter with no recorded source text
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            rendered: String::new(),
        }
    }

    pub fn with_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered = rendered.into();
        self
    }
}

/// A declared method signature, receiver excluded from `params`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    #[serde(default)]
    pub receiver: Receiver,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub output: Option<TypeRef>,
    /// Signature as written (`fn token(&self) -> String`)
    #[serde(default)]
    pub rendered: String,
}

impl MethodSig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            receiver: Receiver::Ref,
            params: Vec::new(),
            output: None,
            rendered: String::new(),
        }
    }

    pub fn receiver(mut self, receiver: Receiver) -> Self {
        self.receiver = receiver;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.output = Some(ty);
        self
    }

    pub fn rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered = rendered.into();
        self
    }

    /// Argument names in declaration order
    pub fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    /// Structural equality used for contract satisfaction
    ///
    /// Parameter names and rendered text are not part of the signature.
    pub fn same_signature(&self, other: &MethodSig) -> bool {
        self.name == other.name
            && self.receiver == other.receiver
            && self.output == other.output
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

/// A capability contract: embedded contracts plus required methods
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceDecl {
    #[serde(default)]
    pub embeds: Vec<TypeRef>,
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

impl InterfaceDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed(mut self, ty: TypeRef) -> Self {
        self.embeds.push(ty);
        self
    }

    pub fn method(mut self, method: MethodSig) -> Self {
        self.methods.push(method);
        self
    }
}

/// A concrete type and every method declared on it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDecl {
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

impl TypeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: MethodSig) -> Self {
        self.methods.push(method);
        self
    }

    /// Methods callable through a shared reference
    ///
    /// Components are held by value in the generated aggregate and invoked
    /// through `&self`, so only `&self` methods are part of the method set.
    pub fn method_set(&self) -> impl Iterator<Item = &MethodSig> {
        self.methods.iter().filter(|m| m.receiver == Receiver::Ref)
    }

    pub fn declared(&self, name: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolKind {
    Interface(InterfaceDecl),
    Type(TypeDecl),
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: QualifiedName,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn as_interface(&self) -> Option<&InterfaceDecl> {
        match &self.kind {
            SymbolKind::Interface(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDecl> {
        match &self.kind {
            SymbolKind::Type(decl) => Some(decl),
            _ => None,
        }
    }
}

/// Symbol lookups the compiler needs from a front-end
pub trait SymbolTable {
    fn lookup(&self, name: &QualifiedName) -> Option<&Symbol>;

    /// Packages a scope specifier resolves to; exactly one is expected
    fn packages_matching(&self, scope: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
    pub path: String,
    #[serde(default)]
    pub symbols: BTreeMap<String, Symbol>,
}

/// Owned symbol table, also the on-disk manifest format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySymbolTable {
    #[serde(default)]
    pub packages: BTreeMap<String, Package>,
}

impl InMemorySymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a package by path
    pub fn package(&mut self, path: &str) -> &mut Package {
        self.packages
            .entry(path.to_string())
            .or_insert_with(|| Package {
                path: path.to_string(),
                symbols: BTreeMap::new(),
            })
    }

    pub fn insert(&mut self, name: QualifiedName, kind: SymbolKind) -> &mut Self {
        let package = self.package(&name.package);
        package
            .symbols
            .insert(name.name.clone(), Symbol { name, kind });
        self
    }

    pub fn interface(&mut self, package: &str, name: &str, decl: InterfaceDecl) -> &mut Self {
        self.insert(QualifiedName::new(package, name), SymbolKind::Interface(decl))
    }

    pub fn ty(&mut self, package: &str, name: &str, decl: TypeDecl) -> &mut Self {
        self.insert(QualifiedName::new(package, name), SymbolKind::Type(decl))
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.lookup(name).is_some()
    }
}

impl SymbolTable for InMemorySymbolTable {
    fn lookup(&self, name: &QualifiedName) -> Option<&Symbol> {
        self.packages.get(&name.package)?.symbols.get(&name.name)
    }

    fn packages_matching(&self, scope: &str) -> Vec<String> {
        self.packages
            .keys()
            .filter(|path| path.as_str() == scope)
            .cloned()
            .collect()
    }
}
