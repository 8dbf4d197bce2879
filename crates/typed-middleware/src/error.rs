use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Every way a compile can fail; all are fatal to the whole compile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("could not find {name} in package {package}")]
    SymbolNotFound { package: String, name: String },

    #[error("{name} is not an interface")]
    NotAnInterface { name: String },

    #[error("could not find {implementation} to implement {capability}")]
    ImplementationNotFound {
        capability: String,
        implementation: String,
    },

    #[error("{implementation} should implement {capability}, but was missing {method}")]
    ImplementationIncomplete {
        capability: String,
        implementation: String,
        method: String,
    },

    #[error("{implementation} should implement {capability}, but had wrong signature for {method}")]
    ImplementationMismatched {
        capability: String,
        implementation: String,
        method: String,
    },

    #[error("{implementation} had no {method}() method")]
    NoInvocationMethod {
        implementation: String,
        method: String,
    },

    #[error("{implementation}'s {method}() {reason}")]
    InvalidSignature {
        implementation: String,
        method: String,
        reason: String,
    },

    #[error("cycle detected rooted at {capability} ({})", .chain.join(" → "))]
    CyclicDependency {
        capability: String,
        chain: Vec<String>,
    },

    #[error("package specifier '{scope}' loaded {found} packages, expected exactly one")]
    DuplicatePackageLoad { scope: String, found: usize },
}

impl CompileError {
    /// Capability at which a cycle closes, if this is a cycle error
    pub fn cycle_capability(&self) -> Option<&str> {
        match self {
            Self::CyclicDependency { capability, .. } => Some(capability),
            _ => None,
        }
    }
}
