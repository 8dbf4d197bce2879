use serde::{Deserialize, Serialize};

/// Naming conventions linking a capability to its implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    /// Suffix appended to a capability name to find its implementation
    pub implementation_suffix: String,
    /// Name of the invocation method on every implementation
    pub invocation_method: String,
    /// Nominal path the invocation method's first parameter must have
    pub request_type: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            implementation_suffix: "Middleware".to_string(),
            invocation_method: "run".to_string(),
            request_type: "http::Request".to_string(),
        }
    }
}

impl Conventions {
    /// `Auth` → `AuthMiddleware`
    pub fn implementation_name(&self, capability: &str) -> String {
        format!("{}{}", capability, self.implementation_suffix)
    }
}
