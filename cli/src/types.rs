use clap::ValueEnum;

/// Output format of a generate run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Emit {
    /// Rust source to `include!` beside the stack contract
    #[default]
    Rust,
    /// The compiled graph, order and pipeline description as JSON
    Json,
}

impl Emit {
    /// Extension of the generated file
    pub fn extension(&self) -> &'static str {
        match self {
            Emit::Rust => "rs",
            Emit::Json => "json",
        }
    }
}

impl std::fmt::Display for Emit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Emit::Rust => write!(f, "rust"),
            Emit::Json => write!(f, "json"),
        }
    }
}
