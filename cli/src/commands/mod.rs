pub mod generate;

pub use generate::{GenerateOptions, Generated, generate};
