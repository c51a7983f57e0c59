// pipework/src/pipeline/mod.rs

//! Defines the `Pipeline<C, Err>` struct, its configuration and execution
//! logic, and the scope-per-call `ScopedPipeline` variant.

pub mod definition;
pub mod execution;
pub mod scoped;

// Re-export the main pipeline types
pub use definition::Pipeline;
pub use scoped::ScopedPipeline;
