// src/lib.rs

//! Pipework: an async, type-parameterized middleware pipeline ("onion" model) for Rust.
//!
//! Pipework lets a host compose cross-cutting behavior around a payload type
//! as an ordered chain of steps, with:
//!  - Around-semantics: each step runs logic before and after handing control
//!    to the rest of the chain, and may decline to hand over at all.
//!  - Lazy, just-in-time resolution: type-referenced steps are resolved from
//!    a scope only when execution actually reaches them.
//!  - Three ways to add a step: by type, by pre-minted key, or as an inline
//!    async closure.
//!  - A scope-per-call variant that opens a child resolution scope for each
//!    execution and releases it on every exit path.
//!  - A small lifetime-aware registry (singleton / per-call) implementing the
//!    resolver seam, swappable for any external container.

// Declare modules according to the planned structure
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

// Core types that users will interact with frequently
pub use crate::core::action::{Action, ActionFn};
pub use crate::core::chain::Next;
pub use crate::core::context::ContextCell;
pub use crate::core::middleware::Middleware;
pub use crate::core::resolver::{AnyInstance, Disposable, Resolver, ScopeHandle, StepKey};
pub use crate::core::step::ActionKey;
pub use crate::core::wrapper::FnAction;

// The pipeline types themselves
pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::scoped::ScopedPipeline;

// The bundled resolver implementation
pub use crate::registry::{Lifetime, Registry, RegistryScope};

pub use crate::error::{PipeworkError, PipeworkResult};

/*
    Core workflow:
    1. Define a context struct `MyCtx` for the payload your chain processes.
    2. Implement `Action<MyCtx>` for each named step (or use closures).
    3. Build a `Pipeline<MyCtx>` (or `ScopedPipeline<MyCtx>` for per-call
       lifetimes) with `.add::<Step>()` / `.use_fn(..)`.
    4. Register type-referenced steps in a `Registry` with their lifetimes,
       then freeze it: `let scope = registry.into_scope();`.
    5. Execute: `pipeline.execute(&scope, ContextCell::new(ctx)).await?;`.
*/
