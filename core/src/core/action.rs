// pipework/src/core/action.rs

//! Defines the `Action<C, Err>` trait every pipeline step implements, and the
//! boxed-closure alias `ActionFn<C, Err>` used by `FnAction` for inline steps.

use crate::core::chain::Next;
use crate::core::context::ContextCell;
use crate::error::PipeworkError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A single middleware step in a pipeline, wrapping everything that comes
/// after it in the chain.
///
/// `execute` receives the shared context cell and a one-shot `Next` handle.
/// Code before `next.run(ctx)` is the step's pre-logic; code after the await
/// returns is its post-logic, running while the call stack unwinds back out.
/// Dropping `next` without running it short-circuits the pipeline: downstream
/// steps are neither resolved nor executed, and the pipeline still completes
/// with `Ok(())` unless the step itself returns an error.
///
/// Implementations must:
/// 1. Acquire locks on the `ContextCell` only via `.read()` / `.write()`.
/// 2. **Drop every lock guard BEFORE any `.await` suspension point.**
///
/// `Err` defaults to [`PipeworkError`]; pipelines with an application error
/// type need `Err: From<PipeworkError>` so framework failures (resolution,
/// missing instances) can surface through the same channel as step failures.
#[async_trait]
pub trait Action<C, Err = PipeworkError>: Send + Sync
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<C>, next: Next<C, Err>) -> Result<(), Err>;
}

/// Type alias for an inline step closure, as stored by `FnAction`.
///
/// The closure takes its own clone of the context cell plus the continuation,
/// and returns a boxed future. Same shape an `#[async_trait]` method
/// desugars to, so trait-based and closure-based steps mix freely in one
/// pipeline.
pub type ActionFn<C, Err> = Box<
  dyn Fn(ContextCell<C>, Next<C, Err>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>>
    + Send
    + Sync,
>;
