// pipework/src/core/middleware.rs

//! Defines the `Middleware<C, Err>` trait: the execution surface callers and
//! host frameworks program against.

use crate::core::context::ContextCell;
use crate::core::resolver::ScopeHandle;
use crate::error::PipeworkError;
use async_trait::async_trait;

/// Anything that can run a configured chain over a context.
///
/// `Pipeline` and `ScopedPipeline` both implement this, so code that dispatches
/// work — a message bus handing deliveries to `Arc<dyn Middleware<M, E>>`, a
/// request hook in a host framework — stays agnostic about whether each call
/// gets its own resolution scope.
#[async_trait]
pub trait Middleware<C, Err = PipeworkError>: Send + Sync
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Runs the chain against `ctx`, resolving type-referenced steps from
  /// `scope`.
  async fn execute(&self, scope: &ScopeHandle, ctx: ContextCell<C>) -> Result<(), Err>;
}
