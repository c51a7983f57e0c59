// pipework/src/pipeline/scoped.rs

//! `ScopedPipeline`: the scope-per-call variant. Each execution runs inside
//! a child resolution scope that is released when the call finishes.

use crate::core::action::Action;
use crate::core::chain::Next;
use crate::core::context::ContextCell;
use crate::core::middleware::Middleware;
use crate::core::resolver::ScopeHandle;
use crate::core::step::ActionKey;
use crate::error::PipeworkError;
use crate::pipeline::definition::Pipeline;
use async_trait::async_trait;
use std::future::Future;
use tracing::{event, instrument, Level};

/// Decorates a [`Pipeline`] so that every `execute` call opens a child scope,
/// runs the chain against it, and releases it afterwards.
///
/// Releasing is tied to dropping the child handle, so it happens on every
/// exit path: normal completion, short-circuit, a propagated error, even the
/// call future being dropped mid-flight. Instances resolved with per-call
/// lifetime therefore live exactly as long as one execution, and their
/// release hooks fire exactly once per call.
pub struct ScopedPipeline<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  inner: Pipeline<C, Err>,
}

impl<C, Err> ScopedPipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Starts from an empty chain; configure with the same append operations
  /// as [`Pipeline`].
  pub fn new() -> Self {
    Self {
      inner: Pipeline::new(),
    }
  }

  /// Wraps an already-configured chain.
  pub fn wrap(inner: Pipeline<C, Err>) -> Self {
    Self { inner }
  }

  pub fn add<A>(&mut self) -> &mut Self
  where
    A: Action<C, Err> + Send + Sync + 'static,
  {
    self.inner.add::<A>();
    self
  }

  pub fn add_key(&mut self, key: ActionKey<C, Err>) -> &mut Self {
    self.inner.add_key(key);
    self
  }

  pub fn use_fn<F, Fut>(&mut self, f: F) -> &mut Self
  where
    F: Fn(ContextCell<C>, Next<C, Err>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Err>> + Send + 'static,
  {
    self.inner.use_fn(f);
    self
  }

  /// Opens a child scope from `scope`, runs the wrapped chain against it,
  /// and releases the child unconditionally before returning the chain's
  /// result.
  #[instrument(
        name = "ScopedPipeline::execute",
        skip_all,
        fields(context_type = %std::any::type_name::<C>()),
        err(Display)
    )]
  pub async fn execute(&self, scope: &ScopeHandle, ctx: ContextCell<C>) -> Result<(), Err> {
    let child = scope.child_scope();
    event!(Level::DEBUG, "Child scope opened for this execution.");

    let result = self.inner.execute(&child, ctx).await;

    // Last handle to the child: dropping it is what releases the per-call
    // instances this execution resolved.
    drop(child);
    event!(Level::DEBUG, "Child scope released.");
    result
  }
}

impl<C, Err> Default for ScopedPipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<C, Err> From<Pipeline<C, Err>> for ScopedPipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn from(inner: Pipeline<C, Err>) -> Self {
    Self::wrap(inner)
  }
}

#[async_trait]
impl<C, Err> Middleware<C, Err> for ScopedPipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, scope: &ScopeHandle, ctx: ContextCell<C>) -> Result<(), Err> {
    ScopedPipeline::execute(self, scope, ctx).await
  }
}

impl<C, Err> std::fmt::Debug for ScopedPipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ScopedPipeline").field("inner", &self.inner).finish()
  }
}
