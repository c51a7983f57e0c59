// pipework/src/core/wrapper.rs

//! `FnAction`: adapts a plain async closure into an [`Action`], so quick
//! inline steps and full trait implementations mix in the same pipeline.

use crate::core::action::{Action, ActionFn};
use crate::core::chain::Next;
use crate::core::context::ContextCell;
use crate::error::PipeworkError;
use async_trait::async_trait;
use std::future::Future;

/// Closure-backed step. Usually reached through `Pipeline::use_fn` rather
/// than constructed directly.
pub struct FnAction<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  action: ActionFn<C, Err>,
}

impl<C, Err> FnAction<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Boxes `f` into the stored [`ActionFn`] shape. The closure is called
  /// once per execution, with the context cell and that call's continuation.
  pub fn new<F, Fut>(f: F) -> Self
  where
    F: Fn(ContextCell<C>, Next<C, Err>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Err>> + Send + 'static,
  {
    Self {
      action: Box::new(move |ctx, next| Box::pin(f(ctx, next))),
    }
  }
}

#[async_trait]
impl<C, Err> Action<C, Err> for FnAction<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<C>, next: Next<C, Err>) -> Result<(), Err> {
    (self.action)(ctx, next).await
  }
}

impl<C, Err> std::fmt::Debug for FnAction<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FnAction").finish_non_exhaustive()
  }
}
