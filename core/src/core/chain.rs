// pipework/src/core/chain.rs

//! The lazy continuation walk behind `Next`.
//!
//! Each pipeline execution owns one `NextBuilder`: the shared step list, the
//! resolver scope for this call, and a cursor over the list. Minting a `Next`
//! advances the cursor and pins the handle to the position it passed over;
//! nothing is resolved until that handle is actually run. Execution is then
//! the mutual recursion `Next::run` -> `Action::execute` -> `Next::run`,
//! with `async_trait`'s boxing keeping the future type finite.

use crate::core::action::Action;
use crate::core::context::ContextCell;
use crate::core::resolver::ScopeHandle;
use crate::core::step::PipeStep;
use crate::error::PipeworkError;
use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{event, Level};

/// Per-execution chain state, shared by every `Next` handle minted during one
/// call. Cloning is cheap (three `Arc` bumps); concurrent executions of the
/// same pipeline each get their own builder and therefore their own cursor.
pub(crate) struct NextBuilder<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  steps: Arc<Vec<PipeStep<C, Err>>>,
  scope: ScopeHandle,
  cursor: Arc<AtomicUsize>,
}

impl<C, Err> NextBuilder<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  pub(crate) fn new(steps: Arc<Vec<PipeStep<C, Err>>>, scope: ScopeHandle) -> Self {
    Self {
      steps,
      scope,
      cursor: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Advances the cursor and mints the handle for the position it passed
  /// over. Past the end of the step list this yields the terminal handle,
  /// whose `run` is an immediate `Ok(())`.
  pub(crate) fn next(&self) -> Next<C, Err> {
    let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
    if idx < self.steps.len() {
      Next {
        link: Some((self.clone(), idx)),
      }
    } else {
      Next { link: None }
    }
  }

  /// Turns the step at `idx` into a runnable action.
  ///
  /// `Instance` steps are a pointer clone. `TypeRef` steps go to the scope
  /// here, at invocation time, so a pipeline that short-circuits earlier
  /// never pays for (or observes errors from) the steps behind the cut.
  fn resolve(&self, idx: usize) -> Result<Arc<dyn Action<C, Err>>, PipeworkError> {
    match &self.steps[idx] {
      PipeStep::Instance(action) => Ok(Arc::clone(action)),
      PipeStep::TypeRef(action_key) => {
        let key = action_key.step_key();
        event!(Level::TRACE, step = %key, step_index = idx, "Resolving type-referenced step.");
        let instance = self
          .scope
          .resolve(&key)
          .map_err(|source| PipeworkError::ResolutionFailure { key, source })?
          .ok_or(PipeworkError::NullResolution { key })?;
        action_key.cast(instance).ok_or_else(|| {
          event!(Level::ERROR, step = %key, "Resolved instance failed the Action downcast.");
          PipeworkError::ResolutionFailure {
            key,
            source: anyhow!(
              "the resolved instance is not an `Action` for this pipeline's context and error types"
            ),
          }
        })
      }
    }
  }
}

impl<C, Err> Clone for NextBuilder<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Self {
      steps: Arc::clone(&self.steps),
      scope: Arc::clone(&self.scope),
      cursor: Arc::clone(&self.cursor),
    }
  }
}

/// One-shot handle to the rest of the chain.
///
/// A step receives a `Next` and decides the fate of everything downstream:
/// `next.run(ctx).await` resolves and executes the following step (which in
/// turn receives its own handle), while dropping the handle short-circuits
/// the pipeline — no further step is resolved or run, and unwinding proceeds
/// back out through the post-logic of the steps already entered.
///
/// `run` consumes `self`, so a continuation cannot be invoked twice.
pub struct Next<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  link: Option<(NextBuilder<C, Err>, usize)>,
}

impl<C, Err> Next<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Resolves and executes the next step of the chain, passing it `ctx` and
  /// a fresh handle for the step after it.
  ///
  /// Resolution happens before the successor handle is minted, so a
  /// resolution failure leaves the chain where it was: the error propagates
  /// out through the steps already on the stack, exactly like a failure
  /// raised by the step itself.
  pub async fn run(self, ctx: ContextCell<C>) -> Result<(), Err> {
    let (chain, idx) = match self.link {
      Some(link) => link,
      None => {
        event!(Level::TRACE, "End of chain reached.");
        return Ok(());
      }
    };

    let action = chain.resolve(idx).map_err(Err::from)?;
    let next = chain.next();
    event!(Level::TRACE, step_index = idx, "Entering step.");
    action.execute(ctx, next).await
  }
}

// Next holds no Debug-able payload worth printing; expose only whether the
// handle is terminal.
impl<C, Err> std::fmt::Debug for Next<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Next")
      .field("terminal", &self.link.is_none())
      .finish()
  }
}
