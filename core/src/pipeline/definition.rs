// pipework/src/pipeline/definition.rs

//! Contains the `Pipeline<C, Err>` struct definition and its configuration
//! surface: the three append operations.

use crate::core::action::Action;
use crate::core::chain::Next;
use crate::core::context::ContextCell;
use crate::core::step::{ActionKey, PipeStep};
use crate::core::wrapper::FnAction;
use crate::error::PipeworkError;
use std::future::Future;
use std::sync::Arc;

/// An ordered, append-only chain of middleware steps over a context type `C`.
///
/// Configuration is append-only: `add`, `add_key` and `use_fn` push steps,
/// and nothing removes or reorders them. Configure once, then execute any
/// number of times; the step list is shared read-only across executions and
/// every call gets fresh traversal state. Configuration is not synchronized
/// against in-flight executions — finish building before the first call.
///
/// `C` must be `'static + Send + Sync`.
/// `Err` must be `std::error::Error + Send + Sync + 'static` and additionally
/// `From<crate::error::PipeworkError>`, so that step-resolution failures can
/// be surfaced through the same error type the steps themselves return.
pub struct Pipeline<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Ordered step list. Behind an `Arc` so each execution's chain state can
  /// share it without copying; `Arc::make_mut` keeps the append methods cheap
  /// while no execution holds a reference.
  pub(crate) steps: Arc<Vec<PipeStep<C, Err>>>,
}

impl<C, Err> Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Creates an empty pipeline. Executing it immediately is a no-op that
  /// completes with `Ok(())`.
  pub fn new() -> Self {
    Self {
      steps: Arc::new(Vec::new()),
    }
  }

  /// Appends a type-referenced step: `A` is resolved from the execution's
  /// scope only when (and if) the chain reaches this position.
  pub fn add<A>(&mut self) -> &mut Self
  where
    A: Action<C, Err> + Send + Sync + 'static,
  {
    self.push(PipeStep::TypeRef(ActionKey::of::<A>()))
  }

  /// Appends a type-referenced step from a pre-minted key. Useful when the
  /// key is produced elsewhere (step catalogs, registration helpers) and the
  /// concrete type is no longer in scope here.
  pub fn add_key(&mut self, key: ActionKey<C, Err>) -> &mut Self {
    self.push(PipeStep::TypeRef(key))
  }

  /// Appends an inline closure step, wrapped via [`FnAction`]. The resolver
  /// is never consulted for closure steps.
  pub fn use_fn<F, Fut>(&mut self, f: F) -> &mut Self
  where
    F: Fn(ContextCell<C>, Next<C, Err>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Err>> + Send + 'static,
  {
    self.push(PipeStep::Instance(Arc::new(FnAction::new(f))))
  }

  fn push(&mut self, step: PipeStep<C, Err>) -> &mut Self {
    Arc::make_mut(&mut self.steps).push(step);
    self
  }

  /// Number of configured steps.
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

impl<C, Err> Default for Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

// Cloning shares the step list; a clone executed concurrently with the
// original behaves identically. Appending to either afterwards copies the
// list first (make_mut sees refcount > 1), so clones never observe each
// other's later configuration.
impl<C, Err> Clone for Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    Self {
      steps: Arc::clone(&self.steps),
    }
  }
}

impl<C, Err> std::fmt::Debug for Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline").field("steps", &self.steps).finish()
  }
}
