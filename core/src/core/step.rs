// pipework/src/core/step.rs

//! Defines the two kinds of step a pipeline can hold: a key to resolve later,
//! or a shared instance supplied up front.

use crate::core::action::Action;
use crate::core::resolver::{AnyInstance, StepKey};
use crate::error::PipeworkError;
use std::sync::Arc;

/// A `StepKey` paired with the downcast for this pipeline's action type.
///
/// Resolvers traffic in type-erased `AnyInstance`s; the `cast` fn pointer is
/// minted at `of::<A>()` time, where the concrete `A` is still known, and is
/// the only place the erased instance turns back into `Arc<dyn Action<C, Err>>`.
pub struct ActionKey<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  key: StepKey,
  cast: fn(AnyInstance) -> Option<Arc<dyn Action<C, Err>>>,
}

// Monomorphized per concrete action type A; stored as a plain fn pointer so
// ActionKey stays Copy and needs no allocation.
fn cast_action<A, C, Err>(instance: AnyInstance) -> Option<Arc<dyn Action<C, Err>>>
where
  A: Action<C, Err> + Send + Sync + 'static,
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  instance
    .downcast::<A>()
    .ok()
    .map(|concrete| concrete as Arc<dyn Action<C, Err>>)
}

impl<C, Err> ActionKey<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Creates the key for step type `A`, capturing its downcast.
  pub fn of<A>() -> Self
  where
    A: Action<C, Err> + Send + Sync + 'static,
  {
    Self {
      key: StepKey::of::<A>(),
      cast: cast_action::<A, C, Err>,
    }
  }

  pub fn step_key(&self) -> StepKey {
    self.key
  }

  /// Downcasts a resolved instance to this pipeline's action type.
  /// `None` means the resolver returned something for the key that does not
  /// implement `Action<C, Err>`.
  pub(crate) fn cast(&self, instance: AnyInstance) -> Option<Arc<dyn Action<C, Err>>> {
    (self.cast)(instance)
  }
}

// Manual impls: derive would put bounds on C and Err, but the fields are a
// Copy key and a fn pointer regardless of the type parameters.
impl<C, Err> Clone for ActionKey<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    *self
  }
}

impl<C, Err> Copy for ActionKey<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
}

impl<C, Err> std::fmt::Debug for ActionKey<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ActionKey").field("key", &self.key).finish()
  }
}

/// One entry in a pipeline's ordered step list.
///
/// `TypeRef` steps cost a resolver round-trip per execution and can vary per
/// scope; `Instance` steps are resolved once, at registration.
pub(crate) enum PipeStep<C, Err = PipeworkError>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Resolve from the ambient scope when execution reaches this position.
  TypeRef(ActionKey<C, Err>),
  /// Use this shared instance directly; the resolver is never consulted.
  Instance(Arc<dyn Action<C, Err>>),
}

impl<C, Err> Clone for PipeStep<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn clone(&self) -> Self {
    match self {
      PipeStep::TypeRef(key) => PipeStep::TypeRef(*key),
      PipeStep::Instance(action) => PipeStep::Instance(Arc::clone(action)),
    }
  }
}

// Instance holds an Arc<dyn Action>, which has no Debug; print the variant
// and the key where we have one.
impl<C, Err> std::fmt::Debug for PipeStep<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PipeStep::TypeRef(key) => f.debug_tuple("TypeRef").field(&key.step_key()).finish(),
      PipeStep::Instance(_) => f.debug_tuple("Instance").field(&"<action>").finish(),
    }
  }
}
