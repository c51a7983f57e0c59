// pipework/src/core/resolver.rs

//! The resolver seam: how pipelines obtain step instances at execution time.
//!
//! A pipeline holds `StepKey`s for steps added by type; only when execution
//! actually reaches such a step is the key handed to the ambient `Resolver`.
//! Any container can sit behind this trait — `crate::registry::Registry`
//! ships with pipework, but an application can adapt its own.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Identity of a type-referenced step: the `TypeId` for lookup plus the
/// type name for diagnostics and tracing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
  id: TypeId,
  name: &'static str,
}

impl StepKey {
  /// Creates the key for a concrete step type `T`.
  pub fn of<T: 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.id
  }

  /// The fully-qualified name of the keyed type, for log and error output.
  pub fn type_name(&self) -> &'static str {
    self.name
  }
}

impl fmt::Display for StepKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// A type-erased, shared step instance as handed back by a resolver.
///
/// `Arc` rather than `Box` because one instance may be shared across scopes
/// (singletons) and across concurrently-running pipeline executions.
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// Source of step instances for type-referenced pipeline steps.
///
/// `resolve` is only ever called lazily, when execution reaches the step that
/// names the key. Returning `Ok(None)` means the key is simply not known to
/// this resolver; returning `Err` means resolution itself blew up (a failing
/// factory, a backing container error).
pub trait Resolver: Send + Sync {
  fn resolve(&self, key: &StepKey) -> anyhow::Result<Option<AnyInstance>>;

  /// Opens a nested scope. Scoped pipeline runs resolve their steps from a
  /// child scope and drop it once the run finishes, so per-call instances
  /// live exactly as long as one execution.
  fn child_scope(&self) -> ScopeHandle;
}

/// Shared handle to a resolver scope. Dropping the last handle to a child
/// scope is what releases the instances created within it.
pub type ScopeHandle = Arc<dyn Resolver>;

/// Cleanup hook for step instances that hold releasable resources.
///
/// Resolvers that track per-call instances call `dispose` when their scope is
/// torn down. `dispose` takes `&self` because the resolver still shares
/// ownership of the instance at release time.
pub trait Disposable: Send + Sync {
  fn dispose(&self);
}
