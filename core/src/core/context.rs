// pipework/src/core/context.rs

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// The shared, mutable context a pipeline execution threads through its steps.
///
/// Every step sees the same cell: mutations made before `next.run(..)` are
/// visible to downstream steps, and mutations made by downstream steps are
/// visible to the post-logic that runs after `next.run(..)` returns.
///
/// IMPORTANT: Lock guards obtained from this struct are blocking and MUST NOT
/// be held across `.await` suspension points in asynchronous code.
#[derive(Debug)]
pub struct ContextCell<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextCell<T> {
  pub fn new(data: T) -> Self {
    ContextCell(Arc::new(RwLock::new(data)))
  }

  /// Acquires a read lock on the context value.
  /// The returned guard MUST be dropped before any `.await` point.
  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// Acquires a write lock on the context value.
  /// The returned guard MUST be dropped before any `.await` point.
  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }
}

impl<T: Send + Sync + 'static> Clone for ContextCell<T> {
  fn clone(&self) -> Self {
    ContextCell(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextCell<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
