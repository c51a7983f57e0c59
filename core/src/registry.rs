// pipework/src/registry.rs

//! A lifetime-aware provider registry: the `Resolver` implementation that
//! ships with pipework.
//!
//! `Registry` is the configuration side — a map from `StepKey` to a factory
//! with a declared [`Lifetime`]. `into_scope` freezes it into the root
//! [`RegistryScope`]; `child_scope` opens nested scopes that share the entry
//! table and singleton cache but track their own per-call instances,
//! releasing them when the scope is dropped.
//!
//! Pipelines only see the `Resolver` trait; any external container can stand
//! in for this module.

use crate::core::resolver::{AnyInstance, Disposable, Resolver, ScopeHandle, StepKey};
use anyhow::anyhow;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

/// How long an instance produced by a provider lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
  /// Built on first resolution, then shared by every scope and every call.
  Singleton,
  /// Built anew for each resolution; owned by the resolving scope and
  /// released when that scope is dropped.
  PerCall,
}

// Factories receive the resolving scope so they can look up their own
// dependencies through it.
type FactoryFn = Box<dyn Fn(&RegistryScope) -> anyhow::Result<AnyInstance> + Send + Sync>;
type ReleaseFn = Arc<dyn Fn(&AnyInstance) + Send + Sync>;

struct ProviderEntry {
  lifetime: Lifetime,
  factory: FactoryFn,
  release: Option<ReleaseFn>,
}

/// Builder for the provider table. Register everything up front, then call
/// [`Registry::into_scope`] to obtain the root scope pipelines resolve from.
pub struct Registry {
  entries: HashMap<StepKey, ProviderEntry>,
}

impl Registry {
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
    }
  }

  /// Registers a factory for `T` under the given lifetime.
  ///
  /// The factory gets the resolving scope, so it can pull its own
  /// dependencies with [`RegistryScope::get`]. Registering the same type
  /// again replaces the previous provider.
  pub fn provide<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
  where
    T: Send + Sync + 'static,
    F: Fn(&RegistryScope) -> anyhow::Result<T> + Send + Sync + 'static,
  {
    self.insert::<T, _>(lifetime, factory, None)
  }

  /// Like [`Registry::provide`], but wires `T`'s [`Disposable::dispose`] as
  /// the release hook.
  ///
  /// The hook fires for `PerCall` instances when the scope that resolved them
  /// is dropped. `Singleton` instances are never released by the registry, so
  /// for them the hook never fires.
  pub fn provide_disposable<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
  where
    T: Disposable + Send + Sync + 'static,
    F: Fn(&RegistryScope) -> anyhow::Result<T> + Send + Sync + 'static,
  {
    let release: ReleaseFn = Arc::new(|instance: &AnyInstance| {
      if let Some(disposable) = instance.downcast_ref::<T>() {
        disposable.dispose();
      }
    });
    self.insert::<T, _>(lifetime, factory, Some(release))
  }

  /// Registers an already-built value as a singleton. Every resolution of
  /// `T` yields this same shared instance.
  pub fn provide_instance<T>(&mut self, value: T) -> &mut Self
  where
    T: Send + Sync + 'static,
  {
    // Stored as AnyInstance up front; wrapping through `insert` would bury
    // the value one Arc too deep for the downcast on the way out.
    let shared: AnyInstance = Arc::new(value);
    self.insert_entry(
      StepKey::of::<T>(),
      ProviderEntry {
        lifetime: Lifetime::Singleton,
        factory: Box::new(move |_| Ok(Arc::clone(&shared))),
        release: None,
      },
    )
  }

  fn insert<T, F>(
    &mut self,
    lifetime: Lifetime,
    factory: F,
    release: Option<ReleaseFn>,
  ) -> &mut Self
  where
    T: Send + Sync + 'static,
    F: Fn(&RegistryScope) -> anyhow::Result<T> + Send + Sync + 'static,
  {
    self.insert_entry(
      StepKey::of::<T>(),
      ProviderEntry {
        lifetime,
        factory: Box::new(move |scope| factory(scope).map(|value| Arc::new(value) as AnyInstance)),
        release,
      },
    )
  }

  fn insert_entry(&mut self, key: StepKey, entry: ProviderEntry) -> &mut Self {
    event!(Level::DEBUG, provided = %key, lifetime = ?entry.lifetime, "Registering provider.");
    self.entries.insert(key, entry);
    self
  }

  /// Freezes the registry into its root scope.
  pub fn into_scope(self) -> ScopeHandle {
    Arc::new(RegistryScope {
      entries: Arc::new(self.entries),
      singletons: Arc::new(Mutex::new(HashMap::new())),
      build_gates: Arc::new(Mutex::new(HashMap::new())),
      tracked: Mutex::new(Vec::new()),
    })
  }
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

/// One resolution scope over a frozen registry.
///
/// All scopes of a registry share the entry table and the singleton cache;
/// each scope separately tracks the `PerCall` instances it produced, and
/// releases them — in reverse creation order — when it is dropped.
pub struct RegistryScope {
  entries: Arc<HashMap<StepKey, ProviderEntry>>,
  singletons: Arc<Mutex<HashMap<StepKey, AnyInstance>>>,
  // One lock per key, taken only for the key's first construction. Shared by
  // all scopes, like the cache it guards.
  build_gates: Arc<Mutex<HashMap<StepKey, Arc<Mutex<()>>>>>,
  tracked: Mutex<Vec<(AnyInstance, ReleaseFn)>>,
}

impl RegistryScope {
  /// Typed resolution for use inside factories:
  /// `scope.get::<Dependency>()?` yields the dependency or explains why not.
  ///
  /// Unlike `Resolver::resolve`, an unregistered type is an error here — a
  /// factory asking for a missing dependency is a configuration mistake, not
  /// an absence the caller can meaningfully handle.
  pub fn get<T>(&self) -> anyhow::Result<Arc<T>>
  where
    T: Send + Sync + 'static,
  {
    let key = StepKey::of::<T>();
    let instance = self
      .resolve(&key)?
      .ok_or_else(|| anyhow!("no provider registered for `{}`", key))?;
    instance
      .downcast::<T>()
      .map_err(|_| anyhow!("provider for `{}` yielded a different type", key))
  }
}

impl Resolver for RegistryScope {
  fn resolve(&self, key: &StepKey) -> anyhow::Result<Option<AnyInstance>> {
    let entry = match self.entries.get(key) {
      Some(entry) => entry,
      // Unknown key is absence, not an error; the caller decides severity.
      None => return Ok(None),
    };

    match entry.lifetime {
      Lifetime::Singleton => {
        {
          let cache = self.singletons.lock();
          if let Some(cached) = cache.get(key) {
            event!(Level::TRACE, step = %key, "Singleton cache hit.");
            return Ok(Some(Arc::clone(cached)));
          }
        }

        // The key's build gate serializes first constructions: racing calls
        // queue here and the factory runs at most once per key. The cache
        // lock itself is never held across the factory, which may re-enter
        // this scope for its own dependencies. A provider that transitively
        // resolves its own key deadlocks on its gate; that is a dependency
        // cycle, not a supported configuration.
        let gate = {
          let mut gates = self.build_gates.lock();
          Arc::clone(gates.entry(*key).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        let _building = gate.lock();

        {
          let cache = self.singletons.lock();
          if let Some(cached) = cache.get(key) {
            // A racing call finished the build while we waited on the gate.
            event!(Level::TRACE, step = %key, "Singleton built by a concurrent resolve.");
            return Ok(Some(Arc::clone(cached)));
          }
        }

        let built = (entry.factory)(self)?;
        self.singletons.lock().insert(*key, Arc::clone(&built));
        event!(Level::DEBUG, step = %key, "Singleton resolved.");
        Ok(Some(built))
      }
      Lifetime::PerCall => {
        let built = (entry.factory)(self)?;
        if let Some(release) = &entry.release {
          self
            .tracked
            .lock()
            .push((Arc::clone(&built), Arc::clone(release)));
        }
        event!(Level::DEBUG, step = %key, "Per-call instance resolved.");
        Ok(Some(built))
      }
    }
  }

  fn child_scope(&self) -> ScopeHandle {
    Arc::new(RegistryScope {
      entries: Arc::clone(&self.entries),
      singletons: Arc::clone(&self.singletons),
      build_gates: Arc::clone(&self.build_gates),
      tracked: Mutex::new(Vec::new()),
    })
  }
}

impl Drop for RegistryScope {
  fn drop(&mut self) {
    let tracked = std::mem::take(self.tracked.get_mut());
    if tracked.is_empty() {
      return;
    }
    event!(
      Level::DEBUG,
      instances = tracked.len(),
      "Scope dropped; releasing tracked instances."
    );
    // Reverse creation order, so instances are released before anything they
    // may have depended on during construction.
    for (instance, release) in tracked.into_iter().rev() {
      release(&instance);
    }
  }
}
