pub mod action;
pub mod chain;
pub mod context;
pub mod middleware;
pub mod resolver;
pub mod step;
pub mod wrapper;

// Re-export key types for easier access from other pipework modules (and lib.rs)
pub use action::{Action, ActionFn};
pub use chain::Next;
pub use context::ContextCell;
pub use middleware::Middleware;
pub use resolver::{AnyInstance, Disposable, Resolver, ScopeHandle, StepKey};
pub use step::ActionKey;
pub use wrapper::FnAction;
