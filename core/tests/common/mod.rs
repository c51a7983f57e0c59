// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

pub mod bus;

use async_trait::async_trait;
use parking_lot::Mutex;
use pipework::{Action, ContextCell, Disposable, Next, PipeworkError};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use tracing::Level;

// --- Common Context Struct ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub trace: Vec<String>,
}

// --- Common Error Type for Tests ---

// PipeworkError carries anyhow payloads and so has no Eq; for assertions the
// framework case collapses to which variant it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkErrorKind {
  Resolution,
  NullResolution,
  Step,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)] // Clone, PartialEq, Eq for assertions
pub enum TestError {
  #[error("Pipework framework error: {0:?}")]
  Pipework(FrameworkErrorKind),

  #[error("Test step failed: {0}")]
  Step(String),
}

impl From<PipeworkError> for TestError {
  fn from(pe: PipeworkError) -> Self {
    match pe {
      PipeworkError::ResolutionFailure { .. } => TestError::Pipework(FrameworkErrorKind::Resolution),
      PipeworkError::NullResolution { .. } => TestError::Pipework(FrameworkErrorKind::NullResolution),
      PipeworkError::StepFailure { source } => TestError::Step(source.to_string()),
    }
  }
}

// --- Monitor: shared, ordered event log for lifecycle assertions ---
// Cloning shares the log, so a test can keep a handle while the registry (or
// a factory closure) holds another.
#[derive(Clone, Debug, Default)]
pub struct Monitor {
  events: Arc<Mutex<Vec<String>>>,
}

impl Monitor {
  pub fn record(&self, event: impl Into<String>) {
    self.events.lock().push(event.into());
  }

  pub fn events(&self) -> Vec<String> {
    self.events.lock().clone()
  }

  pub fn count_of(&self, needle: &str) -> usize {
    self.events.lock().iter().filter(|e| e.as_str() == needle).count()
  }

  pub fn ctor_tick(&self, name: &str) {
    self.record(format!("ctor:{}", name));
  }

  pub fn call_tick(&self, name: &str) {
    self.record(format!("call:{}", name));
  }

  pub fn release_tick(&self, name: &str) {
    self.record(format!("release:{}", name));
  }

  pub fn ctor_count(&self, name: &str) -> usize {
    self.count_of(&format!("ctor:{}", name))
  }

  pub fn call_count(&self, name: &str) -> usize {
    self.count_of(&format!("call:{}", name))
  }

  pub fn release_count(&self, name: &str) -> usize {
    self.count_of(&format!("release:{}", name))
  }

  /// The released type names, in the order their release hooks fired.
  pub fn release_order(&self) -> Vec<String> {
    self
      .events
      .lock()
      .iter()
      .filter_map(|e| e.strip_prefix("release:").map(str::to_string))
      .collect()
  }
}

// --- Typed Test Actions ---

/// Pushes `pre-NAME` / `post-NAME` onto the context trace around its
/// continuation, always continuing the chain.
pub struct RecordingAction {
  name: &'static str,
}

impl RecordingAction {
  pub fn new(name: &'static str) -> Self {
    Self { name }
  }
}

#[async_trait]
impl<Err> Action<TestContext, Err> for RecordingAction
where
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<TestContext>, next: Next<TestContext, Err>) -> Result<(), Err> {
    ctx.write().trace.push(format!("pre-{}", self.name));
    next.run(ctx.clone()).await?;
    ctx.write().trace.push(format!("post-{}", self.name));
    Ok(())
  }
}

/// Lifecycle probe intended for `Lifetime::Singleton` registration. Generic
/// over the message type so each closed type gets its own resolver key and
/// its own tick labels, like the chain it serves.
pub struct SharedProbe<M: Send + Sync + 'static> {
  monitor: Monitor,
  _marker: PhantomData<M>,
}

impl<M: Send + Sync + 'static> SharedProbe<M> {
  pub fn new(monitor: Monitor) -> Self {
    monitor.ctor_tick(std::any::type_name::<Self>());
    Self {
      monitor,
      _marker: PhantomData,
    }
  }
}

#[async_trait]
impl<M, Err> Action<M, Err> for SharedProbe<M>
where
  M: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<M>, next: Next<M, Err>) -> Result<(), Err> {
    self.monitor.call_tick(std::any::type_name::<Self>());
    next.run(ctx).await
  }
}

impl<M: Send + Sync + 'static> Disposable for SharedProbe<M> {
  fn dispose(&self) {
    self.monitor.release_tick(std::any::type_name::<Self>());
  }
}

/// Lifecycle probe intended for `Lifetime::PerCall` registration.
pub struct PerCallProbe<M: Send + Sync + 'static> {
  monitor: Monitor,
  _marker: PhantomData<M>,
}

impl<M: Send + Sync + 'static> PerCallProbe<M> {
  pub fn new(monitor: Monitor) -> Self {
    monitor.ctor_tick(std::any::type_name::<Self>());
    Self {
      monitor,
      _marker: PhantomData,
    }
  }
}

#[async_trait]
impl<M, Err> Action<M, Err> for PerCallProbe<M>
where
  M: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<M>, next: Next<M, Err>) -> Result<(), Err> {
    self.monitor.call_tick(std::any::type_name::<Self>());
    next.run(ctx).await
  }
}

impl<M: Send + Sync + 'static> Disposable for PerCallProbe<M> {
  fn dispose(&self) {
    self.monitor.release_tick(std::any::type_name::<Self>());
  }
}

/// Records the context's `message` value at the moment the chain reaches it,
/// then continues. Lets tests assert that each call observed its own context.
pub struct ObservingAction {
  monitor: Monitor,
}

impl ObservingAction {
  pub fn new(monitor: Monitor) -> Self {
    Self { monitor }
  }
}

#[async_trait]
impl<Err> Action<TestContext, Err> for ObservingAction
where
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<TestContext>, next: Next<TestContext, Err>) -> Result<(), Err> {
    let value = ctx.read().message.clone();
    self.monitor.record(format!("observed:{}", value));
    next.run(ctx).await
  }
}

// --- Common Step Closure Creators (for `use_fn`) ---

pub fn record_step(
  name: &'static str,
) -> impl Fn(
  ContextCell<TestContext>,
  Next<TestContext, TestError>,
) -> Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextCell<TestContext>, next: Next<TestContext, TestError>| {
    Box::pin(async move {
      {
        let mut guard = ctx.write();
        guard.counter += 1;
        guard.trace.push(format!("pre-{}", name));
      }
      next.run(ctx.clone()).await?;
      ctx.write().trace.push(format!("post-{}", name));
      tracing::debug!(target: "test_steps", step = %name, "executed");
      Ok(())
    })
  }
}

/// A step that records its pre-logic and then drops its continuation,
/// short-circuiting the rest of the chain.
pub fn short_circuit_step(
  name: &'static str,
) -> impl Fn(
  ContextCell<TestContext>,
  Next<TestContext, TestError>,
) -> Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextCell<TestContext>, _next: Next<TestContext, TestError>| {
    Box::pin(async move {
      ctx.write().trace.push(format!("pre-{}", name));
      tracing::debug!(target: "test_steps", step = %name, "short-circuiting");
      Ok(())
    })
  }
}

pub fn failing_step(
  name: &'static str,
  error_message: &'static str,
) -> impl Fn(
  ContextCell<TestContext>,
  Next<TestContext, TestError>,
) -> Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextCell<TestContext>, _next: Next<TestContext, TestError>| {
    Box::pin(async move {
      ctx.write().trace.push(format!("pre-{}", name));
      tracing::warn!(target: "test_steps", step = %name, "failing with: '{}'", error_message);
      Err(TestError::Step(error_message.to_string()))
    })
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
