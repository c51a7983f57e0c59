// tests/common/bus.rs

//! A stand-in for a third-party message bus (think EasyNetQ and friends):
//! topic-keyed handlers, no middleware support of its own. The integration
//! tests bolt pipework onto it the way a host application would.

use super::TestError;
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use pipework::{Action, ContextCell, Middleware, Next, PipeworkError, ScopeHandle};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type TopicHandler = Box<
  dyn Fn(Box<dyn Any + Send>) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
    + Send
    + Sync,
>;

pub struct FakeBus {
  handlers: Mutex<HashMap<String, TopicHandler>>,
}

impl FakeBus {
  pub fn new() -> Self {
    Self {
      handlers: Mutex::new(HashMap::new()),
    }
  }

  /// Registers a handler for a topic; the handler runs when a message
  /// arrives on that topic.
  pub fn subscribe<M, F, Fut>(&self, topic: &str, handle: F)
  where
    M: Send + 'static,
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
  {
    let handler: TopicHandler = Box::new(move |msg: Box<dyn Any + Send>| {
      let fut: Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> = match msg.downcast::<M>() {
        Ok(message) => Box::pin(handle(*message)),
        Err(_) => Box::pin(async move { Err(anyhow!("unexpected message type for this topic")) }),
      };
      fut
    });
    self.handlers.lock().insert(topic.to_string(), handler);
  }

  /// Delivers a message to the topic's handler.
  pub async fn publish<M: Send + 'static>(&self, topic: &str, message: M) -> anyhow::Result<()> {
    let fut = {
      let handlers = self.handlers.lock();
      let handler = handlers
        .get(topic)
        .ok_or_else(|| anyhow!("no subscriber for topic `{}`", topic))?;
      // Build the future under the lock, await it outside.
      handler(Box::new(message))
    };
    fut.await
  }
}

impl Default for FakeBus {
  fn default() -> Self {
    Self::new()
  }
}

/// Subscribes a middleware chain as the topic's handler: each delivery is
/// wrapped in a fresh context cell and pushed through the chain.
pub fn subscribe_pipeline<M>(
  bus: &FakeBus,
  topic: &str,
  scope: ScopeHandle,
  middleware: Arc<dyn Middleware<M, TestError>>,
) where
  M: Send + Sync + 'static,
{
  bus.subscribe::<M, _, _>(topic, move |message: M| {
    let scope = Arc::clone(&scope);
    let middleware = Arc::clone(&middleware);
    async move {
      middleware
        .execute(&scope, ContextCell::new(message))
        .await
        .map_err(|e| anyhow!(e))
    }
  });
}

// --- Consumer seam, mirrored from the bus-host idiom ---

#[async_trait]
pub trait Consumer<M>: Send + Sync
where
  M: Send + Sync + 'static,
{
  async fn handle(&self, message: ContextCell<M>) -> anyhow::Result<()>;
}

/// Terminal-ish step that hands the context to a `Consumer` before
/// continuing the chain.
pub struct ConsumerAction<M: Send + Sync + 'static> {
  consumer: Arc<dyn Consumer<M>>,
}

impl<M: Send + Sync + 'static> ConsumerAction<M> {
  pub fn new(consumer: Arc<dyn Consumer<M>>) -> Self {
    Self { consumer }
  }
}

#[async_trait]
impl<M, Err> Action<M, Err> for ConsumerAction<M>
where
  M: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, ctx: ContextCell<M>, next: Next<M, Err>) -> Result<(), Err> {
    self
      .consumer
      .handle(ctx.clone())
      .await
      .map_err(|e| Err::from(PipeworkError::from(e)))?;
    next.run(ctx).await
  }
}
