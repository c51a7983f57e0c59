// pipework/examples/bus_consumer.rs
//
// The message-consumer shape: one pipeline per message type, mounted behind
// a queue the way a bus client hands deliveries to its registered handler.
// Every delivery becomes one scoped call through the chain.

use async_trait::async_trait;
use pipework::{
  Action, ContextCell, Lifetime, Middleware, Next, PipeworkError, Registry, ScopeHandle,
  ScopedPipeline,
};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

// --- Message types, one chain each ---
#[derive(Debug)]
struct OrderPlaced {
  customer_id: String,
}

#[derive(Debug)]
struct OrderPaymentTaken {
  customer_id: String,
  amount_cents: i64,
}

/// Generic envelope step: logs the delivery on the way in and out. Each
/// closed type is registered separately, so each chain resolves its own.
struct DeliveryLog<M: Send + Sync + 'static> {
  _marker: PhantomData<M>,
}

impl<M: Send + Sync + 'static> DeliveryLog<M> {
  fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

#[async_trait]
impl<M: Send + Sync + 'static> Action<M> for DeliveryLog<M> {
  async fn execute(&self, ctx: ContextCell<M>, next: Next<M>) -> Result<(), PipeworkError> {
    info!("delivering {}", std::any::type_name::<M>());
    next.run(ctx).await?;
    info!("delivered {}", std::any::type_name::<M>());
    Ok(())
  }
}

/// Terminal consumer for placed orders: handles the message and drops the
/// continuation, ending the chain.
struct OrderPlacedHandler {
  seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Action<OrderPlaced> for OrderPlacedHandler {
  async fn execute(
    &self,
    ctx: ContextCell<OrderPlaced>,
    _next: Next<OrderPlaced>,
  ) -> Result<(), PipeworkError> {
    let customer = ctx.read().customer_id.clone();
    let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
    info!("order #{} placed by {}", n, customer);
    Ok(())
  }
}

/// Terminal consumer for payments.
struct PaymentTakenHandler {
  seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Action<OrderPaymentTaken> for PaymentTakenHandler {
  async fn execute(
    &self,
    ctx: ContextCell<OrderPaymentTaken>,
    _next: Next<OrderPaymentTaken>,
  ) -> Result<(), PipeworkError> {
    let (customer, amount) = {
      let data = ctx.read();
      (data.customer_id.clone(), data.amount_cents)
    };
    self.seen.fetch_add(1, Ordering::SeqCst);
    info!("payment of {} cents taken from {}", amount, customer);
    Ok(())
  }
}

/// Spawns a consumer task that pushes every received message through the
/// chain as its own scoped call.
fn mount_consumer<M>(
  scope: ScopeHandle,
  chain: Arc<dyn Middleware<M, PipeworkError>>,
) -> (mpsc::Sender<M>, JoinHandle<()>)
where
  M: Send + Sync + 'static,
{
  let (tx, mut rx) = mpsc::channel::<M>(16);
  let worker = tokio::spawn(async move {
    while let Some(message) = rx.recv().await {
      if let Err(e) = chain.execute(&scope, ContextCell::new(message)).await {
        error!("delivery failed: {}", e);
      }
    }
  });
  (tx, worker)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Bus Consumer Example ---");

  let placed_seen = Arc::new(AtomicUsize::new(0));
  let payments_seen = Arc::new(AtomicUsize::new(0));

  // 1. One registry covers both chains: the envelope step per closed type,
  //    the handlers as shared instances.
  let mut registry = Registry::new();
  registry.provide::<DeliveryLog<OrderPlaced>, _>(Lifetime::PerCall, |_| Ok(DeliveryLog::new()));
  registry.provide::<DeliveryLog<OrderPaymentTaken>, _>(Lifetime::PerCall, |_| Ok(DeliveryLog::new()));
  registry.provide_instance(OrderPlacedHandler {
    seen: Arc::clone(&placed_seen),
  });
  registry.provide_instance(PaymentTakenHandler {
    seen: Arc::clone(&payments_seen),
  });
  let scope = registry.into_scope();

  // 2. Build and mount one chain per message type
  let mut placed_chain = ScopedPipeline::<OrderPlaced>::new();
  placed_chain.add::<DeliveryLog<OrderPlaced>>();
  placed_chain.add::<OrderPlacedHandler>();
  let (placed_tx, placed_worker) = mount_consumer(Arc::clone(&scope), Arc::new(placed_chain));

  let mut payment_chain = ScopedPipeline::<OrderPaymentTaken>::new();
  payment_chain.add::<DeliveryLog<OrderPaymentTaken>>();
  payment_chain.add::<PaymentTakenHandler>();
  let (payment_tx, payment_worker) = mount_consumer(Arc::clone(&scope), Arc::new(payment_chain));

  // 3. Publish a few messages
  placed_tx
    .send(OrderPlaced {
      customer_id: "customer-1".to_string(),
    })
    .await?;
  placed_tx
    .send(OrderPlaced {
      customer_id: "customer-2".to_string(),
    })
    .await?;
  payment_tx
    .send(OrderPaymentTaken {
      customer_id: "customer-1".to_string(),
      amount_cents: 2599,
    })
    .await?;

  // 4. Close the queues and wait for the consumers to drain them
  drop(placed_tx);
  drop(payment_tx);
  placed_worker.await?;
  payment_worker.await?;

  assert_eq!(placed_seen.load(Ordering::SeqCst), 2);
  assert_eq!(payments_seen.load(Ordering::SeqCst), 1);
  info!("All deliveries consumed.");

  Ok(())
}
