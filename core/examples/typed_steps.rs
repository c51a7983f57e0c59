// pipework/examples/typed_steps.rs

use async_trait::async_trait;
use pipework::{Action, ContextCell, Lifetime, Next, Pipeline, PipeworkError, Registry};
use tracing::{error, info};

// --- Context for an order-processing chain ---
#[derive(Clone, Debug, Default)]
struct OrderContext {
  order_id: String,
  total_cents: i64,
  authorized: bool,
  log: Vec<String>,
}

// --- Custom error type for this example ---
#[derive(Debug, thiserror::Error)]
enum OrderError {
  #[error("Order rejected: {0}")]
  Rejected(String),
  #[error("Pipework framework error: {0}")]
  Pipework(#[from] PipeworkError), // To allow pipework errors to be converted
}

// --- Typed steps ---

/// Rejects empty orders before anything else runs.
struct ValidateOrder;

#[async_trait]
impl Action<OrderContext, OrderError> for ValidateOrder {
  async fn execute(
    &self,
    ctx: ContextCell<OrderContext>,
    next: Next<OrderContext, OrderError>,
  ) -> Result<(), OrderError> {
    if ctx.read().order_id.is_empty() {
      return Err(OrderError::Rejected("order id must not be empty".to_string()));
    }
    ctx.write().log.push("validated".to_string());
    next.run(ctx).await
  }
}

/// Skips the rest of the chain for zero-value orders.
struct FreeOrderGate;

#[async_trait]
impl Action<OrderContext, OrderError> for FreeOrderGate {
  async fn execute(
    &self,
    ctx: ContextCell<OrderContext>,
    next: Next<OrderContext, OrderError>,
  ) -> Result<(), OrderError> {
    let free = ctx.read().total_cents == 0;
    if free {
      // Dropping `next` short-circuits: nothing behind this step runs.
      info!("Zero-value order, skipping payment");
      ctx.write().log.push("skipped-payment".to_string());
      return Ok(());
    }
    next.run(ctx).await
  }
}

/// Pretends to authorize payment on the way in, settles on the way out.
struct AuthorizePayment {
  gateway: String,
}

#[async_trait]
impl Action<OrderContext, OrderError> for AuthorizePayment {
  async fn execute(
    &self,
    ctx: ContextCell<OrderContext>,
    next: Next<OrderContext, OrderError>,
  ) -> Result<(), OrderError> {
    {
      let mut data = ctx.write();
      data.authorized = true;
      data.log.push(format!("authorized via {}", self.gateway));
    }
    next.run(ctx.clone()).await?;
    ctx.write().log.push("settled".to_string());
    Ok(())
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Typed Steps Example ---");

  // 1. Register the step types. The stateless ones can be rebuilt per call;
  //    the gateway client is a pre-built shared instance.
  let mut registry = Registry::new();
  registry.provide::<ValidateOrder, _>(Lifetime::PerCall, |_| Ok(ValidateOrder));
  registry.provide::<FreeOrderGate, _>(Lifetime::PerCall, |_| Ok(FreeOrderGate));
  registry.provide_instance(AuthorizePayment {
    gateway: "acme-pay".to_string(),
  });
  let scope = registry.into_scope();

  // 2. The pipeline names its steps by type; instances are resolved from
  //    the scope only when the chain actually reaches them.
  let mut pipeline = Pipeline::<OrderContext, OrderError>::new();
  pipeline.add::<ValidateOrder>();
  pipeline.add::<FreeOrderGate>();
  pipeline.add::<AuthorizePayment>();

  // 3. A paid order runs the full chain
  info!("--- Paid order ---");
  let paid = ContextCell::new(OrderContext {
    order_id: "ord-1001".to_string(),
    total_cents: 2599,
    ..Default::default()
  });
  pipeline.execute(&scope, paid.clone()).await?;
  {
    let state = paid.read();
    info!("Paid order log: {:?}", state.log);
    assert!(state.authorized);
    assert_eq!(state.log, vec!["validated", "authorized via acme-pay", "settled"]);
  }

  // 4. A zero-value order short-circuits at the gate
  info!("--- Free order ---");
  let free = ContextCell::new(OrderContext {
    order_id: "ord-1002".to_string(),
    total_cents: 0,
    ..Default::default()
  });
  pipeline.execute(&scope, free.clone()).await?;
  {
    let state = free.read();
    info!("Free order log: {:?}", state.log);
    assert!(!state.authorized);
    assert_eq!(state.log, vec!["validated", "skipped-payment"]);
  }

  // 5. An order with no id fails validation
  info!("--- Invalid order ---");
  let invalid = ContextCell::new(OrderContext::default());
  match pipeline.execute(&scope, invalid).await {
    Ok(()) => error!("Invalid order unexpectedly succeeded!"),
    Err(OrderError::Rejected(msg)) => {
      info!("Invalid order rejected as expected: {}", msg);
      assert!(msg.contains("must not be empty"));
    }
    Err(e) => error!("Invalid order failed with unexpected error type: {}", e),
  }

  // 6. Running against a scope that knows none of the step types fails
  //    with a resolution error as soon as the first typed step is reached
  info!("--- Unregistered steps ---");
  let empty_scope = Registry::new().into_scope();
  let orphan = ContextCell::new(OrderContext {
    order_id: "ord-1003".to_string(),
    total_cents: 100,
    ..Default::default()
  });
  match pipeline.execute(&empty_scope, orphan).await {
    Ok(()) => error!("Unregistered run unexpectedly succeeded!"),
    Err(OrderError::Pipework(pe)) => {
      info!("Unregistered run failed as expected: {:?}", pe);
      assert!(matches!(pe, PipeworkError::NullResolution { .. }));
    }
    Err(e) => error!("Unregistered run failed with unexpected error type: {}", e),
  }

  Ok(())
}
