// pipework/examples/basic_pipeline.rs

use pipework::{ContextCell, Pipeline, PipeworkError, Registry};
use tracing::info;

// 1. Define the context the pipeline carries
#[derive(Clone, Debug, Default)]
struct BasicContext {
  message_log: Vec<String>,
  counter: i32,
}

#[tokio::main]
async fn main() -> Result<(), PipeworkError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 2. Build a pipeline out of closure steps.
  //    Each step wraps everything behind it: code before `next.run(..)`
  //    runs on the way in, code after it runs on the way out.
  let mut pipeline = Pipeline::<BasicContext>::new();

  pipeline.use_fn(|ctx, next| async move {
    {
      let mut data = ctx.write();
      data.counter += 1;
      let msg = format!("Alpha in: counter = {}", data.counter);
      info!("{}", msg);
      data.message_log.push(msg);
    } // Write guard dropped before the await below
    next.run(ctx.clone()).await?;
    info!("Alpha out");
    ctx.write().message_log.push("Alpha out".to_string());
    Ok(())
  });

  pipeline.use_fn(|ctx, next| async move {
    {
      let mut data = ctx.write();
      data.counter *= 2;
      let msg = format!("Beta in: counter = {}", data.counter);
      info!("{}", msg);
      data.message_log.push(msg);
    }
    next.run(ctx.clone()).await?;
    info!("Beta out");
    ctx.write().message_log.push("Beta out".to_string());
    Ok(())
  });

  pipeline.use_fn(|ctx, _next| async move {
    // Innermost step: its continuation is simply dropped, which ends the
    // chain here (there is nothing behind it anyway).
    let mut data = ctx.write();
    data.counter -= 1;
    let msg = format!("Gamma: counter = {}", data.counter);
    info!("{}", msg);
    data.message_log.push(msg);
    Ok(())
  });

  // 3. No typed steps in this example, so an empty resolver scope will do.
  let scope = Registry::new().into_scope();

  // 4. Create an initial context
  let context = ContextCell::new(BasicContext {
    message_log: Vec::new(),
    counter: 5, // Start counter at 5
  });

  // 5. Run the pipeline
  info!("Starting pipeline execution...");
  pipeline.execute(&scope, context.clone()).await?;

  // 6. Inspect the results
  let final_state = context.read();
  info!("Final counter value: {}", final_state.counter);
  info!("Execution log:");
  for log_entry in &final_state.message_log {
    info!("- {}", log_entry);
  }

  // Expected: (5+1)*2 - 1 = 11, with Beta and Alpha unwinding afterwards
  assert_eq!(final_state.counter, 11);
  assert_eq!(final_state.message_log.len(), 5);
  assert_eq!(final_state.message_log.last().map(String::as_str), Some("Alpha out"));

  Ok(())
}
