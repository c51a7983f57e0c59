// pipework/examples/scoped_lifetimes.rs

use async_trait::async_trait;
use pipework::{
  Action, ContextCell, Disposable, Lifetime, Next, PipeworkError, Registry, ScopedPipeline,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Debug, Default)]
struct JobContext {
  job_id: u32,
  log: Vec<String>,
}

/// Stands in for something expensive and shared, like a metrics client.
/// Registered as a singleton: built once, never released.
struct MetricsSink {
  handled: AtomicUsize,
  disposals: Arc<AtomicUsize>,
}

#[async_trait]
impl Action<JobContext> for MetricsSink {
  async fn execute(
    &self,
    ctx: ContextCell<JobContext>,
    next: Next<JobContext>,
  ) -> Result<(), PipeworkError> {
    let seen = self.handled.fetch_add(1, Ordering::SeqCst) + 1;
    info!("MetricsSink has now seen {} jobs", seen);
    next.run(ctx).await
  }
}

impl Disposable for MetricsSink {
  fn dispose(&self) {
    // Singletons outlive every call scope, so this never fires.
    self.disposals.fetch_add(1, Ordering::SeqCst);
  }
}

/// Stands in for something transient and releasable, like a checked-out
/// connection. Registered per-call: one per job, closed when the job ends.
struct UnitOfWork {
  serial: usize,
  closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Action<JobContext> for UnitOfWork {
  async fn execute(
    &self,
    ctx: ContextCell<JobContext>,
    next: Next<JobContext>,
  ) -> Result<(), PipeworkError> {
    ctx.write().log.push(format!("uow-{}", self.serial));
    next.run(ctx).await
  }
}

impl Disposable for UnitOfWork {
  fn dispose(&self) {
    info!("UnitOfWork #{} closed", self.serial);
    self.closed.fetch_add(1, Ordering::SeqCst);
  }
}

#[tokio::main]
async fn main() -> Result<(), PipeworkError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Scoped Lifetimes Example ---");

  // Counters shared with the factories, so the end of main can check what
  // actually got built and released.
  let sink_builds = Arc::new(AtomicUsize::new(0));
  let sink_disposals = Arc::new(AtomicUsize::new(0));
  let uow_serials = Arc::new(AtomicUsize::new(0));
  let uow_closed = Arc::new(AtomicUsize::new(0));

  // 1. Register both lifetimes
  let mut registry = Registry::new();
  let builds = Arc::clone(&sink_builds);
  let disposals = Arc::clone(&sink_disposals);
  registry.provide_disposable(Lifetime::Singleton, move |_| {
    builds.fetch_add(1, Ordering::SeqCst);
    info!("MetricsSink built (expect exactly one of these)");
    Ok(MetricsSink {
      handled: AtomicUsize::new(0),
      disposals: Arc::clone(&disposals),
    })
  });
  let serials = Arc::clone(&uow_serials);
  let closed = Arc::clone(&uow_closed);
  registry.provide_disposable(Lifetime::PerCall, move |_| {
    let serial = serials.fetch_add(1, Ordering::SeqCst) + 1;
    info!("UnitOfWork #{} opened", serial);
    Ok(UnitOfWork {
      serial,
      closed: Arc::clone(&closed),
    })
  });
  let scope = registry.into_scope();

  // 2. A ScopedPipeline opens a child scope per execute() and tears it
  //    down when the call finishes, releasing that call's per-call steps.
  let mut pipeline = ScopedPipeline::<JobContext>::new();
  pipeline.add::<MetricsSink>();
  pipeline.add::<UnitOfWork>();
  pipeline.use_fn(|ctx, _next| async move {
    let mut data = ctx.write();
    let entry = format!("job-{} done", data.job_id);
    data.log.push(entry);
    Ok(())
  });

  // 3. Run three jobs through the same definition
  for job_id in 1..=3 {
    info!("--- Job {} ---", job_id);
    let ctx = ContextCell::new(JobContext {
      job_id,
      ..Default::default()
    });
    pipeline.execute(&scope, ctx.clone()).await?;
    info!("Job {} log: {:?}", job_id, ctx.read().log);
  }

  // 4. Three jobs, three units of work opened and closed; one sink, still
  //    alive.
  assert_eq!(uow_serials.load(Ordering::SeqCst), 3);
  assert_eq!(uow_closed.load(Ordering::SeqCst), 3);
  assert_eq!(sink_builds.load(Ordering::SeqCst), 1);
  assert_eq!(sink_disposals.load(Ordering::SeqCst), 0);

  // 5. Even tearing down the root scope leaves the singleton alone.
  drop(scope);
  assert_eq!(sink_disposals.load(Ordering::SeqCst), 0);
  info!("All jobs done; every UnitOfWork was closed with its own call.");

  Ok(())
}
