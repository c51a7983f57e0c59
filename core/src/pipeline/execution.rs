// pipework/src/pipeline/execution.rs

//! Contains `Pipeline::execute()` and the `Middleware` impl: one fresh chain
//! state per call, then the lazy continuation walk does the rest.

use crate::core::chain::NextBuilder;
use crate::core::context::ContextCell;
use crate::core::middleware::Middleware;
use crate::core::resolver::ScopeHandle;
use crate::error::PipeworkError;
use crate::pipeline::definition::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

impl<C, Err> Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  /// Executes the chain against `ctx`, resolving type-referenced steps from
  /// `scope`.
  ///
  /// Every call builds its own cursor and chain state over the shared step
  /// list, so concurrent executions of one pipeline never observe each
  /// other. The first continuation is minted and run here; each step then
  /// decides whether the walk continues. An empty pipeline completes
  /// immediately with `Ok(())`.
  ///
  /// Errors — resolution failures and step failures alike — unwind the whole
  /// in-flight chain and surface here unchanged.
  #[instrument(
        name = "Pipeline::execute",
        skip_all,
        fields(
            context_type = %std::any::type_name::<C>(),
            error_type = %std::any::type_name::<Err>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn execute(&self, scope: &ScopeHandle, ctx: ContextCell<C>) -> Result<(), Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    let chain = NextBuilder::new(Arc::clone(&self.steps), Arc::clone(scope));
    let result = chain.next().run(ctx).await;

    match &result {
      Ok(()) => event!(Level::DEBUG, "Pipeline execution completed."),
      Err(e) => event!(Level::ERROR, error = %e, "Pipeline execution failed."),
    }
    result
  }
}

#[async_trait]
impl<C, Err> Middleware<C, Err> for Pipeline<C, Err>
where
  C: Send + Sync + 'static,
  Err: std::error::Error + From<PipeworkError> + Send + Sync + 'static,
{
  async fn execute(&self, scope: &ScopeHandle, ctx: ContextCell<C>) -> Result<(), Err> {
    Pipeline::execute(self, scope, ctx).await
  }
}
