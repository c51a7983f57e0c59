// pipework/src/error.rs

use crate::core::resolver::StepKey;
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipeworkError {
  /// The resolver raised while resolving a type-referenced step, or the
  /// resolved instance failed the downcast to this pipeline's action type.
  #[error(
    "cannot resolve step `{key}`: did you register it with the resolver scope, \
     and does it implement `Action` for this pipeline's context? Source: {source}"
  )]
  ResolutionFailure {
    key: StepKey,
    #[source]
    source: AnyhowError,
  },

  /// The resolver yielded no instance for a type-referenced step.
  #[error("resolver returned no instance for step `{key}`")]
  NullResolution { key: StepKey },

  /// An ad-hoc failure raised by a step's own execution, for pipelines that
  /// use `PipeworkError` directly as their error type.
  #[error("step execution failed: {source}")]
  StepFailure {
    #[source]
    source: AnyhowError,
  },
}

// The key conversion pipework provides for external errors: steps written
// against `anyhow` bubble up as StepFailure, without double-wrapping causes
// that already are PipeworkError.
impl From<AnyhowError> for PipeworkError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<PipeworkError>() {
      Ok(already) => already,
      Err(other) => PipeworkError::StepFailure { source: other },
    }
  }
}

pub type PipeworkResult<T, E = PipeworkError> = std::result::Result<T, E>;
