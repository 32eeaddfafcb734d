use thiserror::Error;

/// Programming-contract violations.
///
/// These are reported to the caller of the offending API as `Result` values
/// (or logged when no caller can receive them). They are never delivered
/// through a stream's `error` channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
  #[error("single assignment disposable was already assigned")]
  AlreadyAssigned,
  #[error("replay buffer size must be greater than zero")]
  InvalidBufferSize,
  #[error("virtual time scheduler is already running")]
  SchedulerAlreadyRunning,
  #[error("subject has been disposed")]
  SubjectDisposed,
  #[error("subject has already terminated")]
  SubjectTerminated,
  #[error("scheduler cannot run a task that sleeps between steps")]
  UnsupportedRepeat,
  #[error("binding error: {0}")]
  BindingError(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn messages() {
    assert_eq!(
      ContractViolation::InvalidBufferSize.to_string(),
      "replay buffer size must be greater than zero"
    );
    assert_eq!(
      ContractViolation::BindingError("boom".into()).to_string(),
      "binding error: boom"
    );
  }
}
