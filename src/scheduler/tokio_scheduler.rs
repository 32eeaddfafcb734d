use tokio::runtime::{Handle, TryCurrentError};

use super::{wall_clock, Duration, Scheduler, Task, TaskHandle, TaskState};

/// Runs tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  runtime: Handle,
}

impl TokioScheduler {
  pub fn new(runtime: Handle) -> Self { TokioScheduler { runtime } }

  /// The runtime the caller is running in.
  pub fn try_current() -> Result<Self, TryCurrentError> { Handle::try_current().map(Self::new) }
}

impl Scheduler for TokioScheduler {
  #[inline]
  fn now(&self) -> Duration { wall_clock() }

  fn schedule_task(&self, mut task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let h = handle.clone();
    self.runtime.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      loop {
        if h.is_cancelled() {
          return;
        }
        match task.step() {
          TaskState::Finished => {
            h.mark_finished();
            return;
          }
          TaskState::Yield => tokio::task::yield_now().await,
          TaskState::Sleeping(duration) => tokio::time::sleep(duration).await,
        }
      }
    });
    handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scheduler::SchedulerExt;

  #[rxcore_macro::test(shared)]
  async fn runs_delayed_task() {
    let scheduler = TokioScheduler::try_current().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.schedule_relative(Duration::from_millis(5), move || {
      let _ = tx.send(42);
    });
    assert_eq!(rx.await.unwrap(), 42);
  }
}
