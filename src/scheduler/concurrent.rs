use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use futures::executor::{ThreadPool, ThreadPoolBuilder};

use super::{wall_clock, Duration, Scheduler, Task, TaskHandle, TaskState};

/// Runs tasks on a futures thread pool. Tasks may run in parallel; use
/// [`SerialScheduler`](super::SerialScheduler) when order matters.
#[derive(Clone)]
pub struct ConcurrentScheduler {
  pool: ThreadPool,
}

impl ConcurrentScheduler {
  /// A pool with one worker per CPU.
  pub fn new() -> std::io::Result<Self> { Self::builder().build() }

  pub fn builder() -> ConcurrentSchedulerBuilder { ConcurrentSchedulerBuilder::default() }
}

#[derive(Debug, Clone, Default)]
pub struct ConcurrentSchedulerBuilder {
  pool_size: Option<usize>,
  name_prefix: Option<String>,
}

impl ConcurrentSchedulerBuilder {
  pub fn pool_size(mut self, size: usize) -> Self {
    self.pool_size = Some(size);
    self
  }

  pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.name_prefix = Some(prefix.into());
    self
  }

  pub fn build(self) -> std::io::Result<ConcurrentScheduler> {
    let mut builder = ThreadPoolBuilder::new();
    if let Some(size) = self.pool_size {
      builder.pool_size(size);
    }
    if let Some(prefix) = self.name_prefix {
      builder.name_prefix(prefix);
    }
    let pool = builder.create()?;
    tracing::debug!(pool_size = ?self.pool_size, "concurrent scheduler created");
    Ok(ConcurrentScheduler { pool })
  }
}

async fn pause(duration: Duration) {
  #[cfg(feature = "timer")]
  futures_time::task::sleep(duration.into()).await;
  #[cfg(not(feature = "timer"))]
  std::thread::sleep(duration);
}

/// Gives the executor a chance to run other futures.
struct YieldNow(bool);

impl Future for YieldNow {
  type Output = ();

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    if self.0 {
      return Poll::Ready(());
    }
    self.0 = true;
    cx.waker().wake_by_ref();
    Poll::Pending
  }
}

impl Scheduler for ConcurrentScheduler {
  #[inline]
  fn now(&self) -> Duration { wall_clock() }

  fn schedule_task(&self, mut task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let h = handle.clone();
    self.pool.spawn_ok(async move {
      if let Some(delay) = delay {
        pause(delay).await;
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
          TaskState::Yield => YieldNow(false).await,
          TaskState::Sleeping(duration) => pause(duration).await,
        }
      }
    });
    handle
  }
}
