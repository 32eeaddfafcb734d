use super::{wall_clock, Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::{error::ContractViolation, subscription::Disposable};

/// Runs every task inline, on the thread that schedules it. Delays block the
/// calling thread.
///
/// A task that asks to sleep between steps, such as a periodic one, would
/// never hand its handle back to the caller. It is stopped after its first
/// step and [`ContractViolation::UnsupportedRepeat`] is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  #[inline]
  fn now(&self) -> Duration { wall_clock() }

  fn schedule_task(&self, mut task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    if let Some(delay) = delay {
      std::thread::sleep(delay);
    }
    loop {
      match task.step() {
        TaskState::Finished => {
          handle.mark_finished();
          break;
        }
        TaskState::Yield => {}
        TaskState::Sleeping(_) => {
          tracing::error!("{}", ContractViolation::UnsupportedRepeat);
          handle.dispose();
          break;
        }
      }
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::scheduler::SchedulerExt;

  use super::*;

  #[rxcore_macro::test]
  fn runs_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let handle = ImmediateScheduler.schedule(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(handle.is_disposed());
  }

  #[rxcore_macro::test]
  fn recursive_until_finished() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    ImmediateScheduler.schedule_recursive(0, move |n| {
      *n += 1;
      c_hits.fetch_add(1, Ordering::SeqCst);
      if *n == 5 { TaskState::Finished } else { TaskState::Yield }
    });
    assert_eq!(hits.load(Ordering::SeqCst), 5);
  }

  #[rxcore_macro::test]
  fn periodic_work_is_rejected() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let mut handle = None;
    let errors = crate::testing::capture_logs(tracing::Level::ERROR, || {
      handle = Some(ImmediateScheduler.schedule_periodic((), Duration::ZERO, Duration::from_millis(1), move |_| {
        c_hits.fetch_add(1, Ordering::SeqCst);
      }));
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(handle.map_or(false, |h| h.is_cancelled()));
    assert_eq!(errors, vec![ContractViolation::UnsupportedRepeat.to_string()]);
  }
}
