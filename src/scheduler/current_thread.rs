//! Trampolining scheduler for the calling thread.
//!
//! The first task scheduled on a thread runs immediately and becomes the
//! trampoline owner; tasks scheduled while it runs (on the same thread) are
//! queued and run, in order, after it returns. Recursive work therefore runs
//! in a loop instead of growing the stack.

use std::{cell::RefCell, collections::VecDeque};

use super::{wall_clock, Duration, Scheduler, Task, TaskHandle, TaskState};

struct Queued {
  task: Task,
  handle: TaskHandle,
  delay: Option<Duration>,
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<VecDeque<Queued>>> = const { RefCell::new(None) };
}

/// Releases the trampoline even if a task panics.
struct TrampolineOwner;

impl Drop for TrampolineOwner {
  fn drop(&mut self) { TRAMPOLINE.with(|t| *t.borrow_mut() = None) }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// `true` when no trampoline is running on this thread, meaning the next
  /// scheduled task would run immediately.
  pub fn is_schedule_required() -> bool { TRAMPOLINE.with(|t| t.borrow().is_none()) }

  fn run_one(queued: Queued) {
    let Queued { mut task, handle, delay } = queued;
    if handle.is_cancelled() {
      return;
    }
    if let Some(delay) = delay {
      std::thread::sleep(delay);
      if handle.is_cancelled() {
        return;
      }
    }
    let again = match task.step() {
      TaskState::Finished => {
        handle.mark_finished();
        return;
      }
      TaskState::Yield => None,
      TaskState::Sleeping(pause) => Some(pause),
    };
    TRAMPOLINE.with(|t| {
      if let Some(queue) = t.borrow_mut().as_mut() {
        queue.push_back(Queued { task, handle, delay: again });
      }
    });
  }
}

impl Scheduler for CurrentThreadScheduler {
  #[inline]
  fn now(&self) -> Duration { wall_clock() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let queued = Queued { task, handle: handle.clone(), delay };
    let owner = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      match t.as_mut() {
        Some(queue) => {
          queue.push_back(queued);
          None
        }
        None => {
          *t = Some(VecDeque::from([queued]));
          Some(TrampolineOwner)
        }
      }
    });

    if let Some(_owner) = owner {
      tracing::trace!("trampoline start");
      while let Some(next) = TRAMPOLINE.with(|t| t.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
        Self::run_one(next);
      }
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::scheduler::SchedulerExt;

  #[rxcore_macro::test]
  fn nested_work_is_queued() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    CurrentThreadScheduler.schedule(move || {
      c_log.lock().unwrap().push("outer start");
      let inner_log = c_log.clone();
      CurrentThreadScheduler.schedule(move || inner_log.lock().unwrap().push("inner"));
      assert!(!CurrentThreadScheduler::is_schedule_required());
      c_log.lock().unwrap().push("outer end");
    });
    assert!(CurrentThreadScheduler::is_schedule_required());
    assert_eq!(*log.lock().unwrap(), vec!["outer start", "outer end", "inner"]);
  }

  #[rxcore_macro::test]
  fn deep_recursion_does_not_grow_stack() {
    fn hop(n: u32, total: Arc<Mutex<u32>>) {
      *total.lock().unwrap() += 1;
      if n > 0 {
        CurrentThreadScheduler.schedule(move || hop(n - 1, total));
      }
    }
    let total = Arc::new(Mutex::new(0));
    let c_total = total.clone();
    CurrentThreadScheduler.schedule(move || hop(100_000, c_total));
    assert_eq!(*total.lock().unwrap(), 100_001);
  }
}
