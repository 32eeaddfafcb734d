//! Deterministic scheduler driven by a virtual clock.
//!
//! Nothing runs until the owner moves the clock with
//! [`advance_by`](VirtualTimeScheduler::advance_by),
//! [`advance_to`](VirtualTimeScheduler::advance_to) or
//! [`start`](VirtualTimeScheduler::start). Tasks due at the same instant run
//! in submission order, on the thread that moves the clock.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use parking_lot::Mutex;

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::error::ContractViolation;

struct Entry {
  due: Duration,
  seq: u64,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct State {
  clock: Duration,
  heap: BinaryHeap<Entry>,
  next_seq: u64,
  running: bool,
  stop_requested: bool,
}

impl State {
  fn push(&mut self, due: Duration, task: Task, handle: TaskHandle) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(Entry { due, seq, task, handle });
  }
}

/// Clones share one clock and one queue.
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler(Arc<Mutex<State>>);

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// Runs every task due up to and including `target`, then sets the clock
  /// to `target`. The clock never moves backwards.
  pub fn advance_to(&self, target: Duration) -> Result<(), ContractViolation> {
    self.run(Some(target))
  }

  pub fn advance_by(&self, by: Duration) -> Result<(), ContractViolation> {
    let target = self.now() + by;
    self.advance_to(target)
  }

  /// Runs tasks until the queue is empty or [`stop`](Self::stop) is called.
  /// A periodic task keeps the queue non-empty, so it must be disposed or
  /// stopped from inside a task.
  pub fn start(&self) -> Result<(), ContractViolation> { self.run(None) }

  /// Makes the running `start` or `advance_*` call return after the current
  /// task.
  pub fn stop(&self) { self.0.lock().stop_requested = true }

  /// Tasks still queued, including cancelled ones not yet discarded.
  pub fn pending_count(&self) -> usize { self.0.lock().heap.len() }

  fn run(&self, target: Option<Duration>) -> Result<(), ContractViolation> {
    {
      let mut state = self.0.lock();
      if state.running {
        return Err(ContractViolation::SchedulerAlreadyRunning);
      }
      state.running = true;
      state.stop_requested = false;
    }
    tracing::debug!(?target, "virtual clock running");

    loop {
      let entry = {
        let mut state = self.0.lock();
        let due_now = !state.stop_requested
          && state.heap.peek().map_or(false, |top| target.map_or(true, |t| top.due <= t));
        if !due_now {
          if let Some(target) = target {
            if !state.stop_requested && target > state.clock {
              state.clock = target;
            }
          }
          state.running = false;
          break;
        }
        match state.heap.pop() {
          Some(entry) => {
            if entry.due > state.clock {
              state.clock = entry.due;
            }
            entry
          }
          None => continue,
        }
      };

      let Entry { mut task, handle, .. } = entry;
      if handle.is_cancelled() {
        continue;
      }
      match task.step() {
        TaskState::Finished => handle.mark_finished(),
        TaskState::Yield => {
          let mut state = self.0.lock();
          let due = state.clock;
          state.push(due, task, handle);
        }
        TaskState::Sleeping(pause) => {
          let mut state = self.0.lock();
          let due = state.clock + pause;
          state.push(due, task, handle);
        }
      }
    }
    Ok(())
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration { self.0.lock().clock }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.0.lock();
    let due = state.clock + delay.unwrap_or_default();
    state.push(due, task, handle.clone());
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::{scheduler::SchedulerExt, subscription::Disposable};

  fn ms(v: u64) -> Duration { Duration::from_millis(v) }

  #[rxcore_macro::test]
  fn runs_in_due_order() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    for (at, tag) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
      let log = log.clone();
      let clock = scheduler.clone();
      scheduler.schedule_relative(ms(at), move || log.lock().unwrap().push((tag, clock.now())));
    }
    scheduler.advance_by(ms(15)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![("a", ms(10)), ("a2", ms(10))]);
    assert_eq!(scheduler.now(), ms(15));

    scheduler.start().unwrap();
    assert_eq!(log.lock().unwrap().len(), 4);
    assert_eq!(scheduler.now(), ms(30));
  }

  #[rxcore_macro::test]
  fn periodic_until_disposed() {
    let scheduler = VirtualTimeScheduler::new();
    let ticks = Arc::new(Mutex::new(vec![]));
    let c_ticks = ticks.clone();
    let clock = scheduler.clone();
    let handle = scheduler.schedule_periodic((), ms(5), ms(10), move |_| {
      c_ticks.lock().unwrap().push(clock.now())
    });
    scheduler.advance_to(ms(30)).unwrap();
    handle.dispose();
    scheduler.advance_to(ms(100)).unwrap();
    assert_eq!(*ticks.lock().unwrap(), vec![ms(5), ms(15), ms(25)]);
  }

  #[rxcore_macro::test]
  fn reentrant_advance_is_rejected() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = scheduler.clone();
    let result = Arc::new(Mutex::new(None));
    let c_result = result.clone();
    scheduler.schedule(move || *c_result.lock().unwrap() = Some(inner.advance_by(ms(1))));
    scheduler.start().unwrap();
    assert_eq!(*result.lock().unwrap(), Some(Err(ContractViolation::SchedulerAlreadyRunning)));
  }

  #[rxcore_macro::test]
  fn stop_from_inside_a_task() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = scheduler.clone();
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    scheduler.schedule_periodic((), ms(1), ms(1), move |_| {
      let mut n = c_count.lock().unwrap();
      *n += 1;
      if *n == 4 {
        inner.stop();
      }
    });
    scheduler.start().unwrap();
    assert_eq!(*count.lock().unwrap(), 4);
    assert_eq!(scheduler.pending_count(), 1);
  }
}
