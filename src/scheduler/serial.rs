use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::Arc,
  time::Instant,
};

use parking_lot::{Condvar, Mutex};

use super::{wall_clock, Duration, Scheduler, Task, TaskHandle, TaskState};

// ==================== Queue ====================

struct Entry {
  due: Instant,
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
    // Min-heap: earlier due first, then FIFO by submission
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct Queue {
  heap: BinaryHeap<Entry>,
  next_seq: u64,
  shutdown: bool,
}

#[derive(Default)]
struct Shared {
  queue: Mutex<Queue>,
  wakeup: Condvar,
}

impl Shared {
  fn push(&self, due: Instant, task: Task, handle: TaskHandle) {
    let mut q = self.queue.lock();
    let seq = q.next_seq;
    q.next_seq += 1;
    q.heap.push(Entry { due, seq, task, handle });
    drop(q);
    self.wakeup.notify_one();
  }

  fn next_due(&self) -> Option<Entry> {
    let mut q = self.queue.lock();
    loop {
      if q.shutdown {
        return None;
      }
      let due = match q.heap.peek() {
        Some(top) => top.due,
        None => {
          self.wakeup.wait(&mut q);
          continue;
        }
      };
      if due <= Instant::now() {
        return q.heap.pop();
      }
      self.wakeup.wait_until(&mut q, due);
    }
  }

  fn work(self: Arc<Self>) {
    tracing::debug!("serial scheduler worker started");
    while let Some(Entry { mut task, handle, .. }) = self.next_due() {
      if handle.is_cancelled() {
        continue;
      }
      match task.step() {
        TaskState::Finished => handle.mark_finished(),
        TaskState::Yield => self.push(Instant::now(), task, handle),
        TaskState::Sleeping(pause) => self.push(Instant::now() + pause, task, handle),
      }
    }
    tracing::debug!("serial scheduler worker stopped");
  }
}

/// Stops the worker once the last scheduler handle is gone.
struct Owner(Arc<Shared>);

impl Drop for Owner {
  fn drop(&mut self) {
    self.0.queue.lock().shutdown = true;
    self.0.wakeup.notify_all();
  }
}

// ==================== SerialScheduler ====================

/// Runs tasks one at a time on a dedicated worker thread, ordered by due
/// time and then by submission order.
///
/// Clones share the worker. When the last clone is dropped the worker exits
/// and tasks still queued are dropped without running.
#[derive(Clone)]
pub struct SerialScheduler {
  shared: Arc<Shared>,
  _owner: Arc<Owner>,
}

impl SerialScheduler {
  pub fn new() -> Self {
    let shared = Arc::new(Shared::default());
    let worker = shared.clone();
    std::thread::spawn(move || worker.work());
    Self::from_shared(shared)
  }

  /// Like [`SerialScheduler::new`] with a named worker thread.
  pub fn with_name(name: impl Into<String>) -> std::io::Result<Self> {
    let shared = Arc::new(Shared::default());
    let worker = shared.clone();
    std::thread::Builder::new().name(name.into()).spawn(move || worker.work())?;
    Ok(Self::from_shared(shared))
  }

  fn from_shared(shared: Arc<Shared>) -> Self {
    SerialScheduler { _owner: Arc::new(Owner(shared.clone())), shared }
  }
}

impl Default for SerialScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for SerialScheduler {
  #[inline]
  fn now(&self) -> Duration { wall_clock() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let due = Instant::now() + delay.unwrap_or_default();
    self.shared.push(due, task, handle.clone());
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use super::*;
  use crate::{scheduler::SchedulerExt, subscription::Disposable};

  #[rxcore_macro::test]
  fn runs_in_submission_order_on_one_thread() {
    let scheduler = SerialScheduler::with_name("serial-test").unwrap();
    let (tx, rx) = mpsc::channel();
    for i in 0..10 {
      let tx = tx.clone();
      scheduler.schedule(move || {
        tx.send((i, std::thread::current().name().map(str::to_owned))).unwrap();
      });
    }
    let got: Vec<_> = rx.iter().take(10).collect();
    assert_eq!(got.iter().map(|(i, _)| *i).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    assert!(got.iter().all(|(_, name)| name.as_deref() == Some("serial-test")));
  }

  #[rxcore_macro::test]
  fn earlier_due_runs_first() {
    let scheduler = SerialScheduler::new();
    let (tx, rx) = mpsc::channel();
    let late = tx.clone();
    scheduler.schedule_relative(Duration::from_millis(40), move || late.send("late").unwrap());
    scheduler.schedule_relative(Duration::from_millis(5), move || tx.send("early").unwrap());
    let got: Vec<_> = rx.iter().take(2).collect();
    assert_eq!(got, vec!["early", "late"]);
  }

  #[rxcore_macro::test]
  fn cancelled_task_never_runs() {
    let scheduler = SerialScheduler::new();
    let (tx, rx) = mpsc::channel();
    let cancelled = tx.clone();
    let handle = scheduler.schedule_relative(Duration::from_millis(20), move || {
      cancelled.send("cancelled").unwrap()
    });
    handle.dispose();
    scheduler.schedule_relative(Duration::from_millis(40), move || tx.send("kept").unwrap());
    assert_eq!(rx.recv().unwrap(), "kept");
    assert!(rx.try_recv().is_err());
  }
}
