//! Schedulers: where and when work runs.
//!
//! A [`Scheduler`] accepts [`Task`]s, optionally delayed, and hands back a
//! [`TaskHandle`] that cancels the task. A task is a stepping closure: each
//! step reports whether it is [`TaskState::Finished`], wants to run again
//! right away ([`TaskState::Yield`]) or wants to run again after a pause
//! ([`TaskState::Sleeping`]). Periodic and recursive scheduling are built on
//! that, see [`SchedulerExt`].
//!
//! | Scheduler | Runs work |
//! |-----------|-----------|
//! | [`ImmediateScheduler`] | inline on the calling thread |
//! | [`CurrentThreadScheduler`] | on the calling thread, trampolined |
//! | [`SerialScheduler`] | on one dedicated worker thread, in order |
//! | [`ConcurrentScheduler`] | on a futures thread pool |
//! | `TokioScheduler` | on a tokio runtime (`tokio-scheduler` feature) |
//! | [`VirtualTimeScheduler`] | when a test advances its virtual clock |

use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Instant,
};

pub use std::time::Duration;

use once_cell::sync::Lazy;

use crate::subscription::Disposable;

#[cfg(feature = "futures-scheduler")]
mod concurrent;
mod current_thread;
mod immediate;
mod serial;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod virtual_time;

#[cfg(feature = "futures-scheduler")]
pub use concurrent::{ConcurrentScheduler, ConcurrentSchedulerBuilder};
pub use current_thread::CurrentThreadScheduler;
pub use immediate::ImmediateScheduler;
pub use serial::SerialScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualTimeScheduler;

static CLOCK_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Wall clock shared by the real-time schedulers, as elapsed time since the
/// first time any of them read it.
#[inline]
pub(crate) fn wall_clock() -> Duration { CLOCK_EPOCH.elapsed() }

// ==================== Task ====================

/// What a task wants after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  Finished,
  Yield,
  Sleeping(Duration),
}

/// A unit of schedulable work.
pub struct Task(Box<dyn FnMut() -> TaskState + Send>);

impl Task {
  /// A task that owns `state` and steps `handler` over it.
  pub fn new<S, F>(mut state: S, mut handler: F) -> Self
  where
    S: Send + 'static,
    F: FnMut(&mut S) -> TaskState + Send + 'static,
  {
    Task(Box::new(move || handler(&mut state)))
  }

  pub fn from_fn<F>(step: F) -> Self
  where
    F: FnMut() -> TaskState + Send + 'static,
  {
    Task(Box::new(step))
  }

  /// Runs `action` once.
  pub fn once<F>(action: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    let mut action = Some(action);
    Task::from_fn(move || {
      if let Some(action) = action.take() {
        action();
      }
      TaskState::Finished
    })
  }

  #[inline]
  pub fn step(&mut self) -> TaskState { (self.0)() }
}

// ==================== TaskHandle ====================

#[derive(Default)]
struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
}

/// Cancels a scheduled task. Disposing the handle prevents every future step;
/// a step that is already running completes.
#[derive(Clone, Default)]
pub struct TaskHandle(Arc<HandleState>);

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  #[inline]
  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub(crate) fn mark_finished(&self) { self.0.finished.store(true, Ordering::Release) }
}

impl Disposable for TaskHandle {
  #[inline]
  fn dispose(&self) { self.0.cancelled.store(true, Ordering::Release) }

  #[inline]
  fn is_disposed(&self) -> bool { self.is_cancelled() || self.is_finished() }
}

impl From<TaskHandle> for crate::subscription::Subscription {
  fn from(handle: TaskHandle) -> Self { crate::subscription::Subscription::new(handle) }
}

// ==================== Scheduler ====================

/// Accepts work and runs it at the requested time.
pub trait Scheduler: Send + Sync + 'static {
  /// Current time on this scheduler's clock.
  fn now(&self) -> Duration;

  /// Runs `task` after `delay`, or as soon as possible when `delay` is `None`.
  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  #[inline]
  fn now(&self) -> Duration { (**self).now() }

  #[inline]
  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    (**self).schedule_task(task, delay)
  }
}

/// Convenience scheduling built on [`Scheduler::schedule_task`].
pub trait SchedulerExt: Scheduler {
  fn schedule<F>(&self, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.schedule_task(Task::once(action), None)
  }

  fn schedule_relative<F>(&self, due: Duration, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    self.schedule_task(Task::once(action), Some(due))
  }

  /// Runs `action` first after `start_after`, then every `period` until the
  /// handle is disposed.
  fn schedule_periodic<S, F>(
    &self, state: S, start_after: Duration, period: Duration, mut action: F,
  ) -> TaskHandle
  where
    S: Send + 'static,
    F: FnMut(&mut S) + Send + 'static,
  {
    let task = Task::new(state, move |state| {
      action(state);
      TaskState::Sleeping(period)
    });
    self.schedule_task(task, Some(start_after))
  }

  /// Runs `action` repeatedly over `state` for as long as it asks to run
  /// again. Every repetition goes back through the scheduler, so deep
  /// recursion never grows the stack.
  fn schedule_recursive<S, F>(&self, state: S, action: F) -> TaskHandle
  where
    S: Send + 'static,
    F: FnMut(&mut S) -> TaskState + Send + 'static,
  {
    self.schedule_task(Task::new(state, action), None)
  }
}

impl<T: Scheduler + ?Sized> SchedulerExt for T {}
