use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{
  scheduler::{Scheduler, SchedulerExt},
  subscription::{Disposable, Subscription},
};

/// Disposes its underlying subscription on `scheduler` rather than on the
/// thread that called `dispose`.
pub struct ScheduledDisposable<S> {
  scheduler: S,
  disposed: AtomicBool,
  inner: Mutex<Option<Subscription>>,
}

impl<S: Scheduler> ScheduledDisposable<S> {
  pub fn new(scheduler: S, inner: Subscription) -> Self {
    ScheduledDisposable {
      scheduler,
      disposed: AtomicBool::new(false),
      inner: Mutex::new(Some(inner)),
    }
  }
}

impl<S: Scheduler> Disposable for ScheduledDisposable<S> {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(inner) = self.inner.lock().take() {
      self.scheduler.schedule(move || inner.dispose());
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    scheduler::{Duration, VirtualTimeScheduler},
    subscription::BooleanDisposable,
  };

  #[rxcore_macro::test]
  fn disposes_on_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let inner = Subscription::new(BooleanDisposable::new());
    let scheduled = ScheduledDisposable::new(scheduler.clone(), inner.clone());
    scheduled.dispose();
    assert!(scheduled.is_disposed());
    assert!(!inner.is_disposed());
    scheduler.advance_by(Duration::from_millis(1)).unwrap();
    assert!(inner.is_disposed());
  }

  #[rxcore_macro::test]
  fn second_dispose_schedules_nothing() {
    let scheduler = VirtualTimeScheduler::new();
    let scheduled = ScheduledDisposable::new(scheduler.clone(), Subscription::new(BooleanDisposable::new()));
    scheduled.dispose();
    scheduled.dispose();
    assert_eq!(scheduler.pending_count(), 1);
  }
}
