use std::{
  fmt::Display,
  sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;

use crate::subscription::Disposable;

type Teardown = Box<dyn FnOnce() + Send>;

/// Runs a teardown closure once, on the first `dispose`.
pub struct AnonymousDisposable {
  disposed: AtomicBool,
  teardown: Mutex<Option<Teardown>>,
}

impl AnonymousDisposable {
  pub fn new<F>(teardown: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    AnonymousDisposable { disposed: AtomicBool::new(false), teardown: Mutex::new(Some(Box::new(teardown))) }
  }

  /// Teardown that may fail. A failure is logged and otherwise ignored:
  /// disposal itself never fails.
  pub fn fallible<F, E>(teardown: F) -> Self
  where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: Display,
  {
    AnonymousDisposable::new(move || {
      if let Err(err) = teardown() {
        tracing::warn!(error = %err, "teardown failed during dispose");
      }
    })
  }
}

impl Disposable for AnonymousDisposable {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let teardown = self.teardown.lock().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
  use std::sync::{atomic::AtomicUsize, Arc};

  use super::*;

  #[rxcore_macro::test]
  fn runs_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let d = AnonymousDisposable::new(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    d.dispose();
    d.dispose();
    assert!(d.is_disposed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn failing_teardown_is_swallowed() {
    let d = AnonymousDisposable::fallible(|| Err::<(), _>("socket already closed"));
    d.dispose();
    assert!(d.is_disposed());
  }

  #[rxcore_macro::test]
  fn concurrent_dispose_runs_teardown_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let d = Arc::new(AnonymousDisposable::new(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    }));
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let d = d.clone();
        std::thread::spawn(move || d.dispose())
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }
}
