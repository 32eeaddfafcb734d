use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::subscription::{Disposable, Subscription};

struct State {
  underlying: Option<Subscription>,
  primary_disposed: bool,
  dependents: usize,
}

/// Disposes the underlying subscription only once the primary handle has
/// been disposed and every dependent handle from [`retain`] is released.
///
/// [`retain`]: RefCountDisposable::retain
#[derive(Clone)]
pub struct RefCountDisposable(Arc<Mutex<State>>);

impl RefCountDisposable {
  pub fn new(underlying: Subscription) -> Self {
    RefCountDisposable(Arc::new(Mutex::new(State {
      underlying: Some(underlying),
      primary_disposed: false,
      dependents: 0,
    })))
  }

  /// A dependent handle. Returns an already disposed subscription when the
  /// underlying resource is gone.
  pub fn retain(&self) -> Subscription {
    let mut state = self.0.lock();
    if state.underlying.is_none() {
      return Subscription::disposed();
    }
    state.dependents += 1;
    Subscription::new(Dependent { owner: self.0.clone(), released: AtomicBool::new(false) })
  }
}

impl Disposable for RefCountDisposable {
  fn dispose(&self) {
    let underlying = {
      let mut state = self.0.lock();
      if state.primary_disposed {
        return;
      }
      state.primary_disposed = true;
      if state.dependents == 0 { state.underlying.take() } else { None }
    };
    if let Some(underlying) = underlying {
      underlying.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().underlying.is_none() }
}

struct Dependent {
  owner: Arc<Mutex<State>>,
  released: AtomicBool,
}

impl Disposable for Dependent {
  fn dispose(&self) {
    if self.released.swap(true, Ordering::AcqRel) {
      return;
    }
    let underlying = {
      let mut state = self.owner.lock();
      state.dependents -= 1;
      if state.primary_disposed && state.dependents == 0 { state.underlying.take() } else { None }
    };
    if let Some(underlying) = underlying {
      underlying.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.released.load(Ordering::Acquire) }
}
