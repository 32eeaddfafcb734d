use parking_lot::Mutex;

use crate::subscription::{Disposable, Subscription};

#[derive(Default)]
struct State {
  disposed: bool,
  current: Option<Subscription>,
}

/// Holds one replaceable subscription. Setting a new one disposes the
/// previous; after disposal every new one is disposed immediately.
#[derive(Default)]
pub struct SerialDisposable(Mutex<State>);

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, subscription: Subscription) {
    let previous = {
      let mut state = self.0.lock();
      if state.disposed {
        None
      } else {
        Some(state.current.replace(subscription.clone()))
      }
    };
    match previous {
      Some(Some(previous)) => previous.dispose(),
      Some(None) => {}
      None => subscription.dispose(),
    }
  }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut state = self.0.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[rxcore_macro::test]
  fn replacing_disposes_previous() {
    let serial = SerialDisposable::new();
    let a = Subscription::new(BooleanDisposable::new());
    let b = Subscription::new(BooleanDisposable::new());
    serial.set(a.clone());
    serial.set(b.clone());
    assert!(a.is_disposed());
    assert!(!b.is_disposed());

    serial.dispose();
    assert!(b.is_disposed());

    let c = Subscription::new(BooleanDisposable::new());
    serial.set(c.clone());
    assert!(c.is_disposed());
  }
}
