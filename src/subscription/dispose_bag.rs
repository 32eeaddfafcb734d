use parking_lot::Mutex;

use crate::subscription::{Disposable, Subscription};

/// Owns subscriptions and disposes all of them when dropped.
#[derive(Default)]
pub struct DisposeBag(Mutex<Vec<Subscription>>);

impl DisposeBag {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&self, subscription: Subscription) { self.0.lock().push(subscription) }

  pub fn len(&self) -> usize { self.0.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Drop for DisposeBag {
  fn drop(&mut self) {
    for sub in self.0.get_mut().drain(..) {
      sub.dispose();
    }
  }
}

/// Disposes one subscription when dropped.
#[must_use = "dropping the guard disposes the subscription immediately"]
pub struct DisposeGuard(Subscription);

impl DisposeGuard {
  pub fn new(subscription: Subscription) -> Self { DisposeGuard(subscription) }

  /// Gives the subscription back without disposing it.
  pub fn into_inner(mut self) -> Subscription { std::mem::take(&mut self.0) }
}

impl Drop for DisposeGuard {
  fn drop(&mut self) { self.0.dispose() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[rxcore_macro::test]
  fn bag_disposes_on_drop() {
    let a = Subscription::new(BooleanDisposable::new());
    let b = Subscription::new(BooleanDisposable::new());
    {
      let bag = DisposeBag::new();
      a.clone().disposed_by(&bag);
      b.clone().disposed_by(&bag);
      assert_eq!(bag.len(), 2);
      assert!(!a.is_disposed());
    }
    assert!(a.is_disposed() && b.is_disposed());
  }

  #[rxcore_macro::test]
  fn guard() {
    let a = Subscription::new(BooleanDisposable::new());
    drop(a.clone().into_guard());
    assert!(a.is_disposed());

    let b = Subscription::new(BooleanDisposable::new());
    let kept = b.clone().into_guard().into_inner();
    assert!(!kept.is_disposed());
  }
}
