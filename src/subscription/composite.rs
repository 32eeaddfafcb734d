use parking_lot::Mutex;

use crate::{
  bag::{Bag, BagKey},
  subscription::{Disposable, Subscription},
};

#[derive(Default)]
struct State {
  disposed: bool,
  members: Bag<Subscription>,
}

/// A group of subscriptions disposed together.
#[derive(Default)]
pub struct CompositeDisposable(Mutex<State>);

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Adds a member. Returns `None`, after disposing `subscription`, when the
  /// group is already disposed.
  pub fn insert(&self, subscription: Subscription) -> Option<BagKey> {
    let mut state = self.0.lock();
    if state.disposed {
      drop(state);
      subscription.dispose();
      return None;
    }
    Some(state.members.insert(subscription))
  }

  /// Removes and disposes one member.
  pub fn remove(&self, key: BagKey) {
    let removed = self.0.lock().members.remove(key);
    if let Some(removed) = removed {
      removed.dispose();
    }
  }

  pub fn len(&self) -> usize { self.0.lock().members.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let members = {
      let mut state = self.0.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.members.drain()
    };
    for m in members {
      m.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[rxcore_macro::test]
  fn dispose_all_members() {
    let group = CompositeDisposable::new();
    let a = Subscription::new(BooleanDisposable::new());
    let b = Subscription::new(BooleanDisposable::new());
    group.insert(a.clone());
    let key = group.insert(b.clone()).unwrap();
    group.remove(key);
    assert!(b.is_disposed());
    assert_eq!(group.len(), 1);

    group.dispose();
    assert!(a.is_disposed());
    assert!(group.is_empty());

    let late = Subscription::new(BooleanDisposable::new());
    assert!(group.insert(late.clone()).is_none());
    assert!(late.is_disposed());
  }
}
