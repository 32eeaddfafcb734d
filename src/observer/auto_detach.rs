use std::sync::Arc;

use crate::{
  observer::Observer,
  subscription::{Disposable, SingleAssignmentDisposable},
};

/// Wraps every publicly subscribed observer.
///
/// After forwarding a terminal event it disposes its own subscription slot,
/// so the chain above is torn down as soon as the stream ends. When the
/// terminal event arrives while `subscribe` is still running, the slot is
/// already disposed by the time the subscription is assigned to it, and the
/// handle returned to the caller reports itself disposed.
pub struct AutoDetachObserver<O> {
  observer: O,
  slot: Arc<SingleAssignmentDisposable>,
}

impl<O> AutoDetachObserver<O> {
  pub fn new(observer: O, slot: Arc<SingleAssignmentDisposable>) -> Self {
    AutoDetachObserver { observer, slot }
  }
}

impl<Item, Err, O> Observer<Item, Err> for AutoDetachObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.slot.is_disposed() {
      self.observer.next(value)
    }
  }

  fn error(self, err: Err) {
    if self.slot.is_disposed() {
      return;
    }
    self.observer.error(err);
    self.slot.dispose();
  }

  fn complete(self) {
    if self.slot.is_disposed() {
      return;
    }
    self.observer.complete();
    self.slot.dispose();
  }

  fn is_closed(&self) -> bool { self.slot.is_disposed() || self.observer.is_closed() }
}
