use std::convert::Infallible;

use parking_lot::ReentrantMutex;

use super::BehaviorSubject;
use crate::observable::{BoxedObservable, Observable};

/// A mutable value whose changes can be observed.
///
/// Backed by a [`BehaviorSubject`] that never fails. Observers receive the
/// current value on subscription and every later assignment. Dropping the
/// variable completes every observer.
///
/// Writes are serialized: [`update`](Self::update) reads, applies and stores
/// under one lock, so concurrent updaters never lose a write. An observer may
/// write back to the variable from its callback on the same thread.
///
/// ```
/// use rxcore::prelude::*;
///
/// let name = Variable::new("ann".to_owned());
/// name.as_observable().subscribe(|v| println!("name is {v}"));
/// name.set("bob".to_owned());
/// assert_eq!(name.get(), "bob");
/// ```
pub struct Variable<Item>
where
  Item: Clone + Send + 'static,
{
  subject: BehaviorSubject<Item, Infallible>,
  write: ReentrantMutex<()>,
}

impl<Item> Variable<Item>
where
  Item: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self {
    Variable { subject: BehaviorSubject::new(initial), write: ReentrantMutex::new(()) }
  }

  pub fn get(&self) -> Item { self.subject.current() }

  pub fn set(&self, value: Item) {
    let _write = self.write.lock();
    self.subject.next(value)
  }

  /// Applies `f` to the current value and stores the result atomically with
  /// respect to other writers.
  pub fn update(&self, f: impl FnOnce(Item) -> Item) {
    let _write = self.write.lock();
    let value = f(self.subject.current());
    self.subject.next(value)
  }

  /// Observes the current value and every change, until the variable is
  /// dropped. The returned observable is read-only.
  pub fn as_observable(&self) -> BoxedObservable<Item, Infallible> { self.subject.clone().box_it() }
}

impl<Item> Drop for Variable<Item>
where
  Item: Clone + Send + 'static,
{
  fn drop(&mut self) { self.subject.complete() }
}
