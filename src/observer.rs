//! Observer trait and implementations
//!
//! An observer receives the grammar `next* (error | complete)?`. The terminal
//! methods take `self` by value, so a concrete observer cannot be told to
//! terminate twice.

use std::convert::Infallible;

use crate::event::Event;

mod auto_detach;
pub use auto_detach::AutoDetachObserver;

// ============================================================================
// Observer Trait
// ============================================================================

pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  /// Consumes the observer: nothing may follow an error.
  fn error(self, err: Err);

  /// Consumes the observer: nothing may follow completion.
  fn complete(self);

  /// `true` once the observer will not accept more values. Synchronous
  /// sources check it to stop emitting early.
  fn is_closed(&self) -> bool;
}

/// Forwards `event` into the observer held in `slot`, taking the observer
/// out on a terminal event.
pub fn deliver<O, Item, Err>(slot: &mut Option<O>, event: Event<Item, Err>)
where
  O: Observer<Item, Err>,
{
  match event {
    Event::Next(v) => {
      if let Some(o) = slot.as_mut() {
        o.next(v)
      }
    }
    Event::Error(e) => {
      if let Some(o) = slot.take() {
        o.error(e)
      }
    }
    Event::Completed => {
      if let Some(o) = slot.take() {
        o.complete()
      }
    }
  }
}

impl<Item, Err, O> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  #[inline]
  fn next(&mut self, value: Item) {
    if let Some(o) = self {
      o.next(value)
    }
  }

  #[inline]
  fn error(self, err: Err) {
    if let Some(o) = self {
      o.error(err)
    }
  }

  #[inline]
  fn complete(self) {
    if let Some(o) = self {
      o.complete()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, O::is_closed) }
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Object-safe mirror of [`Observer`], for `Box<dyn ...>` observers.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Err) { (*self).error(err); }
  fn box_complete(self: Box<Self>) { (*self).complete(); }
  fn box_is_closed(&self) -> bool { self.is_closed() }
}

pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for Box<dyn DynObserver<Item, Err> + Send> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// Closure observers
// ============================================================================

/// Observer built from a `next` closure alone.
///
/// Only streams that cannot fail accept it: subscribing to a fallible stream
/// without an error handler does not compile.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<Item, F> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value) }

  fn error(self, err: Infallible) { match err {} }

  fn complete(self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Observer built from one closure per event kind.
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> ObserverAll<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self { ObserverAll { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(self, err: Err) { (self.error)(err) }

  fn complete(self) { (self.complete)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Observer that receives every notification as an [`Event`].
pub struct EventObserver<F>(pub F);

impl<Item, Err, F> Observer<Item, Err> for EventObserver<F>
where
  F: FnMut(Event<Item, Err>),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(Event::Next(value)) }

  fn error(mut self, err: Err) { (self.0)(Event::Error(err)) }

  fn complete(mut self) { (self.0)(Event::Completed) }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn deliver_takes_observer_on_terminal() {
    let mut log = vec![];
    {
      let mut slot = Some(EventObserver(|e: Event<i32, &'static str>| log.push(e)));
      deliver(&mut slot, Event::Next(1));
      deliver(&mut slot, Event::Completed);
      assert!(slot.is_none());
      deliver(&mut slot, Event::Next(2));
    }
    assert_eq!(log, vec![Event::Next(1), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn boxed_observer_forwards() {
    let (tx, rx) = std::sync::mpsc::channel();
    let err_tx = tx.clone();
    let mut boxed: BoxedObserver<i32, String> = Box::new(ObserverAll::new(
      move |v: i32| tx.send(format!("next {v}")).unwrap(),
      move |e: String| err_tx.send(format!("error {e}")).unwrap(),
      || {},
    ));
    boxed.next(7);
    assert!(!boxed.is_closed());
    boxed.error("bad".to_owned());
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["next 7", "error bad"]);
  }
}
