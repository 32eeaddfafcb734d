use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits only the first `count` values, then completes and disposes the
/// source. `take(0)` completes without subscribing.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(0..10).take(5).subscribe(|v| println!("{v}"));
/// // 0 1 2 3 4
/// ```
#[derive(Clone)]
pub struct TakeOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { TakeOp { source, count } }
}

impl<S: Producer> Producer for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    if self.count == 0 {
      observer.complete();
      return SinkAndSubscription::new(Subscription::empty(), Subscription::empty());
    }
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, TakeSink { sink, remaining: self.count }, handle)
  }
}

pub struct TakeSink<O> {
  sink: Sink<O>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeSink<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.sink.forward_next(value);
    if self.remaining == 0 {
      self.sink.forward_completed();
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.remaining == 0 || self.sink.is_closed() }
}

/// Emits values while `predicate` holds; completes on the first value that
/// fails it, without emitting that value.
pub struct TakeWhileOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> TakeWhileOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self { TakeWhileOp { source, predicate: Arc::new(predicate) } }
}

impl<S: Clone, F> Clone for TakeWhileOp<S, F> {
  fn clone(&self) -> Self { TakeWhileOp { source: self.source.clone(), predicate: self.predicate.clone() } }
}

impl<S, F> Producer for TakeWhileOp<S, F>
where
  S: Producer,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, TakeWhileSink { sink, predicate: self.predicate.clone() }, handle)
  }
}

pub struct TakeWhileSink<O, F> {
  sink: Sink<O>,
  predicate: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for TakeWhileSink<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.sink.forward_next(value)
    } else {
      self.sink.forward_completed()
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn base_function() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter::<_, ()>(0..100)
      .take(3)
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(0), Event::Next(1), Event::Next(2), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn take_zero_never_subscribes() {
    let subscribed = Arc::new(AtomicUsize::new(0));
    let c_subscribed = subscribed.clone();
    let done = Arc::new(AtomicUsize::new(0));
    let c_done = done.clone();
    observable::defer(move || {
      c_subscribed.fetch_add(1, Ordering::SeqCst);
      observable::never::<i32, ()>()
    })
    .take(0)
    .subscribe_all(|_| {}, |_| {}, move || {
      c_done.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(subscribed.load(Ordering::SeqCst), 0);
    assert_eq!(done.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn completion_unsubscribes_the_source() {
    let subject = PublishSubject::<i32, ()>::new();
    subject.clone().take(1).subscribe_event(|_| {});
    assert!(subject.has_observers());
    subject.next(1);
    assert!(!subject.has_observers());
  }

  #[rxcore_macro::test]
  fn take_while_stops_at_first_failure() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec![1, 2, 5, 1])
      .take_while(|v| *v < 3)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
  }
}
