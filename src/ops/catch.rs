use std::{marker::PhantomData, sync::Arc};

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{ForwardSink, Sink, SinkAndSubscription},
  subscription::{SerialDisposable, SingleAssignmentDisposable, Subscription},
};

/// Continues with the observable returned by `handler` when the source
/// fails.
///
/// Only the source's error is caught: an error from the replacement reaches
/// the subscriber.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::throw_err::<i32, _>("offline")
///   .catch_error(|_| observable::of::<_, std::convert::Infallible>(0))
///   .subscribe(|v| assert_eq!(v, 0));
/// ```
pub struct CatchOp<S, F> {
  source: S,
  handler: Arc<F>,
}

impl<S, F> CatchOp<S, F> {
  pub(crate) fn new(source: S, handler: F) -> Self { CatchOp { source, handler: Arc::new(handler) } }
}

impl<S: Clone, F> Clone for CatchOp<S, F> {
  fn clone(&self) -> Self { CatchOp { source: self.source.clone(), handler: self.handler.clone() } }
}

impl<S, F, P> Producer for CatchOp<S, F>
where
  S: Producer,
  F: Fn(S::Err) -> P + Send + Sync + 'static,
  P: Producer<Item = S::Item>,
{
  type Item = S::Item;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, P::Err> + Send + 'static,
  {
    let replacement = Arc::new(SerialDisposable::new());
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let source = self.source.subscribe_sink(CatchSink {
      sink,
      handler: self.handler.clone(),
      replacement: replacement.clone(),
    });
    SinkAndSubscription::new(handle, Subscription::from_pair(source, Subscription::from_arc(replacement)))
  }
}

pub struct CatchSink<O, F> {
  sink: Sink<O>,
  handler: Arc<F>,
  replacement: Arc<SerialDisposable>,
}

impl<Item, Err, O, F, P> Observer<Item, Err> for CatchSink<O, F>
where
  O: Observer<Item, P::Err> + Send + 'static,
  F: Fn(Err) -> P,
  P: Producer<Item = Item>,
{
  fn next(&mut self, value: Item) { self.sink.forward_next(value) }

  fn error(self, err: Err) {
    if self.sink.is_disposed() {
      return;
    }
    tracing::debug!("catch_error switching to the replacement observable");
    let replacement = (self.handler)(err);
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.replacement.set(Subscription::from_arc(slot.clone()));
    let subscription = replacement.subscribe_sink(ForwardSink(self.sink));
    let _ = slot.set(subscription);
  }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

/// Emits `value` and completes when the source fails. The error type of the
/// result is free, since it can no longer fail.
pub struct CatchJustReturnOp<S: Producer, E> {
  source: S,
  value: S::Item,
  _err: PhantomData<fn() -> E>,
}

impl<S: Producer, E> CatchJustReturnOp<S, E> {
  pub(crate) fn new(source: S, value: S::Item) -> Self { CatchJustReturnOp { source, value, _err: PhantomData } }
}

impl<S, E> Clone for CatchJustReturnOp<S, E>
where
  S: Producer + Clone,
  S::Item: Clone,
{
  fn clone(&self) -> Self { CatchJustReturnOp::new(self.source.clone(), self.value.clone()) }
}

impl<S, E> Producer for CatchJustReturnOp<S, E>
where
  S: Producer,
  S::Item: Clone + Sync,
  E: Send + 'static,
{
  type Item = S::Item;
  type Err = E;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, E> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(
      self.source,
      CatchJustReturnSink { sink, value: self.value.clone(), _err: PhantomData::<fn() -> E> },
      handle
    )
  }
}

pub struct CatchJustReturnSink<O, Item, E> {
  sink: Sink<O>,
  value: Item,
  _err: PhantomData<fn() -> E>,
}

impl<Item, Err, E, O> Observer<Item, Err> for CatchJustReturnSink<O, Item, E>
where
  O: Observer<Item, E>,
{
  fn next(&mut self, value: Item) { self.sink.forward_next::<Item, E>(value) }

  fn error(mut self, _: Err) {
    self.sink.forward_next::<Item, E>(self.value);
    self.sink.forward_completed::<Item, E>()
  }

  fn complete(mut self) { self.sink.forward_completed::<Item, E>() }

  fn is_closed(&self) -> bool { self.sink.is_closed::<Item, E>() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn continues_with_the_replacement() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec![1, 2])
      .concat(observable::throw_err("boom"))
      .catch_error(|e: &'static str| {
        assert_eq!(e, "boom");
        observable::from_iter::<_, String>(vec![10, 20])
      })
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(
      *log.lock().unwrap(),
      vec![Event::Next(1), Event::Next(2), Event::Next(10), Event::Next(20), Event::Completed]
    );
  }

  #[rxcore_macro::test]
  fn replacement_errors_pass_through() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::throw_err::<i32, _>(1)
      .catch_error(|e: i32| observable::throw_err::<i32, _>(e + 1))
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Error(2)]);
  }

  #[rxcore_macro::test]
  fn dispose_reaches_the_replacement() {
    let source = PublishSubject::<i32, ()>::new();
    let fallback = PublishSubject::<i32, ()>::new();
    let c_fallback = fallback.clone();
    let subscription = source.clone().catch_error(move |_| c_fallback.clone()).subscribe_event(|_| {});
    source.error(());
    assert!(fallback.has_observers());
    subscription.dispose();
    assert!(!fallback.has_observers());
  }

  #[rxcore_macro::test]
  fn just_return_ends_with_the_value() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec![1])
      .concat(observable::throw_err("boom"))
      .catch_error_just_return::<std::convert::Infallible>(-1)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![1, -1]);
  }
}
