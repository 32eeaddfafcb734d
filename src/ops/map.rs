use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

// ==================== map ====================

pub struct MapOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> MapOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { MapOp { source, f: Arc::new(f) } }
}

impl<S: Clone, F> Clone for MapOp<S, F> {
  fn clone(&self) -> Self { MapOp { source: self.source.clone(), f: self.f.clone() } }
}

impl<S, F, B> Producer for MapOp<S, F>
where
  S: Producer,
  F: Fn(S::Item) -> B + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, MapSink { sink, f: self.f.clone() }, handle)
  }
}

pub struct MapSink<O, F> {
  sink: Sink<O>,
  f: Arc<F>,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for MapSink<O, F>
where
  O: Observer<B, Err>,
  F: Fn(Item) -> B,
{
  fn next(&mut self, value: Item) {
    let mapped = (self.f)(value);
    self.sink.forward_next(mapped)
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

// ==================== try_map ====================

pub struct TryMapOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> TryMapOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { TryMapOp { source, f: Arc::new(f) } }
}

impl<S: Clone, F> Clone for TryMapOp<S, F> {
  fn clone(&self) -> Self { TryMapOp { source: self.source.clone(), f: self.f.clone() } }
}

impl<S, F, B> Producer for TryMapOp<S, F>
where
  S: Producer,
  F: Fn(S::Item) -> Result<B, S::Err> + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, TryMapSink { sink, f: self.f.clone() }, handle)
  }
}

pub struct TryMapSink<O, F> {
  sink: Sink<O>,
  f: Arc<F>,
}

impl<Item, Err, B, O, F> Observer<Item, Err> for TryMapSink<O, F>
where
  O: Observer<B, Err>,
  F: Fn(Item) -> Result<B, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.f)(value) {
      Ok(mapped) => self.sink.forward_next(mapped),
      Err(err) => self.sink.forward_error(err),
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

// ==================== map_err ====================

pub struct MapErrOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> MapErrOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { MapErrOp { source, f: Arc::new(f) } }
}

impl<S: Clone, F> Clone for MapErrOp<S, F> {
  fn clone(&self) -> Self { MapErrOp { source: self.source.clone(), f: self.f.clone() } }
}

impl<S, F, E> Producer for MapErrOp<S, F>
where
  S: Producer,
  F: Fn(S::Err) -> E + Send + Sync + 'static,
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
    run_single!(self.source, MapErrSink { sink, f: self.f.clone() }, handle)
  }
}

pub struct MapErrSink<O, F> {
  sink: Sink<O>,
  f: Arc<F>,
}

impl<Item, Err, E, O, F> Observer<Item, Err> for MapErrSink<O, F>
where
  O: Observer<Item, E>,
  F: Fn(Err) -> E,
{
  fn next(&mut self, value: Item) { self.sink.forward_next(value) }

  fn error(mut self, err: Err) {
    let mapped = (self.f)(err);
    self.sink.forward_error(mapped)
  }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn map_types_mixed() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec!['a', 'b', 'c'])
      .map(|c| c as u32 - 'a' as u32)
      .map(|v| v as f32 * 0.5)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![0.0, 0.5, 1.0]);
  }

  #[rxcore_macro::test]
  fn try_map_error_terminates_and_disposes_source() {
    let source = PublishSubject::<i32, String>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let sub = source
      .clone()
      .try_map(|v| if v < 3 { Ok(v * 2) } else { Err(format!("{v} too big")) })
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    source.next(1);
    source.next(3);
    source.next(2);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(2), Event::Error("3 too big".to_owned())]);
    assert!(sub.is_disposed());
    assert!(!source.has_observers());
  }

  #[rxcore_macro::test]
  fn map_err_converts_the_error() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::throw_err::<i32, _>(7)
      .map_err(|code| format!("code {code}"))
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Error("code 7".to_owned())]);
  }

  #[rxcore_macro::test]
  fn infallible_stream_widens_its_error() {
    let widened = observable::just::<_, Infallible>(1).map_err(|e| -> String { match e {} });
    let failing = observable::throw_err::<i32, String>("x".to_owned());
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    widened.concat(failing).subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Error("x".to_owned())]);
  }
}
