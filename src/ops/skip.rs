use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Ignores the first `count` values.
#[derive(Clone)]
pub struct SkipOp<S> {
  source: S,
  count: usize,
}

impl<S> SkipOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { SkipOp { source, count } }
}

impl<S: Producer> Producer for SkipOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, SkipSink { sink, remaining: self.count }, handle)
  }
}

pub struct SkipSink<O> {
  sink: Sink<O>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for SkipSink<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining > 0 {
      self.remaining -= 1;
    } else {
      self.sink.forward_next(value)
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

/// Ignores values while `predicate` holds, then emits everything.
pub struct SkipWhileOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> SkipWhileOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self { SkipWhileOp { source, predicate: Arc::new(predicate) } }
}

impl<S: Clone, F> Clone for SkipWhileOp<S, F> {
  fn clone(&self) -> Self { SkipWhileOp { source: self.source.clone(), predicate: self.predicate.clone() } }
}

impl<S, F> Producer for SkipWhileOp<S, F>
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
    let skip = SkipWhileSink { sink, predicate: self.predicate.clone(), skipping: true };
    run_single!(self.source, skip, handle)
  }
}

pub struct SkipWhileSink<O, F> {
  sink: Sink<O>,
  predicate: Arc<F>,
  skipping: bool,
}

impl<Item, Err, O, F> Observer<Item, Err> for SkipWhileSink<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if self.skipping && (self.predicate)(&value) {
      return;
    }
    self.skipping = false;
    self.sink.forward_next(value)
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn skips_the_first_values() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(0..5).skip(3).subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![3, 4]);
  }

  #[rxcore_macro::test]
  fn skip_while_only_at_the_start() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec![1, 2, 5, 1, 7])
      .skip_while(|v| *v < 3)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![5, 1, 7]);
  }
}
