use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

pub struct FilterOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> FilterOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self { FilterOp { source, predicate: Arc::new(predicate) } }
}

impl<S: Clone, F> Clone for FilterOp<S, F> {
  fn clone(&self) -> Self { FilterOp { source: self.source.clone(), predicate: self.predicate.clone() } }
}

impl<S, F> Producer for FilterOp<S, F>
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
    run_single!(self.source, FilterSink { sink, predicate: self.predicate.clone() }, handle)
  }
}

pub struct FilterSink<O, F> {
  sink: Sink<O>,
  predicate: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterSink<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.sink.forward_next(value)
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

/// `filter` whose predicate may fail; a failure terminates the stream.
pub struct TryFilterOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> TryFilterOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self {
    TryFilterOp { source, predicate: Arc::new(predicate) }
  }
}

impl<S: Clone, F> Clone for TryFilterOp<S, F> {
  fn clone(&self) -> Self { TryFilterOp { source: self.source.clone(), predicate: self.predicate.clone() } }
}

impl<S, F> Producer for TryFilterOp<S, F>
where
  S: Producer,
  F: Fn(&S::Item) -> Result<bool, S::Err> + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, TryFilterSink { sink, predicate: self.predicate.clone() }, handle)
  }
}

pub struct TryFilterSink<O, F> {
  sink: Sink<O>,
  predicate: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for TryFilterSink<O, F>
where
  O: Observer<Item, Err>,
  F: Fn(&Item) -> Result<bool, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.predicate)(&value) {
      Ok(true) => self.sink.forward_next(value),
      Ok(false) => {}
      Err(err) => self.sink.forward_error(err),
    }
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
  fn keeps_matching_values() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(0..10)
      .filter(|v| v % 3 == 0)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![0, 3, 6, 9]);
  }

  #[rxcore_macro::test]
  fn try_filter_failure_stops_the_stream() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter::<_, &'static str>(vec![2, 4, -1, 6])
      .try_filter(|v| if *v < 0 { Err("negative") } else { Ok(*v > 2) })
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(4), Event::Error("negative")]);
  }
}
