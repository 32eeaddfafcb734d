use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits each intermediate accumulation, starting from `seed`.
pub struct ScanOp<S, Acc, F> {
  source: S,
  seed: Acc,
  f: Arc<F>,
}

impl<S, Acc, F> ScanOp<S, Acc, F> {
  pub(crate) fn new(source: S, seed: Acc, f: F) -> Self { ScanOp { source, seed, f: Arc::new(f) } }
}

impl<S: Clone, Acc: Clone, F> Clone for ScanOp<S, Acc, F> {
  fn clone(&self) -> Self { ScanOp { source: self.source.clone(), seed: self.seed.clone(), f: self.f.clone() } }
}

impl<S, Acc, F> Producer for ScanOp<S, Acc, F>
where
  S: Producer,
  Acc: Clone + Send + Sync + 'static,
  F: Fn(Acc, S::Item) -> Acc + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Acc, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let scan = ScanSink { sink, acc: Some(self.seed.clone()), f: self.f.clone() };
    run_single!(self.source, scan, handle)
  }
}

pub struct ScanSink<O, Acc, F> {
  sink: Sink<O>,
  acc: Option<Acc>,
  f: Arc<F>,
}

impl<Item, Err, O, Acc, F> Observer<Item, Err> for ScanSink<O, Acc, F>
where
  O: Observer<Acc, Err>,
  Acc: Clone,
  F: Fn(Acc, Item) -> Acc,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      let acc = (self.f)(acc, value);
      self.acc = Some(acc.clone());
      self.sink.forward_next(acc);
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

/// `scan` whose accumulator may fail.
pub struct TryScanOp<S, Acc, F> {
  source: S,
  seed: Acc,
  f: Arc<F>,
}

impl<S, Acc, F> TryScanOp<S, Acc, F> {
  pub(crate) fn new(source: S, seed: Acc, f: F) -> Self { TryScanOp { source, seed, f: Arc::new(f) } }
}

impl<S: Clone, Acc: Clone, F> Clone for TryScanOp<S, Acc, F> {
  fn clone(&self) -> Self {
    TryScanOp { source: self.source.clone(), seed: self.seed.clone(), f: self.f.clone() }
  }
}

impl<S, Acc, F> Producer for TryScanOp<S, Acc, F>
where
  S: Producer,
  Acc: Clone + Send + Sync + 'static,
  F: Fn(Acc, S::Item) -> Result<Acc, S::Err> + Send + Sync + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Acc, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let scan = TryScanSink { sink, acc: Some(self.seed.clone()), f: self.f.clone() };
    run_single!(self.source, scan, handle)
  }
}

pub struct TryScanSink<O, Acc, F> {
  sink: Sink<O>,
  acc: Option<Acc>,
  f: Arc<F>,
}

impl<Item, Err, O, Acc, F> Observer<Item, Err> for TryScanSink<O, Acc, F>
where
  O: Observer<Acc, Err>,
  Acc: Clone,
  F: Fn(Acc, Item) -> Result<Acc, Err>,
{
  fn next(&mut self, value: Item) {
    let Some(acc) = self.acc.take() else { return };
    match (self.f)(acc, value) {
      Ok(acc) => {
        self.acc = Some(acc.clone());
        self.sink.forward_next(acc);
      }
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
  fn running_sum() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(1..=4)
      .scan(0, |acc, v| acc + v)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![1, 3, 6, 10]);
  }

  #[rxcore_macro::test]
  fn each_subscription_starts_from_the_seed() {
    let source = observable::from_iter(vec!["a", "b"]).scan(String::new(), |mut acc, v| {
      acc.push_str(v);
      acc
    });
    for _ in 0..2 {
      let last = Arc::new(Mutex::new(String::new()));
      let c_last = last.clone();
      source.subscribe(move |v| *c_last.lock().unwrap() = v);
      assert_eq!(*last.lock().unwrap(), "ab");
    }
  }

  #[rxcore_macro::test]
  fn try_scan_overflow_is_an_error() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter::<_, &'static str>(vec![100u8, 100, 100])
      .try_scan(0u8, |acc, v| acc.checked_add(v).ok_or("overflow"))
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(100), Event::Next(200), Event::Error("overflow")]);
  }
}
