use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Folds the whole stream into one value emitted on completion. An empty
/// source emits the seed.
pub struct ReduceOp<S, Acc, F> {
  source: S,
  seed: Acc,
  f: Arc<F>,
}

impl<S, Acc, F> ReduceOp<S, Acc, F> {
  pub(crate) fn new(source: S, seed: Acc, f: F) -> Self { ReduceOp { source, seed, f: Arc::new(f) } }
}

impl<S: Clone, Acc: Clone, F> Clone for ReduceOp<S, Acc, F> {
  fn clone(&self) -> Self {
    ReduceOp { source: self.source.clone(), seed: self.seed.clone(), f: self.f.clone() }
  }
}

impl<S, Acc, F> Producer for ReduceOp<S, Acc, F>
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
    let reduce = ReduceSink { sink, acc: Some(self.seed.clone()), f: self.f.clone() };
    run_single!(self.source, reduce, handle)
  }
}

pub struct ReduceSink<O, Acc, F> {
  sink: Sink<O>,
  acc: Option<Acc>,
  f: Arc<F>,
}

impl<Item, Err, O, Acc, F> Observer<Item, Err> for ReduceSink<O, Acc, F>
where
  O: Observer<Acc, Err>,
  F: Fn(Acc, Item) -> Acc,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      self.acc = Some((self.f)(acc, value));
    }
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) {
    if let Some(acc) = self.acc.take() {
      self.sink.forward_next(acc);
    }
    self.sink.forward_completed()
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
