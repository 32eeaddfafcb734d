use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::{Disposable, Subscription},
};

pub struct FinalizeOp<S, F> {
  source: S,
  f: Arc<F>,
}

impl<S, F> FinalizeOp<S, F> {
  pub(crate) fn new(source: S, f: F) -> Self { FinalizeOp { source, f: Arc::new(f) } }
}

impl<S: Clone, F> Clone for FinalizeOp<S, F> {
  fn clone(&self) -> Self { FinalizeOp { source: self.source.clone(), f: self.f.clone() } }
}

impl<S, F> Producer for FinalizeOp<S, F>
where
  S: Producer,
  F: Fn() + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let f = self.f.clone();
    let finalizer = Subscription::from_fn(move || f());
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let upstream = self.source.subscribe_sink(FinalizeSink { sink, finalizer: finalizer.clone() });
    // upstream first, so the action runs after the source is torn down
    SinkAndSubscription::new(handle, Subscription::from_pair(upstream, finalizer))
  }
}

pub struct FinalizeSink<O> {
  sink: Sink<O>,
  finalizer: Subscription,
}

impl<Item, Err, O> Observer<Item, Err> for FinalizeSink<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.sink.forward_next(value) }

  fn error(mut self, err: Err) {
    self.sink.forward_error(err);
    self.finalizer.dispose();
  }

  fn complete(mut self) {
    self.sink.forward_completed();
    self.finalizer.dispose();
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
