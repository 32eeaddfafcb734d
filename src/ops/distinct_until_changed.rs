use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Drops values equal, per `eq`, to the previous value.
pub struct DistinctUntilChangedOp<S, F> {
  source: S,
  eq: Arc<F>,
}

impl<S, F> DistinctUntilChangedOp<S, F> {
  pub(crate) fn new(source: S, eq: F) -> Self { DistinctUntilChangedOp { source, eq: Arc::new(eq) } }
}

impl<S: Clone, F> Clone for DistinctUntilChangedOp<S, F> {
  fn clone(&self) -> Self { DistinctUntilChangedOp { source: self.source.clone(), eq: self.eq.clone() } }
}

impl<S, F> Producer for DistinctUntilChangedOp<S, F>
where
  S: Producer,
  S::Item: Clone,
  F: Fn(&S::Item, &S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let distinct = DistinctUntilChangedSink { sink, last: None, eq: self.eq.clone() };
    run_single!(self.source, distinct, handle)
  }
}

pub struct DistinctUntilChangedSink<O, Item, F> {
  sink: Sink<O>,
  last: Option<Item>,
  eq: Arc<F>,
}

impl<Item, Err, O, F> Observer<Item, Err> for DistinctUntilChangedSink<O, Item, F>
where
  O: Observer<Item, Err>,
  Item: Clone,
  F: Fn(&Item, &Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if let Some(last) = &self.last {
      if (self.eq)(last, &value) {
        return;
      }
    }
    self.last = Some(value.clone());
    self.sink.forward_next(value);
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
