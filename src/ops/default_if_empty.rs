use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits `value` when the source completes without emitting anything.
pub struct DefaultIfEmptyOp<S: Producer> {
  source: S,
  value: S::Item,
}

impl<S: Producer> DefaultIfEmptyOp<S> {
  pub(crate) fn new(source: S, value: S::Item) -> Self { DefaultIfEmptyOp { source, value } }
}

impl<S> Clone for DefaultIfEmptyOp<S>
where
  S: Producer + Clone,
  S::Item: Clone,
{
  fn clone(&self) -> Self { DefaultIfEmptyOp { source: self.source.clone(), value: self.value.clone() } }
}

impl<S> Producer for DefaultIfEmptyOp<S>
where
  S: Producer,
  S::Item: Clone + Sync,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, DefaultIfEmptySink { sink, default: Some(self.value.clone()) }, handle)
  }
}

pub struct DefaultIfEmptySink<O, Item> {
  sink: Sink<O>,
  default: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for DefaultIfEmptySink<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.default = None;
    self.sink.forward_next(value)
  }

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) {
    if let Some(value) = self.default.take() {
      self.sink.forward_next(value);
    }
    self.sink.forward_completed()
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
