use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Runs side effects for every event, then forwards it unchanged.
pub struct TapOp<S, N, E, C> {
  source: S,
  callbacks: Arc<Callbacks<N, E, C>>,
}

struct Callbacks<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<S, N, E, C> TapOp<S, N, E, C> {
  pub(crate) fn new(source: S, next: N, error: E, complete: C) -> Self {
    TapOp { source, callbacks: Arc::new(Callbacks { next, error, complete }) }
  }
}

impl<S: Clone, N, E, C> Clone for TapOp<S, N, E, C> {
  fn clone(&self) -> Self { TapOp { source: self.source.clone(), callbacks: self.callbacks.clone() } }
}

impl<S, N, E, C> Producer for TapOp<S, N, E, C>
where
  S: Producer,
  N: Fn(&S::Item) + Send + Sync + 'static,
  E: Fn(&S::Err) + Send + Sync + 'static,
  C: Fn() + Send + Sync + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, TapSink { sink, callbacks: self.callbacks.clone() }, handle)
  }
}

pub struct TapSink<O, N, E, C> {
  sink: Sink<O>,
  callbacks: Arc<Callbacks<N, E, C>>,
}

impl<Item, Err, O, N, E, C> Observer<Item, Err> for TapSink<O, N, E, C>
where
  O: Observer<Item, Err>,
  N: Fn(&Item),
  E: Fn(&Err),
  C: Fn(),
{
  fn next(&mut self, value: Item) {
    (self.callbacks.next)(&value);
    self.sink.forward_next(value)
  }

  fn error(mut self, err: Err) {
    (self.callbacks.error)(&err);
    self.sink.forward_error(err)
  }

  fn complete(mut self) {
    (self.callbacks.complete)();
    self.sink.forward_completed()
  }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
