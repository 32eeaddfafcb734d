use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  sink::{ForwardSink, Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits `values` before subscribing to the source.
pub struct StartWithOp<S: Producer> {
  source: S,
  values: Arc<Vec<S::Item>>,
}

impl<S: Producer> StartWithOp<S> {
  pub(crate) fn new(source: S, values: Vec<S::Item>) -> Self { StartWithOp { source, values: Arc::new(values) } }
}

impl<S: Producer + Clone> Clone for StartWithOp<S> {
  fn clone(&self) -> Self { StartWithOp { source: self.source.clone(), values: self.values.clone() } }
}

impl<S> Producer for StartWithOp<S>
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
    let mut sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    for v in self.values.iter() {
      if sink.is_closed::<S::Item, S::Err>() {
        return SinkAndSubscription::new(handle, Subscription::empty());
      }
      sink.forward_next(v.clone());
    }
    run_single!(self.source, ForwardSink(sink), handle)
  }
}
