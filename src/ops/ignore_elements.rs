use crate::{
  observable::Producer,
  observer::Observer,
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Drops every value and keeps only the terminal event.
#[derive(Clone)]
pub struct IgnoreElementsOp<S> {
  source: S,
}

impl<S> IgnoreElementsOp<S> {
  pub(crate) fn new(source: S) -> Self { IgnoreElementsOp { source } }
}

impl<S: Producer> Producer for IgnoreElementsOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    run_single!(self.source, IgnoreElementsSink { sink }, handle)
  }
}

pub struct IgnoreElementsSink<O> {
  sink: Sink<O>,
}

impl<Item, Err, O> Observer<Item, Err> for IgnoreElementsSink<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, _: Item) {}

  fn error(mut self, err: Err) { self.sink.forward_error(err) }

  fn complete(mut self) { self.sink.forward_completed() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn only_the_terminal_event() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter::<_, ()>(0..5)
      .ignore_elements()
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Completed]);
  }
}
