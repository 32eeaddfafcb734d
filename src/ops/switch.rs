use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  sink::{SerialSink, SinkAndSubscription},
  subscription::{SerialDisposable, SingleAssignmentDisposable, Subscription},
};

/// Mirrors the most recent inner observable.
///
/// Each inner observable gets a generation number; events from anything but
/// the latest generation are dropped, and subscribing a new inner disposes
/// the previous one first. Completes once the outer stream and the latest
/// inner have both completed.
#[derive(Clone)]
pub struct SwitchLatestOp<S> {
  source: S,
}

impl<S> SwitchLatestOp<S> {
  pub(crate) fn new(source: S) -> Self { SwitchLatestOp { source } }
}

#[derive(Default)]
struct SwitchState {
  latest: u64,
  has_latest: bool,
  outer_done: bool,
}

struct Switch<O, P: Producer> {
  sink: Arc<SerialSink<O, P::Item, P::Err>>,
  inner: Arc<SerialDisposable>,
  state: Mutex<SwitchState>,
}

impl<S> Producer for SwitchLatestOp<S>
where
  S: Producer,
  S::Item: Producer<Err = S::Err>,
{
  type Item = <S::Item as Producer>::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let switch = Arc::new(Switch::<O, S::Item> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      inner: Arc::new(SerialDisposable::new()),
      state: Mutex::new(SwitchState::default()),
    });
    let outer = self.source.subscribe_sink(SwitchOuter { switch: switch.clone() });
    let inner = Subscription::from_arc(switch.inner.clone());
    SinkAndSubscription::new(Subscription::from_arc(switch.sink.clone()), Subscription::from_pair(outer, inner))
  }
}

pub struct SwitchOuter<O, P: Producer> {
  switch: Arc<Switch<O, P>>,
}

impl<O, P> Observer<P, P::Err> for SwitchOuter<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn next(&mut self, inner: P) {
    let id = {
      let mut state = self.switch.state.lock();
      state.latest += 1;
      state.has_latest = true;
      state.latest
    };
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.switch.inner.set(Subscription::from_arc(slot.clone()));
    let subscription = inner.subscribe_sink(SwitchInner { switch: self.switch.clone(), id });
    let _ = slot.set(subscription);
  }

  fn error(self, err: P::Err) { self.switch.sink.forward(Event::Error(err)) }

  fn complete(self) {
    {
      let mut state = self.switch.state.lock();
      state.outer_done = true;
      if !state.has_latest {
        self.switch.sink.push(Event::Completed);
      }
    }
    self.switch.sink.drain();
  }

  fn is_closed(&self) -> bool { self.switch.sink.is_stopped() }
}

pub struct SwitchInner<O, P: Producer> {
  switch: Arc<Switch<O, P>>,
  id: u64,
}

impl<O, P> Observer<P::Item, P::Err> for SwitchInner<O, P>
where
  O: Observer<P::Item, P::Err>,
  P: Producer,
{
  fn next(&mut self, value: P::Item) {
    {
      let state = self.switch.state.lock();
      if state.latest != self.id {
        return;
      }
      self.switch.sink.push(Event::Next(value));
    }
    self.switch.sink.drain();
  }

  fn error(self, err: P::Err) {
    {
      let state = self.switch.state.lock();
      if state.latest != self.id {
        return;
      }
      self.switch.sink.push(Event::Error(err));
    }
    self.switch.sink.drain();
  }

  fn complete(self) {
    {
      let mut state = self.switch.state.lock();
      if state.latest != self.id {
        return;
      }
      state.has_latest = false;
      if state.outer_done {
        self.switch.sink.push(Event::Completed);
      }
    }
    self.switch.sink.drain();
  }

  fn is_closed(&self) -> bool { self.switch.sink.is_stopped() || self.switch.state.lock().latest != self.id }
}
