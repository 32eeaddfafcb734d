//! State and fan-out shared by every subject flavour.
//!
//! All mutation happens under one lock: recording history, snapshotting the
//! observer set and queueing the event into each observer's [`SerialSink`].
//! Delivery happens after the lock is released, so observers may call back
//! into the subject. Because queueing is ordered by the lock, every observer
//! sees events in the same order, and a new subscriber's replay is queued
//! before anything emitted after it joined.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
  bag::{Bag, BagKey},
  error::ContractViolation,
  event::Event,
  observer::{BoxedObserver, Observer},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, Subscription},
};

/// What a subject keeps for late subscribers.
pub(crate) trait History<Item>: Send + 'static {
  fn record(&mut self, value: &Item);

  fn replay(&self) -> Vec<Item>;

  /// Whether the history is still replayed once the subject has terminated.
  fn replays_after_stop(&self) -> bool { true }
}

/// Keeps nothing.
impl<Item> History<Item> for () {
  fn record(&mut self, _: &Item) {}

  fn replay(&self) -> Vec<Item> { Vec::new() }
}

type Target<Item, Err> = Arc<SerialSink<BoxedObserver<Item, Err>, Item, Err>>;

pub(crate) struct State<Item, Err, H> {
  pub(crate) history: H,
  pub(crate) terminal: Option<Event<Item, Err>>,
  pub(crate) disposed: bool,
  observers: Bag<Target<Item, Err>>,
}

pub(crate) struct SubjectCore<Item, Err, H>(Arc<Mutex<State<Item, Err, H>>>);

impl<Item, Err, H> Clone for SubjectCore<Item, Err, H> {
  fn clone(&self) -> Self { SubjectCore(self.0.clone()) }
}

impl<Item, Err, H> SubjectCore<Item, Err, H>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  H: History<Item>,
{
  pub(crate) fn new(history: H) -> Self {
    SubjectCore(Arc::new(Mutex::new(State {
      history,
      terminal: None,
      disposed: false,
      observers: Bag::new(),
    })))
  }

  /// Reads the state under the lock.
  pub(crate) fn with_state<R>(&self, f: impl FnOnce(&State<Item, Err, H>) -> R) -> R { f(&self.0.lock()) }

  pub(crate) fn emit(&self, event: Event<Item, Err>) {
    let targets = {
      let mut state = self.0.lock();
      let dropped = if state.disposed {
        Some(ContractViolation::SubjectDisposed)
      } else if state.terminal.is_some() {
        Some(ContractViolation::SubjectTerminated)
      } else {
        None
      };
      if let Some(violation) = dropped {
        drop(state);
        tracing::warn!("{}", violation);
        return;
      }
      let targets = if event.is_stop_event() {
        state.terminal = Some(event.clone());
        state.observers.drain()
      } else {
        if let Event::Next(value) = &event {
          state.history.record(value);
        }
        state.observers.snapshot()
      };
      for target in &targets {
        target.push(event.clone());
      }
      targets
    };
    for target in targets {
      target.drain();
    }
  }

  pub(crate) fn subscribe<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let observer: BoxedObserver<Item, Err> = Box::new(observer);
    let sink = Arc::new(SerialSink::new(observer, cancel.clone()));
    let key = {
      let mut state = self.0.lock();
      if state.disposed {
        drop(state);
        tracing::error!("{}", ContractViolation::SubjectDisposed);
        cancel.dispose();
        return SinkAndSubscription::new(Subscription::empty(), Subscription::empty());
      }
      if state.terminal.is_none() || state.history.replays_after_stop() {
        for value in state.history.replay() {
          sink.push(Event::Next(value));
        }
      }
      match &state.terminal {
        Some(terminal) => {
          sink.push(terminal.clone());
          None
        }
        None => Some(state.observers.insert(sink.clone())),
      }
    };
    sink.drain();

    let removal = match key {
      Some(key) => {
        let owner = Arc::downgrade(&self.0);
        Subscription::from_fn(move || remove(&owner, key))
      }
      None => Subscription::empty(),
    };
    SinkAndSubscription::new(Subscription::from_arc(sink), removal)
  }

  pub(crate) fn dispose(&self) {
    let targets = {
      let mut state = self.0.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.observers.drain()
    };
    tracing::trace!(observers = targets.len(), "subject disposed");
    for target in targets {
      target.dispose();
    }
  }

  pub(crate) fn is_disposed(&self) -> bool { self.0.lock().disposed }

  pub(crate) fn is_stopped(&self) -> bool {
    let state = self.0.lock();
    state.disposed || state.terminal.is_some()
  }

  pub(crate) fn observer_count(&self) -> usize { self.0.lock().observers.len() }
}

fn remove<Item, Err, H>(owner: &Weak<Mutex<State<Item, Err, H>>>, key: BagKey) {
  if let Some(state) = owner.upgrade() {
    let removed = state.lock().observers.remove(key);
    drop(removed);
  }
}
