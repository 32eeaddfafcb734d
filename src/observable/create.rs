use std::{marker::PhantomData, sync::Arc};

use crate::{
  event::Event,
  observable::Producer,
  observer::{BoxedObserver, Observer},
  sink::{SerialSink, SinkAndSubscription},
  subscription::Subscription,
};

/// Builds an observable from a subscribe function.
///
/// `subscribe` runs once per subscription with an [`Emitter`] and returns the
/// teardown for whatever it started. The teardown runs when the subscriber
/// disposes, and also right after the emitter sends a terminal event.
///
/// ```
/// use rxcore::prelude::*;
///
/// let source = observable::create(|emitter: Emitter<i32, String>| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
///   Subscription::empty()
/// });
/// source.subscribe_all(|v| println!("{v}"), |e| eprintln!("{e}"), || {});
/// ```
pub fn create<F, Item, Err>(subscribe: F) -> Create<F, Item, Err>
where
  F: Fn(Emitter<Item, Err>) -> Subscription,
{
  Create { subscribe: Arc::new(subscribe), _hint: PhantomData }
}

pub struct Create<F, Item, Err> {
  subscribe: Arc<F>,
  _hint: PhantomData<fn() -> (Item, Err)>,
}

impl<F, Item, Err> Clone for Create<F, Item, Err> {
  fn clone(&self) -> Self { Create { subscribe: self.subscribe.clone(), _hint: PhantomData } }
}

impl<F, Item, Err> Producer for Create<F, Item, Err>
where
  F: Fn(Emitter<Item, Err>) -> Subscription + Send + Sync + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let observer: BoxedObserver<Item, Err> = Box::new(observer);
    let sink = Arc::new(SerialSink::new(observer, cancel));
    let teardown = (self.subscribe)(Emitter { sink: sink.clone() });
    SinkAndSubscription::new(Subscription::from_arc(sink), teardown)
  }
}

/// Handle given to a [`create`] subscribe function.
///
/// Clones feed the same subscriber and may be moved to other threads;
/// concurrent calls are serialized. Everything after the first terminal
/// event, or after the subscriber disposed, is dropped.
pub struct Emitter<Item, Err> {
  sink: Arc<SerialSink<BoxedObserver<Item, Err>, Item, Err>>,
}

impl<Item, Err> Clone for Emitter<Item, Err> {
  fn clone(&self) -> Self { Emitter { sink: self.sink.clone() } }
}

impl<Item, Err> Emitter<Item, Err> {
  pub fn next(&self, value: Item) { self.sink.forward(Event::Next(value)) }

  pub fn error(&self, err: Err) { self.sink.forward(Event::Error(err)) }

  pub fn complete(&self) { self.sink.forward(Event::Completed) }

  pub fn emit(&self, event: Event<Item, Err>) { self.sink.forward(event) }

  /// `true` once nothing more will be delivered.
  pub fn is_closed(&self) -> bool { self.sink.is_stopped() }
}

impl<Item, Err> Observer<Item, Err> for Emitter<Item, Err> {
  fn next(&mut self, value: Item) { Emitter::next(self, value) }

  fn error(self, err: Err) { Emitter::error(&self, err) }

  fn complete(self) { Emitter::complete(&self) }

  fn is_closed(&self) -> bool { Emitter::is_closed(self) }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn teardown_runs_after_terminal() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let c_teardowns = teardowns.clone();
    let source = observable::create(move |emitter: Emitter<i32, ()>| {
      emitter.next(1);
      emitter.complete();
      emitter.next(2);
      let teardowns = c_teardowns.clone();
      Subscription::from_fn(move || {
        teardowns.fetch_add(1, Ordering::SeqCst);
      })
    });
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let sub = source.subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Completed]);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(sub.is_disposed());
  }

  #[rxcore_macro::test]
  fn dispose_runs_teardown_and_silences_emitter() {
    let emitter_slot: Arc<Mutex<Option<Emitter<i32, ()>>>> = Default::default();
    let c_slot = emitter_slot.clone();
    let torn_down = Arc::new(AtomicUsize::new(0));
    let c_torn_down = torn_down.clone();
    let source = observable::create(move |emitter: Emitter<i32, ()>| {
      *c_slot.lock().unwrap() = Some(emitter);
      let torn_down = c_torn_down.clone();
      Subscription::from_fn(move || {
        torn_down.fetch_add(1, Ordering::SeqCst);
      })
    });
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    let sub = source.subscribe_event(move |_| {
      c_count.fetch_add(1, Ordering::SeqCst);
    });
    let emitter = emitter_slot.lock().unwrap().clone().unwrap();
    emitter.next(1);
    sub.dispose();
    emitter.next(2);
    emitter.complete();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    assert!(emitter.is_closed());
  }

  #[rxcore_macro::test]
  fn each_subscription_runs_the_function() {
    let runs = Arc::new(AtomicUsize::new(0));
    let c_runs = runs.clone();
    let source = observable::create(move |emitter: Emitter<(), ()>| {
      c_runs.fetch_add(1, Ordering::SeqCst);
      emitter.complete();
      Subscription::empty()
    });
    source.subscribe_event(|_| {});
    source.subscribe_event(|_| {});
    assert_eq!(runs.load(Ordering::SeqCst), 2);
  }
}
