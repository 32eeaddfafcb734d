//! Per-subscription operator state.
//!
//! Every subscription to a [`Producer`](crate::observable::Producer) builds a
//! fresh sink that holds the downstream observer and the `cancel` handle of
//! the whole subscription. Two slots are tied together by a
//! [`SinkDisposer`]: the sink itself, and whatever the sink subscribed
//! upstream. `run` may deliver events (and even terminate) before the
//! upstream subscription is known, so disposing the disposer early is
//! remembered and applied when the slots are filled.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  observer::Observer,
  resources::Tracked,
  subscription::{BooleanDisposable, Disposable, Subscription},
};

mod serial;
pub use serial::SerialSink;

/// Result of [`Producer::run`](crate::observable::Producer::run).
pub struct SinkAndSubscription {
  /// Disposes the sink: after this the downstream observer sees nothing.
  pub sink: Subscription,
  /// Disposes what the sink subscribed upstream.
  pub subscription: Subscription,
}

impl SinkAndSubscription {
  pub fn new(sink: Subscription, subscription: Subscription) -> Self {
    SinkAndSubscription { sink, subscription }
  }
}

// ==================== SinkDisposer ====================

/// The two-slot disposable returned for every producer subscription.
#[derive(Default)]
pub struct SinkDisposer {
  disposed: AtomicBool,
  slots: Mutex<Option<(Subscription, Subscription)>>,
}

impl SinkDisposer {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, slots: SinkAndSubscription) {
    let SinkAndSubscription { sink, subscription } = slots;
    let mut guard = self.slots.lock();
    if self.disposed.load(Ordering::Acquire) {
      drop(guard);
      sink.dispose();
      subscription.dispose();
      return;
    }
    *guard = Some((sink, subscription));
  }
}

impl Disposable for SinkDisposer {
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let slots = self.slots.lock().take();
    if let Some((sink, subscription)) = slots {
      sink.dispose();
      subscription.dispose();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

// ==================== Sink ====================

/// Downstream half of a single-source operator.
///
/// Forwarding stops once the sink is disposed, and the first event that
/// arrives afterwards drops the observer along with whatever it holds.
/// Forwarding a terminal event consumes the observer and then disposes
/// `cancel`, tearing down the whole subscription.
pub struct Sink<O> {
  observer: Option<O>,
  cancel: Subscription,
  disposed: Arc<BooleanDisposable>,
  _tracked: Tracked,
}

impl<O> Sink<O> {
  pub fn new(observer: O, cancel: Subscription) -> Self {
    Sink {
      observer: Some(observer),
      cancel,
      disposed: Arc::new(BooleanDisposable::new()),
      _tracked: Tracked::new("sink"),
    }
  }

  /// The sink slot for [`SinkAndSubscription::sink`].
  pub fn handle(&self) -> Subscription { Subscription::from_arc(self.disposed.clone()) }

  pub fn cancel(&self) -> &Subscription { &self.cancel }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.observer.is_none() || self.disposed.is_disposed() }

  /// Drops the observer once the sink handle has been disposed.
  fn release_if_disposed(&mut self) -> bool {
    if !self.disposed.is_disposed() {
      return false;
    }
    self.observer = None;
    true
  }

  pub fn forward_next<Item, Err>(&mut self, value: Item)
  where
    O: Observer<Item, Err>,
  {
    if self.release_if_disposed() {
      return;
    }
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value)
    }
  }

  pub fn forward_error<Item, Err>(&mut self, err: Err)
  where
    O: Observer<Item, Err>,
  {
    if self.release_if_disposed() {
      return;
    }
    if let Some(observer) = self.observer.take() {
      observer.error(err);
    }
    self.dispose();
  }

  pub fn forward_completed<Item, Err>(&mut self)
  where
    O: Observer<Item, Err>,
  {
    if self.release_if_disposed() {
      return;
    }
    if let Some(observer) = self.observer.take() {
      observer.complete();
    }
    self.dispose();
  }

  /// `true` when the downstream can no longer receive values.
  pub fn is_closed<Item, Err>(&self) -> bool
  where
    O: Observer<Item, Err>,
  {
    self.disposed.is_disposed() || self.observer.as_ref().map_or(true, |o| o.is_closed())
  }

  pub fn dispose(&mut self) {
    self.disposed.dispose();
    self.cancel.dispose();
  }
}

/// Sink that forwards every event unchanged.
pub struct ForwardSink<O>(pub Sink<O>);

impl<Item, Err, O> Observer<Item, Err> for ForwardSink<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.0.forward_next(value) }

  fn error(mut self, err: Err) { self.0.forward_error(err) }

  fn complete(mut self) { self.0.forward_completed() }

  fn is_closed(&self) -> bool { self.0.is_closed() }
}
