//! Connectable observables: one source subscription fanned out through a
//! subject.
//!
//! Subscribing to a [`ConnectableObservable`] only subscribes to its current
//! subject; the source starts when [`connect`](ConnectableObservable::connect)
//! is called. The subject comes from a factory and is created lazily. When the
//! connection ends, whether disposed or because the source terminated, the
//! subject is forgotten: the next subscriber or `connect` starts over with a
//! fresh one.
//!
//! ```
//! use rxcore::prelude::*;
//!
//! let source = observable::from_iter::<_, std::convert::Infallible>(0..3).publish();
//! source.subscribe(|v| println!("first {v}"));
//! source.subscribe(|v| println!("second {v}"));
//! let connection = source.connect();
//! assert!(connection.is_disposed());
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
  observable::Producer,
  observer::Observer,
  ops::ref_count::RefCountOp,
  sink::SinkAndSubscription,
  subject::Subject,
  subscription::{Disposable, SingleAssignmentDisposable, Subscription},
};

struct Connection {
  id: u64,
  handle: Subscription,
}

struct State<Sub> {
  subject: Option<Sub>,
  connection: Option<Connection>,
  next_id: u64,
}

struct Inner<S, Sub> {
  source: S,
  factory: Box<dyn Fn() -> Sub + Send + Sync>,
  state: Mutex<State<Sub>>,
}

impl<S, Sub: Clone> Inner<S, Sub> {
  fn subject(&self) -> Sub {
    let mut state = self.state.lock();
    state.subject.get_or_insert_with(|| (self.factory)()).clone()
  }

  /// Forgets connection `id` and its subject, if it is still the current one.
  fn disconnect(&self, id: u64) {
    let mut state = self.state.lock();
    if state.connection.as_ref().map_or(false, |c| c.id == id) {
      state.connection = None;
      state.subject = None;
    }
  }
}

pub struct ConnectableObservable<S, Sub> {
  inner: Arc<Inner<S, Sub>>,
}

impl<S, Sub> Clone for ConnectableObservable<S, Sub> {
  fn clone(&self) -> Self { ConnectableObservable { inner: self.inner.clone() } }
}

impl<S, Sub> ConnectableObservable<S, Sub>
where
  S: Producer,
  Sub: Subject<S::Item, S::Err>,
{
  pub fn new<F>(source: S, factory: F) -> Self
  where
    F: Fn() -> Sub + Send + Sync + 'static,
  {
    ConnectableObservable {
      inner: Arc::new(Inner {
        source,
        factory: Box::new(factory),
        state: Mutex::new(State { subject: None, connection: None, next_id: 0 }),
      }),
    }
  }

  /// Subscribes the subject to the source. While connected, calling again
  /// returns the existing connection.
  pub fn connect(&self) -> Subscription {
    let (subject, slot, handle, id) = {
      let mut state = self.inner.state.lock();
      if let Some(connection) = &state.connection {
        return connection.handle.clone();
      }
      let subject = state.subject.get_or_insert_with(|| (self.inner.factory)()).clone();
      let id = state.next_id;
      state.next_id += 1;
      let slot = Arc::new(SingleAssignmentDisposable::new());
      let handle = Subscription::new(ConnectionHandle {
        inner: Arc::downgrade(&self.inner),
        id,
        slot: slot.clone(),
      });
      state.connection = Some(Connection { id, handle: handle.clone() });
      (subject, slot, handle, id)
    };
    tracing::debug!(connection = id, "connectable connecting");

    let observer = ConnectionObserver { subject, inner: Arc::downgrade(&self.inner), id, slot: slot.clone() };
    let upstream = self.inner.source.subscribe_sink(observer);
    let _ = slot.set(upstream);
    handle
  }

  /// An observable that connects on its first subscriber and disconnects
  /// when its last subscriber leaves.
  pub fn ref_count(self) -> RefCountOp<S, Sub> { RefCountOp::new(self) }

  pub fn is_connected(&self) -> bool { self.inner.state.lock().connection.is_some() }
}

impl<S, Sub> Producer for ConnectableObservable<S, Sub>
where
  S: Producer,
  Sub: Subject<S::Item, S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    self.inner.subject().run(observer, cancel)
  }
}

struct ConnectionHandle<S, Sub> {
  inner: Weak<Inner<S, Sub>>,
  id: u64,
  slot: Arc<SingleAssignmentDisposable>,
}

impl<S, Sub> Disposable for ConnectionHandle<S, Sub>
where
  S: Send + Sync,
  Sub: Clone + Send + Sync,
{
  fn dispose(&self) {
    if let Some(inner) = self.inner.upgrade() {
      inner.disconnect(self.id);
    }
    self.slot.dispose();
  }

  fn is_disposed(&self) -> bool { self.slot.is_disposed() }
}

/// Source observer of one connection. A terminal event ends the connection
/// before it reaches the subject.
struct ConnectionObserver<S, Sub> {
  subject: Sub,
  inner: Weak<Inner<S, Sub>>,
  id: u64,
  slot: Arc<SingleAssignmentDisposable>,
}

impl<S, Sub> ConnectionObserver<S, Sub>
where
  Sub: Clone,
{
  fn disconnect(&self) {
    if let Some(inner) = self.inner.upgrade() {
      inner.disconnect(self.id);
    }
    self.slot.dispose();
  }
}

impl<Item, Err, S, Sub> Observer<Item, Err> for ConnectionObserver<S, Sub>
where
  Sub: Observer<Item, Err> + Clone,
{
  fn next(&mut self, value: Item) { self.subject.next(value) }

  fn error(self, err: Err) {
    self.disconnect();
    self.subject.error(err)
  }

  fn complete(self) {
    self.disconnect();
    self.subject.complete()
  }

  fn is_closed(&self) -> bool { self.subject.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc, Mutex,
    },
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn nothing_flows_before_connect() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let c_subscriptions = subscriptions.clone();
    let source = observable::defer(move || {
      c_subscriptions.fetch_add(1, Ordering::SeqCst);
      observable::from_iter::<_, Infallible>(1..=3)
    })
    .publish();

    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let (c_a, c_b) = (a.clone(), b.clone());
    source.subscribe(move |v| c_a.lock().unwrap().push(v));
    source.subscribe(move |v| c_b.lock().unwrap().push(v));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 0);

    source.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(*a.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(*b.lock().unwrap(), vec![1, 2, 3]);
  }

  #[rxcore_macro::test]
  fn connect_is_idempotent_while_connected() {
    let subject = PublishSubject::<i32, Infallible>::new();
    let connectable = subject.clone().publish();
    let first = connectable.connect();
    let second = connectable.connect();
    assert!(connectable.is_connected());
    second.dispose();
    assert!(first.is_disposed());
    assert!(!connectable.is_connected());
    assert!(!subject.has_observers());
  }

  #[rxcore_macro::test]
  fn fresh_subject_after_disconnect() {
    let upstream = PublishSubject::<i32, Infallible>::new();
    let connectable = upstream.clone().replay(ReplayPolicy::All);
    let connection = connectable.connect();
    upstream.next(1);
    connection.dispose();

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    connectable.subscribe(move |v| c_seen.lock().unwrap().push(v));
    connectable.connect();
    upstream.next(2);
    assert_eq!(*seen.lock().unwrap(), vec![2]);
  }

  #[rxcore_macro::test]
  fn source_completion_ends_the_connection() {
    let connectable = observable::from_iter::<_, Infallible>(vec![1]).publish();
    let connection = connectable.connect();
    assert!(connection.is_disposed());
    assert!(!connectable.is_connected());
  }
}
