//! Automatic connection management for a
//! [`ConnectableObservable`](crate::observable::ConnectableObservable).
//!
//! The first subscriber connects, the last one to leave disconnects. A
//! subscriber arriving after that connects again, through a fresh subject.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  observable::{ConnectableObservable, Producer},
  observer::Observer,
  sink::{ForwardSink, Sink, SinkAndSubscription},
  subject::Subject,
  subscription::{Disposable, Subscription},
};

#[derive(Default)]
struct Connection {
  subscribers: usize,
  generation: u64,
  handle: Option<Subscription>,
}

pub struct RefCountOp<S, Sub> {
  connectable: ConnectableObservable<S, Sub>,
  connection: Arc<Mutex<Connection>>,
}

impl<S, Sub> Clone for RefCountOp<S, Sub> {
  fn clone(&self) -> Self {
    RefCountOp { connectable: self.connectable.clone(), connection: self.connection.clone() }
  }
}

impl<S, Sub> RefCountOp<S, Sub> {
  pub(crate) fn new(connectable: ConnectableObservable<S, Sub>) -> Self {
    RefCountOp { connectable, connection: Arc::new(Mutex::new(Connection::default())) }
  }
}

impl<S, Sub> Producer for RefCountOp<S, Sub>
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
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let subscription = self.connectable.subscribe_sink(ForwardSink(sink));

    let connect = {
      let mut connection = self.connection.lock();
      connection.subscribers += 1;
      (connection.subscribers == 1).then(|| {
        connection.generation += 1;
        connection.generation
      })
    };
    if let Some(generation) = connect {
      tracing::debug!(generation, "ref_count connecting");
      let handle = self.connectable.connect();
      let stale = {
        let mut connection = self.connection.lock();
        if connection.generation == generation && connection.subscribers > 0 {
          connection.handle = Some(handle.clone());
          false
        } else {
          true
        }
      };
      if stale {
        handle.dispose();
      }
    }

    let state = self.connection.clone();
    let upstream = Subscription::from_fn(move || {
      subscription.dispose();
      let last = {
        let mut connection = state.lock();
        connection.subscribers -= 1;
        if connection.subscribers == 0 {
          connection.generation += 1;
          connection.handle.take()
        } else {
          None
        }
      };
      if let Some(handle) = last {
        tracing::debug!("ref_count disconnecting");
        handle.dispose();
      }
    });
    SinkAndSubscription::new(handle, upstream)
  }
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
  fn one_upstream_subscription_for_many_subscribers() {
    let source = PublishSubject::<i32, Infallible>::new();
    let shared = source.clone().share();
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let (c_a, c_b) = (a.clone(), b.clone());
    let first = shared.subscribe(move |v| c_a.lock().unwrap().push(v));
    source.next(1);
    let second = shared.subscribe(move |v| c_b.lock().unwrap().push(v));
    source.next(2);
    assert_eq!(source.observer_count(), 1);

    first.dispose();
    assert!(source.has_observers());
    second.dispose();
    assert!(!source.has_observers());
    assert_eq!(*a.lock().unwrap(), vec![1, 2]);
    assert_eq!(*b.lock().unwrap(), vec![2]);
  }

  #[rxcore_macro::test]
  fn reconnects_after_everyone_left() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let c_subscriptions = subscriptions.clone();
    let source = PublishSubject::<i32, Infallible>::new();
    let c_source = source.clone();
    let shared = observable::defer(move || {
      c_subscriptions.fetch_add(1, Ordering::SeqCst);
      c_source.clone()
    })
    .share();

    shared.subscribe(|_| {}).dispose();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let _again = shared.subscribe(move |v| c_log.lock().unwrap().push(v));
    source.next(5);
    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    assert_eq!(*log.lock().unwrap(), vec![5]);
  }

  #[rxcore_macro::test]
  fn share_replay_serves_late_subscribers() {
    let source = PublishSubject::<i32, Infallible>::new();
    let shared = source.clone().share_replay(2);
    let _keep = shared.subscribe(|_| {});
    for v in 1..=3 {
      source.next(v);
    }
    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    shared.subscribe(move |v| c_late.lock().unwrap().push(v));
    assert_eq!(*late.lock().unwrap(), vec![2, 3]);
  }
}
