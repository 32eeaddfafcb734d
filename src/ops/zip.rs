//! `zip` pairs up values by index.
//!
//! Each source gets its own FIFO queue. A combined value is emitted as soon
//! as every queue holds a value, consuming one from each. The stream
//! completes as soon as some source has completed with an empty queue: no
//! further combination is possible from that point.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, Subscription},
};

// ==================== two sources ====================

pub struct ZipOp<A, B, F> {
  a: A,
  b: B,
  f: Arc<F>,
}

impl<A, B, F> ZipOp<A, B, F> {
  pub(crate) fn new(a: A, b: B, f: F) -> Self { ZipOp { a, b, f: Arc::new(f) } }
}

impl<A: Clone, B: Clone, F> Clone for ZipOp<A, B, F> {
  fn clone(&self) -> Self { ZipOp { a: self.a.clone(), b: self.b.clone(), f: self.f.clone() } }
}

struct ZipState<L, R> {
  left: VecDeque<L>,
  right: VecDeque<R>,
  left_done: bool,
  right_done: bool,
}

impl<L, R> ZipState<L, R> {
  fn exhausted(&self) -> bool {
    (self.left_done && self.left.is_empty()) || (self.right_done && self.right.is_empty())
  }
}

struct Zip<O, A: Producer, B: Producer, F, Out> {
  sink: Arc<SerialSink<O, Out, A::Err>>,
  state: Mutex<ZipState<A::Item, B::Item>>,
  f: Arc<F>,
}

impl<O, A, B, F, Out> Zip<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn update(&self, apply: impl FnOnce(&mut ZipState<A::Item, B::Item>)) {
    {
      let mut state = self.state.lock();
      apply(&mut state);
      if !state.left.is_empty() && !state.right.is_empty() {
        if let (Some(l), Some(r)) = (state.left.pop_front(), state.right.pop_front()) {
          self.sink.push(Event::Next((self.f)(l, r)));
        }
      }
      if state.exhausted() {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<A, B, F, Out> Producer for ZipOp<A, B, F>
where
  A: Producer,
  B: Producer<Err = A::Err>,
  F: Fn(A::Item, B::Item) -> Out + Send + Sync + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Out, A::Err> + Send + 'static,
  {
    let zip = Arc::new(Zip::<O, A, B, F, Out> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      state: Mutex::new(ZipState {
        left: VecDeque::new(),
        right: VecDeque::new(),
        left_done: false,
        right_done: false,
      }),
      f: self.f.clone(),
    });
    let left = self.a.subscribe_sink(ZipLeft(zip.clone()));
    let right = self.b.subscribe_sink(ZipRight(zip.clone()));
    SinkAndSubscription::new(Subscription::from_arc(zip.sink.clone()), Subscription::from_pair(left, right))
  }
}

pub struct ZipLeft<O, A: Producer, B: Producer, F, Out>(Arc<Zip<O, A, B, F, Out>>);

pub struct ZipRight<O, A: Producer, B: Producer, F, Out>(Arc<Zip<O, A, B, F, Out>>);

impl<O, A, B, F, Out> Observer<A::Item, A::Err> for ZipLeft<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn next(&mut self, value: A::Item) { self.0.update(|state| state.left.push_back(value)) }

  fn error(self, err: A::Err) { self.0.sink.forward(Event::Error(err)) }

  fn complete(self) { self.0.update(|state| state.left_done = true) }

  fn is_closed(&self) -> bool { self.0.sink.is_stopped() }
}

impl<O, A, B, F, Out> Observer<B::Item, A::Err> for ZipRight<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn next(&mut self, value: B::Item) { self.0.update(|state| state.right.push_back(value)) }

  fn error(self, err: A::Err) { self.0.sink.forward(Event::Error(err)) }

  fn complete(self) { self.0.update(|state| state.right_done = true) }

  fn is_closed(&self) -> bool { self.0.sink.is_stopped() }
}

// ==================== many sources ====================

/// `zip` over any number of sources of one type.
pub struct ZipAllOp<P> {
  sources: Arc<Vec<P>>,
}

impl<P> ZipAllOp<P> {
  pub(crate) fn new(sources: Vec<P>) -> Self { ZipAllOp { sources: Arc::new(sources) } }
}

impl<P> Clone for ZipAllOp<P> {
  fn clone(&self) -> Self { ZipAllOp { sources: self.sources.clone() } }
}

struct Queues<Item> {
  queues: Vec<VecDeque<Item>>,
  done: Vec<bool>,
}

struct ZipMany<O, Item, Err> {
  sink: Arc<SerialSink<O, Vec<Item>, Err>>,
  state: Mutex<Queues<Item>>,
}

impl<O, Item, Err> ZipMany<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
{
  fn update(&self, apply: impl FnOnce(&mut Queues<Item>)) {
    {
      let mut state = self.state.lock();
      apply(&mut state);
      if state.queues.iter().all(|q| !q.is_empty()) {
        let row: Vec<Item> = state.queues.iter_mut().filter_map(VecDeque::pop_front).collect();
        self.sink.push(Event::Next(row));
      }
      let exhausted = state.done.iter().zip(&state.queues).any(|(done, queue)| *done && queue.is_empty());
      if exhausted {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<P: Producer> Producer for ZipAllOp<P> {
  type Item = Vec<P::Item>;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Vec<P::Item>, P::Err> + Send + 'static,
  {
    let count = self.sources.len();
    let zip = Arc::new(ZipMany {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      state: Mutex::new(Queues { queues: (0..count).map(|_| VecDeque::new()).collect(), done: vec![false; count] }),
    });
    if count == 0 {
      zip.sink.forward(Event::Completed);
    }
    let subscriptions: Vec<_> = self
      .sources
      .iter()
      .enumerate()
      .map(|(index, source)| source.subscribe_sink(ZipSlot { zip: zip.clone(), index }))
      .collect();
    let upstream = Subscription::from_fn(move || {
      for subscription in subscriptions {
        subscription.dispose();
      }
    });
    SinkAndSubscription::new(Subscription::from_arc(zip.sink.clone()), upstream)
  }
}

pub struct ZipSlot<O, Item, Err> {
  zip: Arc<ZipMany<O, Item, Err>>,
  index: usize,
}

impl<O, Item, Err> Observer<Item, Err> for ZipSlot<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) {
    let index = self.index;
    self.zip.update(|state| state.queues[index].push_back(value))
  }

  fn error(self, err: Err) { self.zip.sink.forward(Event::Error(err)) }

  fn complete(self) {
    let index = self.index;
    self.zip.update(|state| state.done[index] = true)
  }

  fn is_closed(&self) -> bool { self.zip.sink.is_stopped() }
}
