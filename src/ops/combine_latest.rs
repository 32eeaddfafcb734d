//! `combine_latest` over two sources of different types, and over a list of
//! sources of one type.
//!
//! Emits once every source has produced a value, then on every value from
//! any source. Completes when all sources completed, or as soon as one
//! completes without ever producing a value, since no combination can follow.
//! The selector runs under the state lock, so results are pushed in the order
//! the values were observed.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, Subscription},
};

// ==================== two sources ====================

pub struct CombineLatestOp<A, B, F> {
  a: A,
  b: B,
  f: Arc<F>,
}

impl<A, B, F> CombineLatestOp<A, B, F> {
  pub(crate) fn new(a: A, b: B, f: F) -> Self { CombineLatestOp { a, b, f: Arc::new(f) } }
}

impl<A: Clone, B: Clone, F> Clone for CombineLatestOp<A, B, F> {
  fn clone(&self) -> Self { CombineLatestOp { a: self.a.clone(), b: self.b.clone(), f: self.f.clone() } }
}

struct PairState<L, R> {
  left: Option<L>,
  right: Option<R>,
  left_done: bool,
  right_done: bool,
}

struct Pair<O, A: Producer, B: Producer, F, Out> {
  sink: Arc<SerialSink<O, Out, A::Err>>,
  state: Mutex<PairState<A::Item, B::Item>>,
  f: Arc<F>,
}

impl<O, A, B, F, Out> Pair<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn update(&self, apply: impl FnOnce(&mut PairState<A::Item, B::Item>)) {
    {
      let mut state = self.state.lock();
      apply(&mut state);
      if let (Some(l), Some(r)) = (&state.left, &state.right) {
        self.sink.push(Event::Next((self.f)(l.clone(), r.clone())));
      }
    }
    self.sink.drain();
  }

  fn done(&self, apply: impl FnOnce(&mut PairState<A::Item, B::Item>) -> bool) {
    {
      let mut state = self.state.lock();
      let had_value = apply(&mut state);
      if !had_value || (state.left_done && state.right_done) {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<A, B, F, Out> Producer for CombineLatestOp<A, B, F>
where
  A: Producer,
  B: Producer<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> Out + Send + Sync + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Out, A::Err> + Send + 'static,
  {
    let pair = Arc::new(Pair::<O, A, B, F, Out> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      state: Mutex::new(PairState { left: None, right: None, left_done: false, right_done: false }),
      f: self.f.clone(),
    });
    let left = self.a.subscribe_sink(CombineLeft(pair.clone()));
    let right = self.b.subscribe_sink(CombineRight(pair.clone()));
    SinkAndSubscription::new(Subscription::from_arc(pair.sink.clone()), Subscription::from_pair(left, right))
  }
}

pub struct CombineLeft<O, A: Producer, B: Producer, F, Out>(Arc<Pair<O, A, B, F, Out>>);

pub struct CombineRight<O, A: Producer, B: Producer, F, Out>(Arc<Pair<O, A, B, F, Out>>);

impl<O, A, B, F, Out> Observer<A::Item, A::Err> for CombineLeft<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn next(&mut self, value: A::Item) { self.0.update(|state| state.left = Some(value)) }

  fn error(self, err: A::Err) { self.0.sink.forward(Event::Error(err)) }

  fn complete(self) {
    self.0.done(|state| {
      state.left_done = true;
      state.left.is_some()
    })
  }

  fn is_closed(&self) -> bool { self.0.sink.is_stopped() }
}

impl<O, A, B, F, Out> Observer<B::Item, A::Err> for CombineRight<O, A, B, F, Out>
where
  O: Observer<Out, A::Err>,
  A: Producer,
  B: Producer<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  F: Fn(A::Item, B::Item) -> Out,
{
  fn next(&mut self, value: B::Item) { self.0.update(|state| state.right = Some(value)) }

  fn error(self, err: A::Err) { self.0.sink.forward(Event::Error(err)) }

  fn complete(self) {
    self.0.done(|state| {
      state.right_done = true;
      state.right.is_some()
    })
  }

  fn is_closed(&self) -> bool { self.0.sink.is_stopped() }
}

// ==================== many sources ====================

/// `combine_latest` over any number of sources; emits the latest values as a
/// vector in source order.
pub struct CombineLatestAllOp<P> {
  sources: Arc<Vec<P>>,
}

impl<P> CombineLatestAllOp<P> {
  pub(crate) fn new(sources: Vec<P>) -> Self { CombineLatestAllOp { sources: Arc::new(sources) } }
}

impl<P> Clone for CombineLatestAllOp<P> {
  fn clone(&self) -> Self { CombineLatestAllOp { sources: self.sources.clone() } }
}

struct ManyState<Item> {
  values: Vec<Option<Item>>,
  done: Vec<bool>,
}

struct Many<O, Item, Err> {
  sink: Arc<SerialSink<O, Vec<Item>, Err>>,
  state: Mutex<ManyState<Item>>,
}

impl<P> Producer for CombineLatestAllOp<P>
where
  P: Producer,
  P::Item: Clone,
{
  type Item = Vec<P::Item>;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Vec<P::Item>, P::Err> + Send + 'static,
  {
    let count = self.sources.len();
    let many = Arc::new(Many {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      state: Mutex::new(ManyState { values: (0..count).map(|_| None).collect(), done: vec![false; count] }),
    });
    if count == 0 {
      many.sink.forward(Event::Completed);
    }
    let subscriptions: Vec<_> = self
      .sources
      .iter()
      .enumerate()
      .map(|(index, source)| source.subscribe_sink(CombineSlot { many: many.clone(), index }))
      .collect();
    let upstream = Subscription::from_fn(move || {
      for subscription in subscriptions {
        subscription.dispose();
      }
    });
    SinkAndSubscription::new(Subscription::from_arc(many.sink.clone()), upstream)
  }
}

pub struct CombineSlot<O, Item, Err> {
  many: Arc<Many<O, Item, Err>>,
  index: usize,
}

impl<O, Item, Err> Observer<Item, Err> for CombineSlot<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
  Item: Clone,
{
  fn next(&mut self, value: Item) {
    {
      let mut state = self.many.state.lock();
      state.values[self.index] = Some(value);
      if let Some(latest) = state.values.iter().cloned().collect::<Option<Vec<_>>>() {
        self.many.sink.push(Event::Next(latest));
      }
    }
    self.many.sink.drain();
  }

  fn error(self, err: Err) { self.many.sink.forward(Event::Error(err)) }

  fn complete(self) {
    {
      let mut state = self.many.state.lock();
      state.done[self.index] = true;
      if state.values[self.index].is_none() || state.done.iter().all(|d| *d) {
        self.many.sink.push(Event::Completed);
      }
    }
    self.many.sink.drain();
  }

  fn is_closed(&self) -> bool { self.many.sink.is_stopped() }
}
