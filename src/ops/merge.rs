//! `merge`, `merge_all` and the operators built on them (`flat_map`,
//! `concat_all`, `concat_map`).
//!
//! Every inner subscription lives in one [`CompositeDisposable`]. An inner
//! is registered in the group before it is subscribed, so a teardown that
//! races with its subscription still reaches it. When a concurrency limit is
//! set, inner observables arriving at the limit wait in a queue and are
//! subscribed, in arrival order, as running ones complete. Starting a
//! queued inner goes through the [`CurrentThreadScheduler`] trampoline, so
//! `concat_all` over a long run of synchronous inners loops instead of
//! recursing.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::{
  bag::BagKey,
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{CurrentThreadScheduler, SchedulerExt},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{CompositeDisposable, SingleAssignmentDisposable, Subscription},
};

struct MergeState<P> {
  active: usize,
  queue: VecDeque<P>,
  outer_done: bool,
}

struct Merge<O, P: Producer> {
  sink: Arc<SerialSink<O, P::Item, P::Err>>,
  group: Arc<CompositeDisposable>,
  state: Mutex<MergeState<P>>,
  max_concurrent: Option<usize>,
}

impl<O, P> Merge<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn new(observer: O, cancel: Subscription, max_concurrent: Option<usize>) -> Arc<Self> {
    Arc::new(Merge {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      group: Arc::new(CompositeDisposable::new()),
      state: Mutex::new(MergeState { active: 0, queue: VecDeque::new(), outer_done: false }),
      max_concurrent,
    })
  }

  fn slots(&self, outer: Subscription) -> SinkAndSubscription {
    let group = Subscription::from_arc(self.group.clone());
    SinkAndSubscription::new(Subscription::from_arc(self.sink.clone()), Subscription::from_pair(outer, group))
  }

  fn subscribe_inner(self: &Arc<Self>, inner: &P) {
    let slot = Arc::new(SingleAssignmentDisposable::new());
    let Some(key) = self.group.insert(Subscription::from_arc(slot.clone())) else {
      return;
    };
    let subscription = inner.subscribe_sink(MergeInner { merge: self.clone(), key: Some(key) });
    let _ = slot.set(subscription);
  }

  fn inner_completed(self: &Arc<Self>) {
    let next = {
      let mut state = self.state.lock();
      match state.queue.pop_front() {
        Some(next) => Some(next),
        None => {
          state.active -= 1;
          if state.outer_done && state.active == 0 {
            self.sink.push(Event::Completed);
          }
          None
        }
      }
    };
    match next {
      Some(next) => {
        let this = self.clone();
        CurrentThreadScheduler.schedule(move || this.subscribe_inner(&next));
      }
      None => self.sink.drain(),
    }
  }
}

// ==================== merge_all ====================

/// Flattens an observable of observables.
#[derive(Clone)]
pub struct MergeAllOp<S> {
  source: S,
  max_concurrent: Option<usize>,
}

impl<S> MergeAllOp<S> {
  pub(crate) fn new(source: S, max_concurrent: Option<usize>) -> Self {
    // a limit of zero would never subscribe anything
    MergeAllOp { source, max_concurrent: max_concurrent.map(|n| n.max(1)) }
  }
}

impl<S> Producer for MergeAllOp<S>
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
    let merge = Merge::new(observer, cancel, self.max_concurrent);
    let outer = self.source.subscribe_sink(MergeOuter { merge: merge.clone() });
    merge.slots(outer)
  }
}

pub struct MergeOuter<O, P: Producer> {
  merge: Arc<Merge<O, P>>,
}

impl<O, P> Observer<P, P::Err> for MergeOuter<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn next(&mut self, inner: P) {
    let run_now = {
      let mut state = self.merge.state.lock();
      match self.merge.max_concurrent {
        Some(max) if state.active >= max => {
          state.queue.push_back(inner);
          None
        }
        _ => {
          state.active += 1;
          Some(inner)
        }
      }
    };
    if let Some(inner) = run_now {
      self.merge.subscribe_inner(&inner);
    }
  }

  fn error(self, err: P::Err) { self.merge.sink.forward(Event::Error(err)) }

  fn complete(self) {
    {
      let mut state = self.merge.state.lock();
      state.outer_done = true;
      if state.active == 0 {
        self.merge.sink.push(Event::Completed);
      }
    }
    self.merge.sink.drain();
  }

  fn is_closed(&self) -> bool { self.merge.sink.is_stopped() }
}

pub struct MergeInner<O, P: Producer> {
  merge: Arc<Merge<O, P>>,
  key: Option<BagKey>,
}

impl<O, P> Observer<P::Item, P::Err> for MergeInner<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn next(&mut self, value: P::Item) { self.merge.sink.forward(Event::Next(value)) }

  fn error(self, err: P::Err) { self.merge.sink.forward(Event::Error(err)) }

  fn complete(mut self) {
    if let Some(key) = self.key.take() {
      self.merge.group.remove(key);
    }
    self.merge.inner_completed();
  }

  fn is_closed(&self) -> bool { self.merge.sink.is_stopped() }
}

// ==================== merge over a fixed set ====================

/// Merges a fixed list of sources.
pub struct MergeSourcesOp<P> {
  sources: Arc<Vec<P>>,
}

impl<P> MergeSourcesOp<P> {
  pub(crate) fn new(sources: Vec<P>) -> Self { MergeSourcesOp { sources: Arc::new(sources) } }
}

impl<P> Clone for MergeSourcesOp<P> {
  fn clone(&self) -> Self { MergeSourcesOp { sources: self.sources.clone() } }
}

impl<P: Producer> Producer for MergeSourcesOp<P> {
  type Item = P::Item;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<P::Item, P::Err> + Send + 'static,
  {
    let merge = Merge::<O, P>::new(observer, cancel, None);
    {
      let mut state = merge.state.lock();
      state.active = self.sources.len();
      state.outer_done = true;
    }
    if self.sources.is_empty() {
      merge.sink.forward(Event::Completed);
    }
    for source in self.sources.iter() {
      if merge.sink.is_stopped() {
        break;
      }
      merge.subscribe_inner(source);
    }
    merge.slots(Subscription::empty())
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn interleaves_by_arrival() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    a.clone().merge(b.clone()).subscribe_event(move |e| c_log.lock().unwrap().push(e));
    a.next(1);
    b.next(2);
    a.next(3);
    a.complete();
    b.next(4);
    b.complete();
    assert_eq!(
      *log.lock().unwrap(),
      vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Next(4), Event::Completed]
    );
  }

  #[rxcore_macro::test]
  fn first_error_wins_and_disposes_all() {
    let a = PublishSubject::<i32, &'static str>::new();
    let b = PublishSubject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::merge(vec![a.clone(), b.clone()]).subscribe_event(move |e| c_log.lock().unwrap().push(e));
    a.error("boom");
    b.next(1);
    assert_eq!(*log.lock().unwrap(), vec![Event::Error("boom")]);
    assert!(!a.has_observers());
    assert!(!b.has_observers());
  }

  #[rxcore_macro::test]
  fn empty_list_completes() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::merge(Vec::<observable::Empty<i32, ()>>::new())
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Completed]);
  }

  #[rxcore_macro::test]
  fn flat_map_waits_for_outer_and_inners() {
    let outer = PublishSubject::<i32, ()>::new();
    let inner = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let c_inner = inner.clone();
    outer
      .clone()
      .flat_map(move |v| c_inner.clone().map(move |x| x * v))
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    outer.next(10);
    inner.next(1);
    outer.complete();
    inner.next(2);
    inner.complete();
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(10), Event::Next(20), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn limited_concurrency_queues_inners() {
    let first = PublishSubject::<i32, ()>::new();
    let second = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(vec![first.clone(), second.clone()])
      .concat_all()
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert!(first.has_observers());
    assert!(!second.has_observers());
    second.next(0);
    first.next(1);
    first.complete();
    assert!(second.has_observers());
    second.next(2);
    second.complete();
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn synchronous_inners_concat_in_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::from_iter(1..=3)
      .concat_map(|v| observable::from_iter(vec![v, v * 10]))
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![1, 10, 2, 20, 3, 30]);
  }

  #[rxcore_macro::test]
  fn queued_synchronous_inners_keep_the_stack_flat() {
    let gate = PublishSubject::<i32, Infallible>::new();
    let inners = std::iter::once(gate.clone().box_it())
      .chain((0..50_000).map(|v| observable::just(v).box_it()))
      .collect::<Vec<_>>();
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    observable::from_iter(inners).concat_all().subscribe_all(
      move |_| *c_count.lock().unwrap() += 1,
      |_| {},
      move || *c_completed.lock().unwrap() = true,
    );
    assert_eq!(*count.lock().unwrap(), 0);
    gate.complete();
    assert_eq!(*count.lock().unwrap(), 50_000);
    assert!(*completed.lock().unwrap());
  }

  #[rxcore_macro::test]
  fn dispose_reaches_every_inner() {
    let outer = PublishSubject::<i32, ()>::new();
    let inner = PublishSubject::<i32, ()>::new();
    let c_inner = inner.clone();
    let sub = outer.clone().flat_map(move |_| c_inner.clone()).subscribe_event(|_| {});
    outer.next(1);
    outer.next(2);
    assert_eq!(inner.observer_count(), 2);
    sub.dispose();
    assert!(!inner.has_observers());
    assert!(!outer.has_observers());
  }
}
