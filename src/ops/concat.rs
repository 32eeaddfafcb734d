//! Sequential concatenation.
//!
//! Sources are subscribed strictly one at a time, in order. Moving to the
//! next source never recurses: each move is a task on the
//! [`CurrentThreadScheduler`] trampoline, so a long run of sources that
//! complete synchronously is walked in a loop on a bounded stack. With a
//! host scheduler configured, every `yield_every`-th move is handed to that
//! scheduler instead, so such a run cannot monopolize the calling thread.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{CurrentThreadScheduler, Scheduler, SchedulerExt},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
};

/// Fairness settings for [`concat`](crate::observable::concat).
#[derive(Clone)]
pub struct ConcatConfig {
  yield_every: usize,
  scheduler: Option<Arc<dyn Scheduler>>,
}

impl ConcatConfig {
  pub const DEFAULT_YIELD_EVERY: usize = 64;

  pub fn new() -> Self { ConcatConfig { yield_every: Self::DEFAULT_YIELD_EVERY, scheduler: None } }

  /// Number of moves between two hand-offs to the host scheduler. Zero is
  /// treated as one.
  pub fn yield_every(mut self, moves: usize) -> Self {
    self.yield_every = moves.max(1);
    self
  }

  /// Host scheduler that periodic moves are handed to.
  pub fn scheduler<S: Scheduler>(mut self, scheduler: S) -> Self {
    self.scheduler = Some(Arc::new(scheduler));
    self
  }
}

impl Default for ConcatConfig {
  fn default() -> Self { Self::new() }
}

impl fmt::Debug for ConcatConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConcatConfig")
      .field("yield_every", &self.yield_every)
      .field("has_scheduler", &self.scheduler.is_some())
      .finish()
  }
}

pub struct ConcatOp<P> {
  sources: Arc<Vec<P>>,
  config: ConcatConfig,
}

impl<P> ConcatOp<P> {
  pub(crate) fn new(sources: Vec<P>, config: ConcatConfig) -> Self { ConcatOp { sources: Arc::new(sources), config } }
}

impl<P> Clone for ConcatOp<P> {
  fn clone(&self) -> Self { ConcatOp { sources: self.sources.clone(), config: self.config.clone() } }
}

struct Concat<O, P: Producer> {
  sink: Arc<SerialSink<O, P::Item, P::Err>>,
  sources: Arc<Vec<P>>,
  config: ConcatConfig,
  // (index of the next source, moves so far)
  cursor: Mutex<(usize, usize)>,
  current: Arc<SerialDisposable>,
  hop: Arc<SerialDisposable>,
}

impl<O, P> Concat<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn schedule_move(self: &Arc<Self>) {
    let moves = {
      let mut cursor = self.cursor.lock();
      cursor.1 += 1;
      cursor.1
    };
    let this = self.clone();
    let task = move || this.move_next();
    let handle = match &self.config.scheduler {
      Some(host) if moves % self.config.yield_every == 0 => {
        tracing::trace!(moves, "concat yields to host scheduler");
        host.schedule(task)
      }
      _ => CurrentThreadScheduler.schedule(task),
    };
    if !handle.is_disposed() {
      self.hop.set(handle.into());
    }
  }

  fn move_next(self: &Arc<Self>) {
    if self.current.is_disposed() {
      return;
    }
    let index = {
      let mut cursor = self.cursor.lock();
      let index = cursor.0;
      cursor.0 += 1;
      index
    };
    let Some(source) = self.sources.get(index) else {
      self.sink.forward(Event::Completed);
      return;
    };
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.current.set(Subscription::from_arc(slot.clone()));
    let subscription = source.subscribe_sink(ConcatInner { concat: self.clone() });
    let _ = slot.set(subscription);
  }
}

impl<P: Producer> Producer for ConcatOp<P> {
  type Item = P::Item;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<P::Item, P::Err> + Send + 'static,
  {
    let concat = Arc::new(Concat {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      sources: self.sources.clone(),
      config: self.config.clone(),
      cursor: Mutex::new((0, 0)),
      current: Arc::new(SerialDisposable::new()),
      hop: Arc::new(SerialDisposable::new()),
    });
    let this = concat.clone();
    let start = CurrentThreadScheduler.schedule(move || this.move_next());
    let upstream = Subscription::from_pair(
      Subscription::from_pair(start.into(), Subscription::from_arc(concat.hop.clone())),
      Subscription::from_arc(concat.current.clone()),
    );
    SinkAndSubscription::new(Subscription::from_arc(concat.sink.clone()), upstream)
  }
}

pub struct ConcatInner<O, P: Producer> {
  concat: Arc<Concat<O, P>>,
}

impl<O, P> Observer<P::Item, P::Err> for ConcatInner<O, P>
where
  O: Observer<P::Item, P::Err> + Send + 'static,
  P: Producer,
{
  fn next(&mut self, value: P::Item) { self.concat.sink.forward(Event::Next(value)) }

  fn error(self, err: P::Err) { self.concat.sink.forward(Event::Error(err)) }

  fn complete(self) { self.concat.schedule_move() }

  fn is_closed(&self) -> bool { self.concat.sink.is_stopped() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn sources_run_in_order() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    a.clone().concat(b.clone()).subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert!(!b.has_observers());
    b.next(0);
    a.next(1);
    a.complete();
    assert!(b.has_observers());
    b.next(2);
    b.complete();
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn error_aborts_the_rest() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::concat(vec![
      observable::just(1).box_it(),
      observable::throw_err("bad").box_it(),
      observable::just(3).box_it(),
    ])
    .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Error("bad")]);
  }

  #[rxcore_macro::test]
  fn long_synchronous_chain_keeps_the_stack_flat() {
    let total = Arc::new(Mutex::new(0u64));
    let c_total = total.clone();
    let sources = (0..100_000u64).map(observable::just::<_, std::convert::Infallible>);
    observable::concat(sources).subscribe(move |v| *c_total.lock().unwrap() += v);
    assert_eq!(*total.lock().unwrap(), (0..100_000u64).sum::<u64>());
  }

  #[rxcore_macro::test]
  fn yields_to_the_host_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let config = ConcatConfig::new().yield_every(2).scheduler(scheduler.clone());
    observable::concat_with_config((1..=4).map(observable::just::<_, std::convert::Infallible>), config)
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    scheduler.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
  }

  #[rxcore_macro::test]
  fn dispose_stops_moving_on() {
    let a = PublishSubject::<i32, ()>::new();
    let b = PublishSubject::<i32, ()>::new();
    let sub = a.clone().concat(b.clone()).subscribe_event(|_| {});
    sub.dispose();
    a.complete();
    assert!(!b.has_observers());
  }
}
