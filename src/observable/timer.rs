use std::{marker::PhantomData, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  observable::Producer,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
  sink::{Sink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits `0` once `due` has elapsed on `scheduler`, then completes.
pub fn timer<S, Err>(due: Duration, scheduler: S) -> Timer<S, Err>
where
  S: Scheduler + Clone,
{
  Timer { due, scheduler, _err: PhantomData }
}

pub struct Timer<S, Err> {
  due: Duration,
  scheduler: S,
  _err: PhantomData<fn() -> Err>,
}

impl<S: Clone, Err> Clone for Timer<S, Err> {
  fn clone(&self) -> Self { Timer { due: self.due, scheduler: self.scheduler.clone(), _err: PhantomData } }
}

impl<S, Err> Producer for Timer<S, Err>
where
  S: Scheduler + Clone,
  Err: Send + 'static,
{
  type Item = u64;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<u64, Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let sink = Mutex::new(sink);
    let task = self.scheduler.schedule_relative(self.due, move || {
      let mut sink = sink.lock();
      sink.forward_next(0);
      sink.forward_completed();
    });
    SinkAndSubscription::new(handle, task.into())
  }
}

/// Emits `0, 1, 2, ...`, one value every `period` on `scheduler`, starting
/// one period after subscription.
pub fn interval<S, Err>(period: Duration, scheduler: S) -> Interval<S, Err>
where
  S: Scheduler + Clone,
{
  Interval { period, scheduler, _err: PhantomData }
}

pub struct Interval<S, Err> {
  period: Duration,
  scheduler: S,
  _err: PhantomData<fn() -> Err>,
}

impl<S: Clone, Err> Clone for Interval<S, Err> {
  fn clone(&self) -> Self {
    Interval { period: self.period, scheduler: self.scheduler.clone(), _err: PhantomData }
  }
}

impl<S, Err> Producer for Interval<S, Err>
where
  S: Scheduler + Clone,
  Err: Send + 'static,
{
  type Item = u64;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<u64, Err> + Send + 'static,
  {
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let sink = Arc::new(Mutex::new(sink));
    let task = self.scheduler.schedule_periodic(0u64, self.period, self.period, move |tick| {
      sink.lock().forward_next(*tick);
      *tick += 1;
    });
    SinkAndSubscription::new(handle, task.into())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::{
    prelude::*,
    scheduler::{Duration, VirtualTimeScheduler},
  };

  fn ms(v: u64) -> Duration { Duration::from_millis(v) }

  #[rxcore_macro::test]
  fn timer_fires_once() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let clock = scheduler.clone();
    observable::timer::<_, ()>(ms(50), scheduler.clone())
      .subscribe_event(move |e| c_log.lock().unwrap().push((clock.now(), e)));
    scheduler.advance_to(ms(49)).unwrap();
    assert!(log.lock().unwrap().is_empty());
    scheduler.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![(ms(50), Event::Next(0)), (ms(50), Event::Completed)]);
  }

  #[rxcore_macro::test]
  fn interval_until_disposed() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let sub = observable::interval(ms(10), scheduler.clone()).subscribe(move |v| c_log.lock().unwrap().push(v));
    scheduler.advance_to(ms(35)).unwrap();
    sub.dispose();
    scheduler.advance_to(ms(100)).unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
  }

  #[rxcore_macro::test]
  fn interval_with_take_stops_the_task() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    observable::interval::<_, ()>(ms(10), scheduler.clone())
      .take(2)
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    scheduler.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(0), Event::Next(1), Event::Completed]);
  }
}
