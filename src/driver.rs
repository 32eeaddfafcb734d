//! `Driver`: a stream meant to drive UI-like consumers.
//!
//! A driver
//! * never fails: it can only be built through a conversion that says how to
//!   recover, so its error type is [`Infallible`];
//! * subscribes to its upstream, and delivers, on one designated scheduler;
//! * shares one upstream subscription among all its subscribers and replays
//!   the latest value to each new one, for as long as anyone is subscribed.
//!
//! Combining drivers requires them to share the same scheduler type, checked
//! at compile time.
//!
//! ```
//! use rxcore::prelude::*;
//!
//! let scheduler = ImmediateScheduler;
//! let text = PublishSubject::<String, std::io::Error>::new();
//! let length = text
//!   .clone()
//!   .as_driver_on_error_just_return(String::new(), scheduler)
//!   .map(|s| s.len());
//! length.drive(|n| println!("{n} chars"));
//! text.next("hello".into());
//! ```

use std::convert::Infallible;

use crate::{
  observable::{self, BoxedObservable, Observable, Producer},
  observer::Observer,
  scheduler::Scheduler,
  subscription::Subscription,
};

mod binder;
pub use binder::Binder;

/// Observable that cannot fail, delivers on `S` and replays its latest value
/// while connected.
pub struct Driver<T, S> {
  source: BoxedObservable<T, Infallible>,
  scheduler: S,
}

impl<T, S: Clone> Clone for Driver<T, S> {
  fn clone(&self) -> Self { Driver { source: self.source.clone(), scheduler: self.scheduler.clone() } }
}

impl<T, S> Driver<T, S>
where
  T: Clone + Send + Sync + 'static,
  S: Scheduler + Clone,
{
  /// Shares `source` and replays its latest value while connected.
  fn shared<P>(source: P, scheduler: S) -> Self
  where
    P: Producer<Item = T, Err = Infallible>,
  {
    Driver { source: source.share_replay(1).box_it(), scheduler }
  }

  /// A driver over an already shared source.
  fn raw<P>(source: P, scheduler: S) -> Self
  where
    P: Producer<Item = T, Err = Infallible>,
  {
    Driver { source: source.box_it(), scheduler }
  }

  /// Emits `value` on `scheduler`, then completes.
  pub fn just(value: T, scheduler: S) -> Self {
    Self::raw(observable::just(value).subscribe_on(scheduler.clone()), scheduler)
  }

  pub fn empty(scheduler: S) -> Self { Self::raw(observable::empty().subscribe_on(scheduler.clone()), scheduler) }

  pub fn never(scheduler: S) -> Self { Self::raw(observable::never().subscribe_on(scheduler.clone()), scheduler) }

  pub fn scheduler(&self) -> &S { &self.scheduler }

  /// The underlying observable, for composing with plain operators.
  pub fn as_observable(&self) -> BoxedObservable<T, Infallible> { self.source.clone() }

  pub fn map<R, F>(&self, f: F) -> Driver<R, S>
  where
    R: Clone + Send + Sync + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
  {
    Driver::shared(self.source.clone().map(f), self.scheduler.clone())
  }

  pub fn filter<F>(&self, f: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    Driver::shared(self.source.clone().filter(f), self.scheduler.clone())
  }

  pub fn distinct_until_changed(&self) -> Self
  where
    T: PartialEq,
  {
    Driver::shared(self.source.clone().distinct_until_changed(), self.scheduler.clone())
  }

  pub fn scan<Acc, F>(&self, seed: Acc, f: F) -> Driver<Acc, S>
  where
    Acc: Clone + Send + Sync + 'static,
    F: Fn(Acc, T) -> Acc + Send + Sync + 'static,
  {
    Driver::shared(self.source.clone().scan(seed, f), self.scheduler.clone())
  }

  pub fn start_with(&self, values: Vec<T>) -> Self {
    Driver::shared(self.source.clone().start_with(values), self.scheduler.clone())
  }

  /// Maps every value to a driver and mirrors only the latest one.
  pub fn flat_map_latest<R, F>(&self, f: F) -> Driver<R, S>
  where
    R: Clone + Send + Sync + 'static,
    F: Fn(T) -> Driver<R, S> + Send + Sync + 'static,
  {
    let inner = self.source.clone().switch_map(move |v| f(v).source);
    Driver::shared(inner, self.scheduler.clone())
  }

  pub fn combine_latest<U, R, F>(&self, other: &Driver<U, S>, f: F) -> Driver<R, S>
  where
    U: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    let combined = self.source.clone().combine_latest(other.source.clone(), f);
    Driver::shared(combined, self.scheduler.clone())
  }

  /// Subscribes `next`. Nothing else needs handling: a driver cannot fail.
  pub fn drive<F>(&self, next: F) -> Subscription
  where
    F: FnMut(T) + Send + 'static,
  {
    self.source.subscribe(next)
  }

  pub fn drive_observer<O>(&self, observer: O) -> Subscription
  where
    O: Observer<T, Infallible> + Send + 'static,
  {
    self.source.subscribe_observer(observer)
  }

  pub fn drive_binder(&self, binder: Binder<T>) -> Subscription { self.source.subscribe_observer(binder) }
}

/// Conversions into [`Driver`]. Each one says how to recover from an error,
/// since a driver cannot fail.
pub trait AsDriver: Producer + Sized
where
  Self::Item: Clone + Sync,
{
  /// Replaces an error with `value`, then completes.
  fn as_driver_on_error_just_return<S>(self, value: Self::Item, scheduler: S) -> Driver<Self::Item, S>
  where
    S: Scheduler + Clone,
  {
    let source = self
      .subscribe_on(scheduler.clone())
      .observe_on(scheduler.clone())
      .catch_error_just_return::<Infallible>(value);
    Driver::shared(source, scheduler)
  }

  /// Continues with `fallback` after an error.
  fn as_driver_on_error_drive_with<S>(self, fallback: Driver<Self::Item, S>, scheduler: S) -> Driver<Self::Item, S>
  where
    S: Scheduler + Clone,
  {
    let source = self
      .subscribe_on(scheduler.clone())
      .observe_on(scheduler.clone())
      .catch_error(move |_| fallback.source.clone());
    Driver::shared(source, scheduler)
  }

  /// Continues with the driver `recover` builds from the error.
  fn as_driver_on_error_recover<S, F>(self, recover: F, scheduler: S) -> Driver<Self::Item, S>
  where
    S: Scheduler + Clone,
    F: Fn(Self::Err) -> Driver<Self::Item, S> + Send + Sync + 'static,
  {
    let source = self
      .subscribe_on(scheduler.clone())
      .observe_on(scheduler.clone())
      .catch_error(move |err| recover(err).source);
    Driver::shared(source, scheduler)
  }
}

impl<P> AsDriver for P
where
  P: Producer,
  P::Item: Clone + Sync,
{
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn errors_are_replaced() {
    let source = PublishSubject::<i32, &'static str>::new();
    let driver = source.clone().as_driver_on_error_just_return(-1, ImmediateScheduler);
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    driver.drive(move |v| c_log.lock().unwrap().push(v));
    source.next(1);
    source.error("bad");
    assert_eq!(*log.lock().unwrap(), vec![1, -1]);
  }

  #[rxcore_macro::test]
  fn late_subscribers_get_the_latest_value() {
    let source = PublishSubject::<i32, ()>::new();
    let driver = source.clone().as_driver_on_error_just_return(0, ImmediateScheduler);
    let _first = driver.drive(|_| {});
    source.next(1);
    source.next(2);
    let late = Arc::new(Mutex::new(vec![]));
    let c_late = late.clone();
    driver.drive(move |v| c_late.lock().unwrap().push(v));
    assert_eq!(*late.lock().unwrap(), vec![2]);
    assert_eq!(source.observer_count(), 1);
  }

  #[rxcore_macro::test]
  fn delivers_on_its_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, ()>::new();
    let driver = source.clone().as_driver_on_error_just_return(0, scheduler.clone()).map(|v| v * 10);
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    driver.drive(move |v| c_log.lock().unwrap().push(v));
    assert!(!source.has_observers());
    scheduler.start().unwrap();
    assert!(source.has_observers());
    source.next(1);
    assert!(log.lock().unwrap().is_empty());
    scheduler.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![10]);
  }

  #[rxcore_macro::test]
  fn recover_switches_to_another_driver() {
    let source = PublishSubject::<i32, i32>::new();
    let driver =
      source.clone().as_driver_on_error_recover(|code| Driver::just(code * 100, ImmediateScheduler), ImmediateScheduler);
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    driver.drive(move |v| c_log.lock().unwrap().push(v));
    source.error(4);
    assert_eq!(*log.lock().unwrap(), vec![400]);
  }

  #[rxcore_macro::test]
  fn combinators_keep_sharing() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let c_subscriptions = subscriptions.clone();
    let numbers = PublishSubject::<i32, ()>::new();
    let c_numbers = numbers.clone();
    let driver = observable::defer(move || {
      c_subscriptions.fetch_add(1, Ordering::SeqCst);
      c_numbers.clone()
    })
    .as_driver_on_error_just_return(0, ImmediateScheduler)
    .scan(0, |acc, v| acc + v)
    .distinct_until_changed();

    let sums = Arc::new(Mutex::new(vec![]));
    let c_sums = sums.clone();
    let _a = driver.drive(move |v| c_sums.lock().unwrap().push(v));
    let _b = driver.drive(|_| {});
    numbers.next(1);
    numbers.next(0);
    numbers.next(2);
    assert_eq!(*sums.lock().unwrap(), vec![1, 3]);
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn flat_map_latest_follows_the_newest_driver() {
    let outer = PublishSubject::<u8, ()>::new();
    let a = PublishSubject::<&'static str, ()>::new();
    let b = PublishSubject::<&'static str, ()>::new();
    let (c_a, c_b) = (a.clone(), b.clone());
    let driver = outer.clone().as_driver_on_error_just_return(0, ImmediateScheduler).flat_map_latest(move |k| {
      let inner = if k == 0 { c_a.clone() } else { c_b.clone() };
      inner.as_driver_on_error_just_return("", ImmediateScheduler)
    });
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    driver.drive(move |v| c_log.lock().unwrap().push(v));
    outer.next(0);
    a.next("a1");
    outer.next(1);
    a.next("a2");
    b.next("b1");
    assert_eq!(*log.lock().unwrap(), vec!["a1", "b1"]);
  }
}
