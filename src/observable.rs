//! Observables: the [`Producer`] core trait, the [`Observable`] facade with
//! `subscribe` and every operator, and the source constructors.
//!
//! A producer is inert: it only describes how to start. Each call to
//! `subscribe` runs it again, building fresh per-subscription state, so one
//! producer value may be subscribed many times and from many threads.

use std::{convert::Infallible, sync::Arc, time::Duration};

use crate::{
  observer::{AutoDetachObserver, EventObserver, FnMutObserver, Observer, ObserverAll},
  ops::{
    catch::{CatchJustReturnOp, CatchOp},
    combine_latest::{CombineLatestAllOp, CombineLatestOp},
    concat::{ConcatConfig, ConcatOp},
    default_if_empty::DefaultIfEmptyOp,
    delay::DelayOp,
    distinct_until_changed::DistinctUntilChangedOp,
    filter::{FilterOp, TryFilterOp},
    finalize::FinalizeOp,
    ignore_elements::IgnoreElementsOp,
    map::{MapErrOp, MapOp, TryMapOp},
    merge::{MergeAllOp, MergeSourcesOp},
    observe_on::ObserveOnOp,
    reduce::ReduceOp,
    ref_count::RefCountOp,
    retry::{RetryConfig, RetryOp},
    sample::SampleOp,
    scan::{ScanOp, TryScanOp},
    skip::{SkipOp, SkipWhileOp},
    start_with::StartWithOp,
    subscribe_on::SubscribeOnOp,
    switch::SwitchLatestOp,
    take::{TakeOp, TakeWhileOp},
    take_until::TakeUntilOp,
    tap::TapOp,
    throttle::ThrottleOp,
    throttle_latest::ThrottleLatestOp,
    zip::{ZipAllOp, ZipOp},
  },
  scheduler::Scheduler,
  sink::{SinkAndSubscription, SinkDisposer},
  subject::{PublishSubject, ReplayPolicy, ReplaySubject, Subject},
  subscription::{SingleAssignmentDisposable, Subscription},
};

mod boxed;
mod connectable;
mod create;
mod defer;
mod from_iter;
mod of;
mod timer;

pub use boxed::{BoxedObservable, DynProducer};
pub use connectable::ConnectableObservable;
pub use create::{create, Create, Emitter};
pub use defer::{defer, Defer};
pub use from_iter::{from_iter, FromIter};
pub use of::{empty, just, never, of, throw_err, Empty, Just, Never, ThrowErr};
pub use timer::{interval, timer, Interval, Timer};

// ==================== Producer ====================

/// Subscription-time logic of an observable.
///
/// `run` builds the per-subscription sink around `observer` and subscribes
/// upstream. `cancel` disposes the whole subscription; sinks dispose it after
/// forwarding a terminal event.
pub trait Producer: Send + Sync + 'static {
  type Item: Send + 'static;
  type Err: Send + 'static;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;

  /// Subscribes without auto-detaching: used by operators to subscribe to
  /// their sources.
  fn subscribe_sink<O>(&self, observer: O) -> Subscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let disposer = Arc::new(SinkDisposer::new());
    let slots = self.run(observer, Subscription::from_arc(disposer.clone()));
    disposer.set(slots);
    Subscription::from_arc(disposer)
  }
}

// ==================== Source constructors over many sources ====================

/// Emits every value of every source as it arrives; completes once all
/// sources complete, fails on the first error.
pub fn merge<P, I>(sources: I) -> MergeSourcesOp<P>
where
  P: Producer,
  I: IntoIterator<Item = P>,
{
  MergeSourcesOp::new(sources.into_iter().collect())
}

/// Subscribes to each source only after the previous one completed.
pub fn concat<P, I>(sources: I) -> ConcatOp<P>
where
  P: Producer,
  I: IntoIterator<Item = P>,
{
  ConcatOp::new(sources.into_iter().collect(), ConcatConfig::default())
}

/// [`concat`] with explicit fairness settings.
pub fn concat_with_config<P, I>(sources: I, config: ConcatConfig) -> ConcatOp<P>
where
  P: Producer,
  I: IntoIterator<Item = P>,
{
  ConcatOp::new(sources.into_iter().collect(), config)
}

/// Emits the latest value of every source, as a vector in source order,
/// whenever any of them emits, once all have emitted.
pub fn combine_latest_all<P, I>(sources: I) -> CombineLatestAllOp<P>
where
  P: Producer,
  P::Item: Clone,
  I: IntoIterator<Item = P>,
{
  CombineLatestAllOp::new(sources.into_iter().collect())
}

/// Pairs up the n-th values of every source.
pub fn zip_all<P, I>(sources: I) -> ZipAllOp<P>
where
  P: Producer,
  I: IntoIterator<Item = P>,
{
  ZipAllOp::new(sources.into_iter().collect())
}

fn noop_next<Item>(_: &Item) {}
fn noop_err<Err>(_: &Err) {}
fn noop() {}
fn pair<A, B>(a: A, b: B) -> (A, B) { (a, b) }

// ==================== Observable ====================

/// User-facing facade: subscription entry points and every operator.
///
/// Implemented for every [`Producer`]. Operators consume `self` and return a
/// new producer; clone a producer to reuse it.
pub trait Observable: Producer + Sized {
  // ---------- subscribe ----------

  /// Subscribes with a `next` closure. Only available for streams that
  /// cannot fail.
  fn subscribe<F>(&self, next: F) -> Subscription
  where
    Self: Producer<Err = Infallible>,
    F: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_observer(FnMutObserver(next))
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe_observer(ObserverAll::new(next, error, complete))
  }

  /// Receives every notification as an [`Event`](crate::event::Event).
  fn subscribe_event<F>(&self, on_event: F) -> Subscription
  where
    F: FnMut(crate::event::Event<Self::Item, Self::Err>) + Send + 'static,
  {
    self.subscribe_observer(EventObserver(on_event))
  }

  /// Subscribes `observer`. The subscription detaches itself after a
  /// terminal event; the returned handle reports disposed from then on.
  fn subscribe_observer<O>(&self, observer: O) -> Subscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let slot = Arc::new(SingleAssignmentDisposable::new());
    let subscription = self.subscribe_sink(AutoDetachObserver::new(observer, slot.clone()));
    // the slot is fresh: assignment only fails if it was disposed already,
    // in which case the subscription has been disposed by `set`
    let _ = slot.set(subscription);
    Subscription::from_arc(slot)
  }

  // ---------- transform ----------

  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    F: Fn(Self::Item) -> B + Send + Sync + 'static,
    B: Send + 'static,
  {
    MapOp::new(self, f)
  }

  /// `map` with a fallible selector. An `Err` terminates the stream with
  /// that error and disposes the source.
  fn try_map<B, F>(self, f: F) -> TryMapOp<Self, F>
  where
    F: Fn(Self::Item) -> Result<B, Self::Err> + Send + Sync + 'static,
    B: Send + 'static,
  {
    TryMapOp::new(self, f)
  }

  fn map_err<E, F>(self, f: F) -> MapErrOp<Self, F>
  where
    F: Fn(Self::Err) -> E + Send + Sync + 'static,
    E: Send + 'static,
  {
    MapErrOp::new(self, f)
  }

  fn filter<F>(self, f: F) -> FilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    FilterOp::new(self, f)
  }

  fn try_filter<F>(self, f: F) -> TryFilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> Result<bool, Self::Err> + Send + Sync + 'static,
  {
    TryFilterOp::new(self, f)
  }

  /// Emits every intermediate accumulation.
  fn scan<Acc, F>(self, seed: Acc, f: F) -> ScanOp<Self, Acc, F>
  where
    Acc: Clone + Send + Sync + 'static,
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
  {
    ScanOp::new(self, seed, f)
  }

  fn try_scan<Acc, F>(self, seed: Acc, f: F) -> TryScanOp<Self, Acc, F>
  where
    Acc: Clone + Send + Sync + 'static,
    F: Fn(Acc, Self::Item) -> Result<Acc, Self::Err> + Send + Sync + 'static,
  {
    TryScanOp::new(self, seed, f)
  }

  /// Emits only the final accumulation, on completion.
  fn reduce<Acc, F>(self, seed: Acc, f: F) -> ReduceOp<Self, Acc, F>
  where
    Acc: Clone + Send + Sync + 'static,
    F: Fn(Acc, Self::Item) -> Acc + Send + Sync + 'static,
  {
    ReduceOp::new(self, seed, f)
  }

  fn distinct_until_changed(self) -> DistinctUntilChangedOp<Self, fn(&Self::Item, &Self::Item) -> bool>
  where
    Self::Item: PartialEq + Clone,
  {
    DistinctUntilChangedOp::new(self, <Self::Item as PartialEq>::eq as fn(&Self::Item, &Self::Item) -> bool)
  }

  /// `eq` decides whether two consecutive values count as the same.
  fn distinct_until_changed_by<F>(self, eq: F) -> DistinctUntilChangedOp<Self, F>
  where
    Self::Item: Clone,
    F: Fn(&Self::Item, &Self::Item) -> bool + Send + Sync + 'static,
  {
    DistinctUntilChangedOp::new(self, eq)
  }

  fn take(self, count: usize) -> TakeOp<Self> { TakeOp::new(self, count) }

  fn take_while<F>(self, f: F) -> TakeWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    TakeWhileOp::new(self, f)
  }

  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp::new(self, count) }

  fn skip_while<F>(self, f: F) -> SkipWhileOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    SkipWhileOp::new(self, f)
  }

  fn start_with(self, values: Vec<Self::Item>) -> StartWithOp<Self>
  where
    Self::Item: Clone + Sync,
  {
    StartWithOp::new(self, values)
  }

  fn default_if_empty(self, value: Self::Item) -> DefaultIfEmptyOp<Self>
  where
    Self::Item: Clone + Sync,
  {
    DefaultIfEmptyOp::new(self, value)
  }

  fn ignore_elements(self) -> IgnoreElementsOp<Self> { IgnoreElementsOp::new(self) }

  // ---------- side effects ----------

  fn tap<F>(self, f: F) -> TapOp<Self, F, fn(&Self::Err), fn()>
  where
    F: Fn(&Self::Item) + Send + Sync + 'static,
  {
    TapOp::new(self, f, noop_err::<Self::Err> as fn(&Self::Err), noop as fn())
  }

  fn on_error<F>(self, f: F) -> TapOp<Self, fn(&Self::Item), F, fn()>
  where
    F: Fn(&Self::Err) + Send + Sync + 'static,
  {
    TapOp::new(self, noop_next::<Self::Item> as fn(&Self::Item), f, noop as fn())
  }

  fn on_complete<F>(self, f: F) -> TapOp<Self, fn(&Self::Item), fn(&Self::Err), F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    TapOp::new(self, noop_next::<Self::Item> as fn(&Self::Item), noop_err::<Self::Err> as fn(&Self::Err), f)
  }

  /// Runs `f` once per subscription, after a terminal event or on dispose,
  /// whichever comes first.
  fn finalize<F>(self, f: F) -> FinalizeOp<Self, F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    FinalizeOp::new(self, f)
  }

  // ---------- combine ----------

  fn merge<P>(self, other: P) -> MergeSourcesOp<BoxedObservable<Self::Item, Self::Err>>
  where
    P: Producer<Item = Self::Item, Err = Self::Err>,
  {
    MergeSourcesOp::new(vec![self.box_it(), other.box_it()])
  }

  /// Flattens a stream of observables, subscribing to at most
  /// `max_concurrent` inner observables at a time (unbounded for `None`) and
  /// queueing the rest in arrival order.
  fn merge_all(self, max_concurrent: Option<usize>) -> MergeAllOp<Self>
  where
    Self::Item: Producer<Err = Self::Err>,
  {
    MergeAllOp::new(self, max_concurrent)
  }

  fn flat_map<P, F>(self, f: F) -> MergeAllOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> P + Send + Sync + 'static,
    P: Producer<Err = Self::Err>,
  {
    self.map(f).merge_all(None)
  }

  fn flat_map_with_concurrency<P, F>(self, f: F, max_concurrent: usize) -> MergeAllOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> P + Send + Sync + 'static,
    P: Producer<Err = Self::Err>,
  {
    self.map(f).merge_all(Some(max_concurrent))
  }

  /// Mirrors the most recent inner observable, dropping the previous one.
  fn switch_latest(self) -> SwitchLatestOp<Self>
  where
    Self::Item: Producer<Err = Self::Err>,
  {
    SwitchLatestOp::new(self)
  }

  fn switch_map<P, F>(self, f: F) -> SwitchLatestOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> P + Send + Sync + 'static,
    P: Producer<Err = Self::Err>,
  {
    self.map(f).switch_latest()
  }

  fn concat<P>(self, other: P) -> ConcatOp<BoxedObservable<Self::Item, Self::Err>>
  where
    P: Producer<Item = Self::Item, Err = Self::Err>,
  {
    ConcatOp::new(vec![self.box_it(), other.box_it()], ConcatConfig::default())
  }

  /// Flattens a stream of observables one at a time, in order.
  fn concat_all(self) -> MergeAllOp<Self>
  where
    Self::Item: Producer<Err = Self::Err>,
  {
    MergeAllOp::new(self, Some(1))
  }

  fn concat_map<P, F>(self, f: F) -> MergeAllOp<MapOp<Self, F>>
  where
    F: Fn(Self::Item) -> P + Send + Sync + 'static,
    P: Producer<Err = Self::Err>,
  {
    self.map(f).concat_all()
  }

  fn combine_latest<B, R, F>(self, other: B, f: F) -> CombineLatestOp<Self, B, F>
  where
    B: Producer<Err = Self::Err>,
    Self::Item: Clone,
    B::Item: Clone,
    F: Fn(Self::Item, B::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
  {
    CombineLatestOp::new(self, other, f)
  }

  #[allow(clippy::type_complexity)]
  fn zip<B>(self, other: B) -> ZipOp<Self, B, fn(Self::Item, B::Item) -> (Self::Item, B::Item)>
  where
    B: Producer<Err = Self::Err>,
  {
    ZipOp::new(self, other, pair::<Self::Item, B::Item> as fn(Self::Item, B::Item) -> (Self::Item, B::Item))
  }

  fn zip_with<B, R, F>(self, other: B, f: F) -> ZipOp<Self, B, F>
  where
    B: Producer<Err = Self::Err>,
    F: Fn(Self::Item, B::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
  {
    ZipOp::new(self, other, f)
  }

  fn take_until<N>(self, notifier: N) -> TakeUntilOp<Self, N>
  where
    N: Producer<Err = Self::Err>,
  {
    TakeUntilOp::new(self, notifier)
  }

  /// Emits the latest source value whenever `sampler` ticks, if there is one
  /// the output has not seen yet.
  fn sample<T>(self, sampler: T) -> SampleOp<Self, T>
  where
    T: Producer<Err = Self::Err>,
  {
    SampleOp::new(self, sampler)
  }

  // ---------- error handling ----------

  /// On error, continues with the observable returned by `handler`.
  fn catch_error<P, F>(self, handler: F) -> CatchOp<Self, F>
  where
    F: Fn(Self::Err) -> P + Send + Sync + 'static,
    P: Producer<Item = Self::Item>,
  {
    CatchOp::new(self, handler)
  }

  /// On error, emits `value` and completes.
  fn catch_error_just_return<E>(self, value: Self::Item) -> CatchJustReturnOp<Self, E>
  where
    Self::Item: Clone + Sync,
    E: Send + 'static,
  {
    CatchJustReturnOp::new(self, value)
  }

  /// Resubscribes on error, at most `count` times.
  fn retry(self, count: usize) -> RetryOp<Self> { RetryOp::new(self, RetryConfig::new().count(count)) }

  fn retry_with(self, config: RetryConfig) -> RetryOp<Self> { RetryOp::new(self, config) }

  // ---------- time and scheduling ----------

  /// Emits a value only after `due` has passed without another value
  /// arriving; a pending value is flushed on completion.
  fn throttle<S>(self, due: Duration, scheduler: S) -> ThrottleOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    ThrottleOp::new(self, due, scheduler)
  }

  /// Same operator as [`throttle`](Observable::throttle).
  fn debounce<S>(self, due: Duration, scheduler: S) -> ThrottleOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    ThrottleOp::new(self, due, scheduler)
  }

  /// Emits the first value immediately, then at most one value per
  /// `window`; with `latest`, the last value seen during a window is emitted
  /// when it closes.
  fn throttle_latest<S>(self, window: Duration, latest: bool, scheduler: S) -> ThrottleLatestOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    ThrottleLatestOp::new(self, window, latest, scheduler)
  }

  fn delay<S>(self, due: Duration, scheduler: S) -> DelayOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    DelayOp::new(self, due, scheduler)
  }

  /// Delivers every notification on `scheduler`, in order.
  fn observe_on<S>(self, scheduler: S) -> ObserveOnOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    ObserveOnOp::new(self, scheduler)
  }

  /// Subscribes to, and disposes, the source on `scheduler`.
  fn subscribe_on<S>(self, scheduler: S) -> SubscribeOnOp<Self, S>
  where
    S: Scheduler + Clone,
  {
    SubscribeOnOp::new(self, scheduler)
  }

  // ---------- multicast ----------

  fn multicast<Sub, F>(self, factory: F) -> ConnectableObservable<Self, Sub>
  where
    Sub: Subject<Self::Item, Self::Err>,
    F: Fn() -> Sub + Send + Sync + 'static,
  {
    ConnectableObservable::new(self, factory)
  }

  fn publish(self) -> ConnectableObservable<Self, PublishSubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(PublishSubject::new)
  }

  fn replay(self, policy: ReplayPolicy) -> ConnectableObservable<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(move || ReplaySubject::with_policy(policy))
  }

  /// One upstream subscription shared by every subscriber while at least
  /// one is subscribed.
  fn share(self) -> RefCountOp<Self, PublishSubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.publish().ref_count()
  }

  /// [`share`](Observable::share) that also replays the last `count`
  /// values to late subscribers of the same connection.
  fn share_replay(self, count: usize) -> RefCountOp<Self, ReplaySubject<Self::Item, Self::Err>>
  where
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.replay(ReplayPolicy::Last(count)).ref_count()
  }

  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err> { BoxedObservable::new(self) }
}

impl<P: Producer> Observable for P {}
