//! Virtual-time test harness for observable pipelines.
//!
//! Time is counted in ticks of one millisecond. A [`TestScheduler`] owns the
//! clock; sources built from it replay recorded events at fixed ticks and log
//! every subscription window, and a [`TestableObserver`] records what it
//! receives together with the tick it arrived at.
//!
//! ```rust
//! use rxcore::{prelude::*, testing::*};
//!
//! let scheduler = TestScheduler::new();
//! let source = scheduler.create_hot_observable(vec![
//!   next(150, 1),
//!   next(210, 2),
//!   next(220, 3),
//!   completed::<i32, ()>(230),
//! ]);
//! let c_source = source.clone();
//! let observer = scheduler.start(move || c_source.map(|v| v * 10));
//! assert_eq!(observer.events(), vec![next(210, 20), next(220, 30), completed(230)]);
//! assert_eq!(source.subscriptions(), vec![SubscriptionLog::new(200, 230)]);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  bag::Bag,
  event::Event,
  observable::Producer,
  observer::{BoxedObserver, Observer},
  scheduler::{Duration, Scheduler, SchedulerExt, Task, TaskHandle, VirtualTimeScheduler},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, Subscription},
};

/// Virtual time in ticks of one millisecond.
pub type Tick = u64;

/// Tick at which [`TestScheduler::start`] creates the observable.
pub const CREATED: Tick = 100;
/// Tick at which [`TestScheduler::start`] subscribes.
pub const SUBSCRIBED: Tick = 200;
/// Tick at which [`TestScheduler::start`] disposes the subscription.
pub const DISPOSED: Tick = 1000;

/// A value stamped with the tick it happened at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
  pub time: Tick,
  pub value: T,
}

pub fn next<Item, Err>(time: Tick, value: Item) -> Recorded<Event<Item, Err>> {
  Recorded { time, value: Event::Next(value) }
}

pub fn error<Item, Err>(time: Tick, err: Err) -> Recorded<Event<Item, Err>> {
  Recorded { time, value: Event::Error(err) }
}

pub fn completed<Item, Err>(time: Tick) -> Recorded<Event<Item, Err>> { Recorded { time, value: Event::Completed } }

/// When a test source was subscribed and, if it was, unsubscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribe: Tick,
  pub unsubscribe: Option<Tick>,
}

impl SubscriptionLog {
  pub fn new(subscribe: Tick, unsubscribe: Tick) -> Self {
    SubscriptionLog { subscribe, unsubscribe: Some(unsubscribe) }
  }

  /// A window that was still open when the test ended.
  pub fn open(subscribe: Tick) -> Self { SubscriptionLog { subscribe, unsubscribe: None } }
}

fn ticks(duration: Duration) -> Tick { duration.as_millis() as Tick }

// ==================== TestScheduler ====================

/// Virtual-time scheduler with tick helpers. Clones share the clock.
#[derive(Clone, Default)]
pub struct TestScheduler(VirtualTimeScheduler);

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// The current tick.
  pub fn clock(&self) -> Tick { ticks(self.0.now()) }

  /// Runs `action` at the absolute tick `time`, or on the next step if that
  /// tick has passed.
  pub fn schedule_at<F>(&self, time: Tick, action: F) -> TaskHandle
  where
    F: FnOnce() + Send + 'static,
  {
    let delay = time.saturating_sub(self.clock());
    self.0.schedule_relative(Duration::from_millis(delay), action)
  }

  /// Runs every task due up to and including `time`.
  pub fn advance_to(&self, time: Tick) {
    if let Err(err) = self.0.advance_to(Duration::from_millis(time)) {
      tracing::error!(%err, "test scheduler advanced re-entrantly");
    }
  }

  /// Runs every queued task.
  pub fn run(&self) {
    if let Err(err) = self.0.start() {
      tracing::error!(%err, "test scheduler started re-entrantly");
    }
  }

  pub fn create_hot_observable<Item, Err>(&self, events: Vec<Recorded<Event<Item, Err>>>) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    HotObservable::new(self.clone(), events)
  }

  pub fn create_cold_observable<Item, Err>(
    &self, events: Vec<Recorded<Event<Item, Err>>>,
  ) -> ColdObservable<Item, Err> {
    ColdObservable {
      scheduler: self.clone(),
      events: Arc::new(events),
      subscriptions: Arc::new(Mutex::new(vec![])),
    }
  }

  pub fn create_observer<Item, Err>(&self) -> TestableObserver<Item, Err> {
    TestableObserver { scheduler: self.clone(), events: Arc::new(Mutex::new(vec![])) }
  }

  /// Creates the observable at `created`, subscribes a fresh observer at
  /// `subscribed`, disposes at `disposed`, and runs the clock until nothing
  /// is left to do.
  pub fn start_with_timing<P, F>(
    &self, created: Tick, subscribed: Tick, disposed: Tick, create: F,
  ) -> TestableObserver<P::Item, P::Err>
  where
    P: Producer,
    F: FnOnce() -> P + Send + 'static,
  {
    let source: Arc<Mutex<Option<P>>> = Arc::new(Mutex::new(None));
    let subscription = Arc::new(Mutex::new(Subscription::empty()));
    let observer = self.create_observer();

    let c_source = source.clone();
    self.schedule_at(created, move || *c_source.lock() = Some(create()));

    let (c_source, c_subscription, c_observer) = (source.clone(), subscription.clone(), observer.clone());
    self.schedule_at(subscribed, move || {
      let source = c_source.lock().take();
      if let Some(source) = source {
        *c_subscription.lock() = source.subscribe_sink(c_observer);
      }
    });

    self.schedule_at(disposed, move || {
      let subscription = subscription.lock().clone();
      subscription.dispose();
    });

    self.run();
    observer
  }

  /// [`start_with_timing`](Self::start_with_timing) with the default
  /// creation and subscription ticks.
  pub fn start_disposed_at<P, F>(&self, disposed: Tick, create: F) -> TestableObserver<P::Item, P::Err>
  where
    P: Producer,
    F: FnOnce() -> P + Send + 'static,
  {
    self.start_with_timing(CREATED, SUBSCRIBED, disposed, create)
  }

  /// [`start_with_timing`](Self::start_with_timing) with every default tick.
  pub fn start<P, F>(&self, create: F) -> TestableObserver<P::Item, P::Err>
  where
    P: Producer,
    F: FnOnce() -> P + Send + 'static,
  {
    self.start_with_timing(CREATED, SUBSCRIBED, DISPOSED, create)
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Duration { self.0.now() }

  fn schedule_task(&self, task: Task, delay: Option<Duration>) -> TaskHandle { self.0.schedule_task(task, delay) }
}

// ==================== TestableObserver ====================

/// Records every event with the tick it arrived at. Clones share the record.
pub struct TestableObserver<Item, Err> {
  scheduler: TestScheduler,
  events: Arc<Mutex<Vec<Recorded<Event<Item, Err>>>>>,
}

impl<Item, Err> Clone for TestableObserver<Item, Err> {
  fn clone(&self) -> Self { TestableObserver { scheduler: self.scheduler.clone(), events: self.events.clone() } }
}

impl<Item: Clone, Err: Clone> TestableObserver<Item, Err> {
  pub fn events(&self) -> Vec<Recorded<Event<Item, Err>>> { self.events.lock().clone() }
}

impl<Item, Err> TestableObserver<Item, Err> {
  fn record(&self, value: Event<Item, Err>) {
    let time = self.scheduler.clock();
    self.events.lock().push(Recorded { time, value });
  }
}

impl<Item, Err> Observer<Item, Err> for TestableObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Event::Next(value)) }

  fn error(self, err: Err) { self.record(Event::Error(err)) }

  fn complete(self) { self.record(Event::Completed) }

  fn is_closed(&self) -> bool { false }
}

// ==================== HotObservable ====================

type Target<Item, Err> = Arc<SerialSink<BoxedObserver<Item, Err>, Item, Err>>;

struct HotState<Item, Err> {
  observers: Bag<Target<Item, Err>>,
  subscriptions: Vec<SubscriptionLog>,
}

/// Emits its recorded events at their absolute ticks, whether or not anyone
/// is subscribed.
pub struct HotObservable<Item, Err> {
  scheduler: TestScheduler,
  state: Arc<Mutex<HotState<Item, Err>>>,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self { HotObservable { scheduler: self.scheduler.clone(), state: self.state.clone() } }
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn new(scheduler: TestScheduler, events: Vec<Recorded<Event<Item, Err>>>) -> Self {
    let state = Arc::new(Mutex::new(HotState { observers: Bag::new(), subscriptions: vec![] }));
    for Recorded { time, value } in events {
      let state = state.clone();
      scheduler.schedule_at(time, move || {
        let targets = state.lock().observers.snapshot();
        for target in targets {
          target.forward(value.clone());
        }
      });
    }
    HotObservable { scheduler, state }
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.state.lock().subscriptions.clone() }
}

impl<Item, Err> Producer for HotObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let observer: BoxedObserver<Item, Err> = Box::new(observer);
    let sink = Arc::new(SerialSink::new(observer, cancel));
    let (key, index) = {
      let mut state = self.state.lock();
      let index = state.subscriptions.len();
      state.subscriptions.push(SubscriptionLog::open(self.scheduler.clock()));
      (state.observers.insert(sink.clone()), index)
    };
    let (state, scheduler) = (self.state.clone(), self.scheduler.clone());
    let removal = Subscription::from_fn(move || {
      let mut state = state.lock();
      let removed = state.observers.remove(key);
      state.subscriptions[index].unsubscribe = Some(scheduler.clock());
      drop(state);
      drop(removed);
    });
    SinkAndSubscription::new(Subscription::from_arc(sink), removal)
  }
}

// ==================== ColdObservable ====================

/// Replays its recorded events to every subscriber, each at its tick offset
/// from the moment of subscription.
pub struct ColdObservable<Item, Err> {
  scheduler: TestScheduler,
  events: Arc<Vec<Recorded<Event<Item, Err>>>>,
  subscriptions: Arc<Mutex<Vec<SubscriptionLog>>>,
}

impl<Item, Err> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    ColdObservable {
      scheduler: self.scheduler.clone(),
      events: self.events.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.subscriptions.lock().clone() }
}

impl<Item, Err> Producer for ColdObservable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let sink = Arc::new(SerialSink::new(observer, cancel));
    let index = {
      let mut subscriptions = self.subscriptions.lock();
      subscriptions.push(SubscriptionLog::open(self.scheduler.clock()));
      subscriptions.len() - 1
    };
    let handles: Vec<TaskHandle> = self
      .events
      .iter()
      .map(|Recorded { time, value }| {
        let (sink, value) = (sink.clone(), value.clone());
        self.scheduler.schedule_relative(Duration::from_millis(*time), move || sink.forward(value))
      })
      .collect();

    let (subscriptions, scheduler) = (self.subscriptions.clone(), self.scheduler.clone());
    let teardown = Subscription::from_fn(move || {
      for handle in handles {
        handle.dispose();
      }
      subscriptions.lock()[index].unsubscribe = Some(scheduler.clock());
    });
    SinkAndSubscription::new(Subscription::from_arc(sink), teardown)
  }
}

/// Runs `f` with a thread-local `tracing` subscriber and returns the
/// messages of every event at `level` it logged.
#[cfg(test)]
pub(crate) fn capture_logs(level: tracing::Level, f: impl FnOnce()) -> Vec<String> {
  use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
  };

  struct Message(String);

  impl tracing::field::Visit for Message {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
      if field.name() == "message" {
        self.0 = format!("{value:?}");
      }
    }
  }

  struct Capture(tracing::Level, Arc<Mutex<Vec<String>>>);

  impl<S: tracing::Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &tracing::Event<'_>, _: Context<'_, S>) {
      if *event.metadata().level() == self.0 {
        let mut message = Message(String::new());
        event.record(&mut message);
        self.1.lock().push(message.0);
      }
    }
  }

  let logs = Arc::new(Mutex::new(vec![]));
  let subscriber = tracing_subscriber::registry().with(Capture(level, logs.clone()));
  tracing::subscriber::with_default(subscriber, f);
  let captured = logs.lock().clone();
  captured
}
