//! Resubscription on error.
//!
//! ```rust
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxcore::prelude::*;
//!
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let c_attempts = attempts.clone();
//! let source = observable::create(move |emitter: Emitter<i32, &'static str>| {
//!   if c_attempts.fetch_add(1, Ordering::SeqCst) < 2 {
//!     emitter.error("flaky");
//!   } else {
//!     emitter.next(1);
//!     emitter.complete();
//!   }
//!   Subscription::empty()
//! });
//!
//! source.retry(3).subscribe_all(|v| assert_eq!(v, 1), |_| unreachable!(), || {});
//! assert_eq!(attempts.load(Ordering::SeqCst), 3);
//! ```
//!
//! Resubscription is a task on the [`CurrentThreadScheduler`] trampoline, or
//! on the configured scheduler when a delay is set, so a source that fails
//! synchronously over and over never grows the stack.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{CurrentThreadScheduler, Duration, Scheduler, SchedulerExt, TaskHandle},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{Disposable, SerialDisposable, SingleAssignmentDisposable, Subscription},
};

/// Builder for the retry policy.
///
/// ```rust
/// use rxcore::{ops::retry::RetryConfig, prelude::*};
///
/// let config = RetryConfig::new()
///   .count(5)
///   .delay(Duration::from_millis(100), VirtualTimeScheduler::new())
///   .reset_on_success();
/// ```
#[derive(Clone, Default)]
pub struct RetryConfig {
  count: Option<usize>,
  delay: Option<(Duration, Arc<dyn Scheduler>)>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retries forever, immediately.
  pub fn new() -> Self { Self::default() }

  /// Maximum number of retries: `count(3)` subscribes at most four times.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Waits `delay` on `scheduler` before each resubscription.
  pub fn delay<S: Scheduler>(mut self, delay: Duration, scheduler: S) -> Self {
    self.delay = Some((delay, Arc::new(scheduler)));
    self
  }

  /// Resets the retry counter whenever the source emits a value.
  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }

  fn allows(&self, retries: usize) -> bool { self.count.map_or(true, |count| retries < count) }
}

impl fmt::Debug for RetryConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RetryConfig")
      .field("count", &self.count)
      .field("delay", &self.delay.as_ref().map(|(d, _)| *d))
      .field("reset_on_success", &self.reset_on_success)
      .finish()
  }
}

pub struct RetryOp<S> {
  source: Arc<S>,
  config: RetryConfig,
}

impl<S> RetryOp<S> {
  pub(crate) fn new(source: S, config: RetryConfig) -> Self { RetryOp { source: Arc::new(source), config } }
}

impl<S> Clone for RetryOp<S> {
  fn clone(&self) -> Self { RetryOp { source: self.source.clone(), config: self.config.clone() } }
}

struct Retry<O, S: Producer> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  source: Arc<S>,
  config: RetryConfig,
  retries: Mutex<usize>,
  current: Arc<SerialDisposable>,
  hop: Arc<SerialDisposable>,
}

impl<O, S> Retry<O, S>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
{
  fn subscribe(self: &Arc<Self>) {
    if self.current.is_disposed() {
      return;
    }
    let slot = Arc::new(SingleAssignmentDisposable::new());
    self.current.set(Subscription::from_arc(slot.clone()));
    let subscription = self.source.subscribe_sink(RetrySink { retry: self.clone() });
    let _ = slot.set(subscription);
  }

  fn schedule_subscribe(self: &Arc<Self>) -> TaskHandle {
    let this = self.clone();
    let task = move || this.subscribe();
    match &self.config.delay {
      Some((delay, scheduler)) => scheduler.schedule_relative(*delay, task),
      None => CurrentThreadScheduler.schedule(task),
    }
  }
}

impl<S: Producer> Producer for RetryOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let retry = Arc::new(Retry {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      source: self.source.clone(),
      config: self.config.clone(),
      retries: Mutex::new(0),
      current: Arc::new(SerialDisposable::new()),
      hop: Arc::new(SerialDisposable::new()),
    });
    let this = retry.clone();
    let start = CurrentThreadScheduler.schedule(move || this.subscribe());
    let upstream = Subscription::from_pair(
      Subscription::from_pair(start.into(), Subscription::from_arc(retry.hop.clone())),
      Subscription::from_arc(retry.current.clone()),
    );
    SinkAndSubscription::new(Subscription::from_arc(retry.sink.clone()), upstream)
  }
}

pub struct RetrySink<O, S: Producer> {
  retry: Arc<Retry<O, S>>,
}

impl<O, S> Observer<S::Item, S::Err> for RetrySink<O, S>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
{
  fn next(&mut self, value: S::Item) {
    if self.retry.config.reset_on_success {
      *self.retry.retries.lock() = 0;
    }
    self.retry.sink.forward(Event::Next(value))
  }

  fn error(self, err: S::Err) {
    let retry_now = {
      let mut retries = self.retry.retries.lock();
      let allowed = self.retry.config.allows(*retries);
      if allowed {
        *retries += 1;
        tracing::trace!(retries = *retries, "retry resubscribing");
      }
      allowed
    };
    if retry_now && !self.retry.sink.is_stopped() {
      let handle = self.retry.schedule_subscribe();
      if !handle.is_disposed() {
        self.retry.hop.set(handle.into());
      }
    } else {
      self.retry.sink.forward(Event::Error(err))
    }
  }

  fn complete(self) { self.retry.sink.forward(Event::Completed) }

  fn is_closed(&self) -> bool { self.retry.sink.is_stopped() }
}
