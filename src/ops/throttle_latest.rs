use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{SerialDisposable, Subscription},
};

/// Rate limiting that lets the first value through at once, then at most one
/// value per `window`.
///
/// With `latest`, the newest value that arrived too early is kept and
/// emitted when its window closes, and a completion waits for it. Without,
/// early values are dropped.
#[derive(Clone)]
pub struct ThrottleLatestOp<S, SD> {
  source: S,
  window: Duration,
  latest: bool,
  scheduler: SD,
}

impl<S, SD> ThrottleLatestOp<S, SD> {
  pub(crate) fn new(source: S, window: Duration, latest: bool, scheduler: SD) -> Self {
    ThrottleLatestOp { source, window, latest, scheduler }
  }
}

struct Window<Item> {
  last_sent: Option<Duration>,
  stash: Option<Item>,
  timer_armed: bool,
  completed: bool,
}

struct ThrottleLatest<O, S: Producer, SD> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  window: Mutex<Window<S::Item>>,
  timer: Arc<SerialDisposable>,
  period: Duration,
  latest: bool,
  scheduler: SD,
}

impl<O, S, SD> ThrottleLatest<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn close_window(&self) {
    {
      let mut window = self.window.lock();
      window.timer_armed = false;
      if let Some(value) = window.stash.take() {
        window.last_sent = Some(self.scheduler.now());
        self.sink.push(Event::Next(value));
      }
      if window.completed {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<S, SD> Producer for ThrottleLatestOp<S, SD>
where
  S: Producer,
  SD: Scheduler + Clone,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let throttle = Arc::new(ThrottleLatest::<O, S, SD> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      window: Mutex::new(Window { last_sent: None, stash: None, timer_armed: false, completed: false }),
      timer: Arc::new(SerialDisposable::new()),
      period: self.window,
      latest: self.latest,
      scheduler: self.scheduler.clone(),
    });
    let source = self.source.subscribe_sink(ThrottleLatestSink { throttle: throttle.clone() });
    let upstream = Subscription::from_pair(source, Subscription::from_arc(throttle.timer.clone()));
    SinkAndSubscription::new(Subscription::from_arc(throttle.sink.clone()), upstream)
  }
}

pub struct ThrottleLatestSink<O, S: Producer, SD> {
  throttle: Arc<ThrottleLatest<O, S, SD>>,
}

impl<O, S, SD> Observer<S::Item, S::Err> for ThrottleLatestSink<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn next(&mut self, value: S::Item) {
    let throttle = &self.throttle;
    let now = throttle.scheduler.now();
    let arm_after = {
      let mut window = throttle.window.lock();
      let elapsed = window.last_sent.map(|sent| now.saturating_sub(sent));
      match elapsed {
        Some(elapsed) if elapsed < throttle.period => {
          if !throttle.latest {
            return;
          }
          window.stash = Some(value);
          if window.timer_armed {
            None
          } else {
            window.timer_armed = true;
            Some(throttle.period - elapsed)
          }
        }
        _ => {
          window.last_sent = Some(now);
          throttle.sink.push(Event::Next(value));
          None
        }
      }
    };
    throttle.sink.drain();
    if let Some(due) = arm_after {
      let this = throttle.clone();
      let handle = throttle.scheduler.schedule_relative(due, move || this.close_window());
      throttle.timer.set(handle.into());
    }
  }

  fn error(self, err: S::Err) { self.throttle.sink.forward(Event::Error(err)) }

  fn complete(self) {
    {
      let mut window = self.throttle.window.lock();
      if window.stash.is_some() {
        window.completed = true;
        return;
      }
      self.throttle.sink.push(Event::Completed);
    }
    self.throttle.sink.drain();
  }

  fn is_closed(&self) -> bool { self.throttle.sink.is_stopped() }
}
