//! Debounce: a value is emitted only once `due` has passed on the scheduler
//! without a newer value replacing it.
//!
//! Every value restarts the timer. A value still waiting when the source
//! completes is emitted before the completion; an error drops it.

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

#[derive(Clone)]
pub struct ThrottleOp<S, SD> {
  source: S,
  due: Duration,
  scheduler: SD,
}

impl<S, SD> ThrottleOp<S, SD> {
  pub(crate) fn new(source: S, due: Duration, scheduler: SD) -> Self { ThrottleOp { source, due, scheduler } }
}

struct Pending<Item> {
  id: u64,
  value: Option<Item>,
}

struct Throttle<O, S: Producer, SD> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  pending: Mutex<Pending<S::Item>>,
  timer: Arc<SerialDisposable>,
  due: Duration,
  scheduler: SD,
}

impl<O, S, SD> Throttle<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn fire(&self, id: u64) {
    {
      let mut pending = self.pending.lock();
      if pending.id != id {
        return;
      }
      if let Some(value) = pending.value.take() {
        self.sink.push(Event::Next(value));
      }
    }
    self.sink.drain();
  }
}

impl<S, SD> Producer for ThrottleOp<S, SD>
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
    let throttle = Arc::new(Throttle::<O, S, SD> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      pending: Mutex::new(Pending { id: 0, value: None }),
      timer: Arc::new(SerialDisposable::new()),
      due: self.due,
      scheduler: self.scheduler.clone(),
    });
    let source = self.source.subscribe_sink(ThrottleSink { throttle: throttle.clone() });
    let upstream = Subscription::from_pair(source, Subscription::from_arc(throttle.timer.clone()));
    SinkAndSubscription::new(Subscription::from_arc(throttle.sink.clone()), upstream)
  }
}

pub struct ThrottleSink<O, S: Producer, SD> {
  throttle: Arc<Throttle<O, S, SD>>,
}

impl<O, S, SD> Observer<S::Item, S::Err> for ThrottleSink<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn next(&mut self, value: S::Item) {
    let id = {
      let mut pending = self.throttle.pending.lock();
      pending.id += 1;
      pending.value = Some(value);
      pending.id
    };
    let throttle = self.throttle.clone();
    let handle = self.throttle.scheduler.schedule_relative(self.throttle.due, move || throttle.fire(id));
    self.throttle.timer.set(handle.into());
  }

  fn error(self, err: S::Err) {
    {
      let mut pending = self.throttle.pending.lock();
      pending.id += 1;
      pending.value = None;
      self.throttle.sink.push(Event::Error(err));
    }
    self.throttle.sink.drain();
  }

  fn complete(self) {
    {
      let mut pending = self.throttle.pending.lock();
      pending.id += 1;
      if let Some(value) = pending.value.take() {
        self.throttle.sink.push(Event::Next(value));
      }
      self.throttle.sink.push(Event::Completed);
    }
    self.throttle.sink.drain();
  }

  fn is_closed(&self) -> bool { self.throttle.sink.is_stopped() }
}
