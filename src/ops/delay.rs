use std::{collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{SerialDisposable, Subscription},
};

/// Shifts values and completion forward in time by `due` on the scheduler.
///
/// Errors are not delayed: an error is delivered as soon as it arrives and
/// drops whatever is still waiting.
///
/// ```
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// observable::from_iter::<_, std::convert::Infallible>(1..=3)
///   .delay(Duration::from_millis(5), scheduler.clone())
///   .subscribe(|v| println!("{v}"));
/// // nothing printed yet
/// scheduler.advance_by(Duration::from_millis(5)).unwrap();
/// ```
#[derive(Clone)]
pub struct DelayOp<S, SD> {
  source: S,
  due: Duration,
  scheduler: SD,
}

impl<S, SD> DelayOp<S, SD> {
  pub(crate) fn new(source: S, due: Duration, scheduler: SD) -> Self { DelayOp { source, due, scheduler } }
}

struct Queue<Item, Err> {
  events: VecDeque<(Duration, Event<Item, Err>)>,
  running: bool,
}

struct Delay<O, S: Producer, SD> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  queue: Mutex<Queue<S::Item, S::Err>>,
  timer: Arc<SerialDisposable>,
  due: Duration,
  scheduler: SD,
}

impl<O, S, SD> Delay<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn enqueue(self: &Arc<Self>, event: Event<S::Item, S::Err>) {
    let due_at = self.scheduler.now() + self.due;
    let start = {
      let mut queue = self.queue.lock();
      queue.events.push_back((due_at, event));
      !std::mem::replace(&mut queue.running, true)
    };
    if start {
      self.arm(self.due);
    }
  }

  fn arm(self: &Arc<Self>, after: Duration) {
    let this = self.clone();
    let handle = self.scheduler.schedule_relative(after, move || this.release());
    self.timer.set(handle.into());
  }

  /// Delivers everything that is due and re-arms for the rest.
  fn release(self: &Arc<Self>) {
    let now = self.scheduler.now();
    let next = {
      let mut queue = self.queue.lock();
      while queue.events.front().map_or(false, |(due_at, _)| *due_at <= now) {
        if let Some((_, event)) = queue.events.pop_front() {
          self.sink.push(event);
        }
      }
      match queue.events.front() {
        Some((due_at, _)) => Some(due_at.saturating_sub(now)),
        None => {
          queue.running = false;
          None
        }
      }
    };
    self.sink.drain();
    if let Some(after) = next {
      self.arm(after);
    }
  }
}

impl<S, SD> Producer for DelayOp<S, SD>
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
    let delay = Arc::new(Delay::<O, S, SD> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      queue: Mutex::new(Queue { events: VecDeque::new(), running: false }),
      timer: Arc::new(SerialDisposable::new()),
      due: self.due,
      scheduler: self.scheduler.clone(),
    });
    let source = self.source.subscribe_sink(DelaySink { delay: delay.clone() });
    let upstream = Subscription::from_pair(source, Subscription::from_arc(delay.timer.clone()));
    SinkAndSubscription::new(Subscription::from_arc(delay.sink.clone()), upstream)
  }
}

pub struct DelaySink<O, S: Producer, SD> {
  delay: Arc<Delay<O, S, SD>>,
}

impl<O, S, SD> Observer<S::Item, S::Err> for DelaySink<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn next(&mut self, value: S::Item) { self.delay.enqueue(Event::Next(value)) }

  fn error(self, err: S::Err) {
    {
      let mut queue = self.delay.queue.lock();
      queue.events.clear();
      self.delay.sink.push(Event::Error(err));
    }
    self.delay.sink.drain();
  }

  fn complete(self) { self.delay.enqueue(Event::Completed) }

  fn is_closed(&self) -> bool { self.delay.sink.is_stopped() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  fn at(ms: u64) -> Duration { Duration::from_millis(ms) }

  #[rxcore_macro::test]
  fn shifts_every_value() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (c_log, clock) = (log.clone(), scheduler.clone());
    source
      .clone()
      .delay(at(10), scheduler.clone())
      .subscribe_event(move |e| c_log.lock().unwrap().push((e, clock.now())));
    source.next(1);
    scheduler.advance_to(at(4)).unwrap();
    source.next(2);
    source.complete();
    scheduler.start().unwrap();
    assert_eq!(
      *log.lock().unwrap(),
      vec![(Event::Next(1), at(10)), (Event::Next(2), at(14)), (Event::Completed, at(14))]
    );
  }

  #[rxcore_macro::test]
  fn errors_are_not_delayed() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    source
      .clone()
      .delay(at(10), scheduler.clone())
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    source.next(1);
    source.error("bad");
    assert_eq!(*log.lock().unwrap(), vec![Event::Error("bad")]);
    scheduler.start().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![Event::Error("bad")]);
  }

  #[rxcore_macro::test]
  fn dispose_cancels_pending_values() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let subscription = observable::from_iter::<_, std::convert::Infallible>(1..=3)
      .delay(at(10), scheduler.clone())
      .subscribe(move |v| c_log.lock().unwrap().push(v));
    subscription.dispose();
    scheduler.start().unwrap();
    assert!(log.lock().unwrap().is_empty());
  }
}
