use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
  sink::{SerialSink, SinkAndSubscription},
  subscription::{SerialDisposable, Subscription},
};

/// Re-delivers every notification on `scheduler`, in arrival order.
///
/// Events are queued as they arrive; at most one delivery task is pending
/// at a time and it drains everything queued when it runs. Disposing drops
/// whatever is still queued.
///
/// ```
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// observable::from_iter::<_, std::convert::Infallible>(0..3)
///   .observe_on(scheduler.clone())
///   .subscribe(|v| println!("{v}"));
/// // prints only once the scheduler runs
/// scheduler.start().unwrap();
/// ```
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  source: S,
  scheduler: SD,
}

impl<S, SD> ObserveOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { ObserveOnOp { source, scheduler } }
}

struct ObserveOn<O, S: Producer, SD> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  scheduled: AtomicBool,
  task: Arc<SerialDisposable>,
  scheduler: SD,
}

impl<O, S, SD> ObserveOn<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn enqueue(self: &Arc<Self>, event: Event<S::Item, S::Err>) {
    self.sink.push(event);
    if self.scheduled.swap(true, Ordering::AcqRel) {
      return;
    }
    let this = self.clone();
    let handle = self.scheduler.schedule(move || {
      this.scheduled.store(false, Ordering::Release);
      this.sink.drain();
    });
    self.task.set(handle.into());
  }
}

impl<S, SD> Producer for ObserveOnOp<S, SD>
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
    let observe_on = Arc::new(ObserveOn::<O, S, SD> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      scheduled: AtomicBool::new(false),
      task: Arc::new(SerialDisposable::new()),
      scheduler: self.scheduler.clone(),
    });
    let source = self.source.subscribe_sink(ObserveOnSink { observe_on: observe_on.clone() });
    let upstream = Subscription::from_pair(source, Subscription::from_arc(observe_on.task.clone()));
    SinkAndSubscription::new(Subscription::from_arc(observe_on.sink.clone()), upstream)
  }
}

pub struct ObserveOnSink<O, S: Producer, SD> {
  observe_on: Arc<ObserveOn<O, S, SD>>,
}

impl<O, S, SD> Observer<S::Item, S::Err> for ObserveOnSink<O, S, SD>
where
  O: Observer<S::Item, S::Err> + Send + 'static,
  S: Producer,
  SD: Scheduler,
{
  fn next(&mut self, value: S::Item) { self.observe_on.enqueue(Event::Next(value)) }

  fn error(self, err: S::Err) { self.observe_on.enqueue(Event::Error(err)) }

  fn complete(self) { self.observe_on.enqueue(Event::Completed) }

  fn is_closed(&self) -> bool { self.observe_on.sink.is_stopped() }
}
