use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
  sink::{ForwardSink, Sink, SinkAndSubscription},
  subscription::{ScheduledDisposable, SingleAssignmentDisposable, Subscription},
};

/// Subscribes to the source as a task on `scheduler`, and disposes the
/// source subscription there as well. Notifications are not moved: they
/// arrive on whatever thread the source emits on.
pub struct SubscribeOnOp<S, SD> {
  source: Arc<S>,
  scheduler: SD,
}

impl<S, SD: Clone> Clone for SubscribeOnOp<S, SD> {
  fn clone(&self) -> Self { SubscribeOnOp { source: self.source.clone(), scheduler: self.scheduler.clone() } }
}

impl<S, SD> SubscribeOnOp<S, SD> {
  pub(crate) fn new(source: S, scheduler: SD) -> Self { SubscribeOnOp { source: Arc::new(source), scheduler } }
}

impl<S, SD> Producer for SubscribeOnOp<S, SD>
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
    let sink = Sink::new(observer, cancel);
    let handle = sink.handle();
    let slot = Arc::new(SingleAssignmentDisposable::new());
    let (source, scheduler, c_slot) = (self.source.clone(), self.scheduler.clone(), slot.clone());
    let task = self.scheduler.schedule(move || {
      let subscription = source.subscribe_sink(ForwardSink(sink));
      let _ = c_slot.set(Subscription::new(ScheduledDisposable::new(scheduler, subscription)));
    });
    SinkAndSubscription::new(handle, Subscription::from_pair(task.into(), Subscription::from_arc(slot)))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn subscribes_when_the_scheduler_runs() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, ()>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    source
      .clone()
      .subscribe_on(scheduler.clone())
      .subscribe_event(move |e| c_log.lock().unwrap().push(e));
    assert!(!source.has_observers());
    scheduler.start().unwrap();
    assert!(source.has_observers());
    source.next(1);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1)]);
  }

  #[rxcore_macro::test]
  fn disposal_happens_on_the_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, ()>::new();
    let subscription = source.clone().subscribe_on(scheduler.clone()).subscribe_event(|_| {});
    scheduler.start().unwrap();
    subscription.dispose();
    assert!(source.has_observers());
    scheduler.start().unwrap();
    assert!(!source.has_observers());
  }

  #[rxcore_macro::test]
  fn dispose_before_the_task_runs_never_subscribes() {
    let scheduler = VirtualTimeScheduler::new();
    let source = PublishSubject::<i32, ()>::new();
    let subscription = source.clone().subscribe_on(scheduler.clone()).subscribe_event(|_| {});
    subscription.dispose();
    scheduler.start().unwrap();
    assert!(!source.has_observers());
  }
}
