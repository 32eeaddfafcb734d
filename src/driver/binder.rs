use std::{
  fmt::Debug,
  sync::{Arc, Weak},
};

use crate::{
  error::ContractViolation,
  observer::Observer,
  scheduler::{Scheduler, SchedulerExt},
};

/// Observer that applies each value to a target on a scheduler.
///
/// The target is held weakly: once it is dropped the binder reports itself
/// closed and bindings stop. Errors are a programming mistake for a binding;
/// they are logged and never reach the target. Completion is ignored.
pub struct Binder<T> {
  apply: Arc<dyn Fn(T) + Send + Sync>,
  alive: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl<T> Clone for Binder<T> {
  fn clone(&self) -> Self { Binder { apply: self.apply.clone(), alive: self.alive.clone() } }
}

impl<T: Send + 'static> Binder<T> {
  pub fn new<Target, S, F>(target: &Arc<Target>, scheduler: S, binding: F) -> Self
  where
    Target: Send + Sync + 'static,
    S: Scheduler,
    F: Fn(&Target, T) + Send + Sync + 'static,
  {
    let weak: Weak<Target> = Arc::downgrade(target);
    let c_weak = weak.clone();
    let binding = Arc::new(binding);
    let apply = move |value: T| {
      let (weak, binding) = (weak.clone(), binding.clone());
      scheduler.schedule(move || {
        if let Some(target) = weak.upgrade() {
          binding(&target, value);
        }
      });
    };
    Binder { apply: Arc::new(apply), alive: Arc::new(move || c_weak.strong_count() > 0) }
  }
}

impl<T, Err: Debug> Observer<T, Err> for Binder<T> {
  fn next(&mut self, value: T) { (self.apply)(value) }

  fn error(self, err: Err) {
    let violation = ContractViolation::BindingError(format!("{err:?}"));
    tracing::error!(%violation, "binder received an error");
  }

  fn complete(self) {}

  fn is_closed(&self) -> bool { !(self.alive)() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::{observer::Observer, prelude::*};

  #[rxcore_macro::test]
  fn binds_values_to_the_target() {
    let label = Arc::new(Mutex::new(String::new()));
    let binder = Binder::new(&label, ImmediateScheduler, |label: &Mutex<String>, text: String| {
      *label.lock().unwrap() = text
    });
    let text = PublishSubject::<String, ()>::new();
    text.clone().as_driver_on_error_just_return(String::new(), ImmediateScheduler).drive_binder(binder);
    text.next("hello".into());
    assert_eq!(*label.lock().unwrap(), "hello");
  }

  #[rxcore_macro::test]
  fn dropped_target_closes_the_binder() {
    let target = Arc::new(Mutex::new(0));
    let binder = Binder::new(&target, ImmediateScheduler, |t: &Mutex<i32>, v: i32| *t.lock().unwrap() = v);
    assert!(!Observer::<i32, ()>::is_closed(&binder));
    drop(target);
    assert!(Observer::<i32, ()>::is_closed(&binder));
  }

  #[rxcore_macro::test]
  fn errors_never_reach_the_target() {
    let target = Arc::new(Mutex::new(vec![]));
    let binder = Binder::new(&target, ImmediateScheduler, |t: &Mutex<Vec<i32>>, v: i32| t.lock().unwrap().push(v));
    let values = PublishSubject::<i32, &'static str>::new();
    values.clone().subscribe_observer(binder);
    values.next(1);
    PublishSubject::error(&values, "broken");
    values.next(2);
    assert_eq!(*target.lock().unwrap(), vec![1]);
  }

  #[rxcore_macro::test]
  fn runs_on_its_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let target = Arc::new(Mutex::new(vec![]));
    let mut binder = Binder::new(&target, scheduler.clone(), |t: &Mutex<Vec<i32>>, v: i32| t.lock().unwrap().push(v));
    Observer::<i32, ()>::next(&mut binder, 7);
    assert!(target.lock().unwrap().is_empty());
    scheduler.start().unwrap();
    assert_eq!(*target.lock().unwrap(), vec![7]);
  }
}
