use super::subject_core::SubjectCore;

/// Multicasts to the subscribers present at emission time. Late subscribers
/// see only what is emitted after they join.
///
/// ```
/// use rxcore::prelude::*;
///
/// let subject = PublishSubject::<i32, String>::new();
/// subject.next(1);
/// subject.subscribe_all(|v| println!("{v}"), |e| eprintln!("{e}"), || {});
/// subject.next(2);
/// subject.complete();
/// ```
pub struct PublishSubject<Item, Err> {
  core: SubjectCore<Item, Err, ()>,
}

impl<Item, Err> PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new() -> Self { PublishSubject { core: SubjectCore::new(()) } }
}

impl<Item, Err> Default for PublishSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl_subject!(PublishSubject);

#[cfg(test)]
mod tests {
  use std::{
    sync::{Arc, Mutex},
    thread,
  };

  use crate::prelude::*;

  type Log = Arc<Mutex<Vec<Event<i32, String>>>>;

  fn attach(subject: &PublishSubject<i32, String>) -> (Log, Subscription) {
    let log = Log::default();
    let c_log = log.clone();
    let sub = subject.subscribe_event(move |e| c_log.lock().unwrap().push(e));
    (log, sub)
  }

  #[rxcore_macro::test]
  fn late_subscriber_misses_earlier_values() {
    let subject = PublishSubject::new();
    let (early, _) = attach(&subject);
    subject.next(1);
    let (late, _) = attach(&subject);
    subject.next(2);
    subject.complete();
    assert_eq!(*early.lock().unwrap(), vec![Event::Next(1), Event::Next(2), Event::Completed]);
    assert_eq!(*late.lock().unwrap(), vec![Event::Next(2), Event::Completed]);
  }

  #[rxcore_macro::test]
  fn subscriber_after_error_gets_the_error() {
    let subject = PublishSubject::new();
    subject.next(1);
    subject.error("boom".to_owned());
    subject.next(2);
    let (log, sub) = attach(&subject);
    assert_eq!(*log.lock().unwrap(), vec![Event::Error("boom".to_owned())]);
    assert!(sub.is_disposed());
  }

  #[rxcore_macro::test]
  fn unsubscribe_detaches() {
    let subject = PublishSubject::new();
    let (log, sub) = attach(&subject);
    assert_eq!(subject.observer_count(), 1);
    sub.dispose();
    assert!(!subject.has_observers());
    subject.next(1);
    assert!(log.lock().unwrap().is_empty());
  }

  #[rxcore_macro::test]
  fn subscribe_after_dispose_is_rejected() {
    let subject = PublishSubject::new();
    let (log, _) = attach(&subject);
    subject.dispose();
    subject.next(1);
    let (late, _) = attach(&subject);
    assert_eq!(subject.observer_count(), 0);
    assert!(log.lock().unwrap().is_empty());
    assert!(late.lock().unwrap().is_empty());
  }

  #[rxcore_macro::test]
  fn reentrant_emission_is_queued() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    let (c_log, c_subject) = (log.clone(), subject.clone());
    subject.subscribe_event(move |e| {
      if e == Event::Next(1) {
        c_subject.next(2);
      }
      c_log.lock().unwrap().push(e);
    });
    subject.next(1);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Next(2)]);
  }

  #[rxcore_macro::test]
  fn concurrent_emitters_deliver_serially() {
    let subject = PublishSubject::<i32, String>::new();
    let total = Arc::new(Mutex::new(0));
    let c_total = total.clone();
    subject.subscribe_event(move |e| {
      if let Event::Next(v) = e {
        *c_total.lock().unwrap() += v;
      }
    });
    let workers: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        thread::spawn(move || {
          for _ in 0..250 {
            subject.next(1);
          }
        })
      })
      .collect();
    for worker in workers {
      worker.join().unwrap();
    }
    assert_eq!(*total.lock().unwrap(), 1000);
  }
}
