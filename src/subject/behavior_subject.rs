use thiserror::Error;

use super::subject_core::{History, SubjectCore};
use crate::event::Event;

pub(crate) struct Current<Item>(Item);

impl<Item> History<Item> for Current<Item>
where
  Item: Clone + Send + 'static,
{
  fn record(&mut self, value: &Item) { self.0 = value.clone() }

  fn replay(&self) -> Vec<Item> { vec![self.0.clone()] }

  fn replays_after_stop(&self) -> bool { false }
}

/// Why [`BehaviorSubject::value`] has no value to return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError<Err> {
  #[error("subject is disposed")]
  Disposed,
  #[error("subject terminated with an error")]
  Failed(Err),
}

/// Holds a current value: every new subscriber receives it first, followed
/// by live values.
///
/// After completion, new subscribers receive the completion only.
pub struct BehaviorSubject<Item, Err> {
  core: SubjectCore<Item, Err, Current<Item>>,
}

impl<Item, Err> BehaviorSubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  pub fn new(initial: Item) -> Self { BehaviorSubject { core: SubjectCore::new(Current(initial)) } }

  /// The current value. Still available after completion.
  pub fn value(&self) -> Result<Item, ValueError<Err>> {
    self.core.with_state(|state| {
      if state.disposed {
        return Err(ValueError::Disposed);
      }
      match &state.terminal {
        Some(Event::Error(err)) => Err(ValueError::Failed(err.clone())),
        _ => Ok(state.history.0.clone()),
      }
    })
  }

  /// The last value, whatever the subject's state.
  pub(crate) fn current(&self) -> Item { self.core.with_state(|state| state.history.0.clone()) }
}

impl_subject!(BehaviorSubject);

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::prelude::*;

  type Log = Arc<Mutex<Vec<Event<&'static str, String>>>>;

  fn attach(subject: &BehaviorSubject<&'static str, String>) -> Log {
    let log = Log::default();
    let c_log = log.clone();
    subject.subscribe_event(move |e| c_log.lock().unwrap().push(e));
    log
  }

  #[rxcore_macro::test]
  fn new_subscriber_gets_current_value() {
    let subject = BehaviorSubject::new("initial");
    let first = attach(&subject);
    subject.next("a");
    let second = attach(&subject);
    subject.next("b");
    assert_eq!(*first.lock().unwrap(), vec![Event::Next("initial"), Event::Next("a"), Event::Next("b")]);
    assert_eq!(*second.lock().unwrap(), vec![Event::Next("a"), Event::Next("b")]);
    assert_eq!(subject.value(), Ok("b"));
  }

  #[rxcore_macro::test]
  fn after_completion_only_completion_is_replayed() {
    let subject = BehaviorSubject::new("x");
    subject.complete();
    let log = attach(&subject);
    assert_eq!(*log.lock().unwrap(), vec![Event::Completed]);
    assert_eq!(subject.value(), Ok("x"));
  }

  #[rxcore_macro::test]
  fn value_reports_error_and_disposal() {
    let subject = BehaviorSubject::<&'static str, String>::new("x");
    subject.error("broken".to_owned());
    assert_eq!(subject.value(), Err(ValueError::Failed("broken".to_owned())));
    subject.dispose();
    assert_eq!(subject.value(), Err(ValueError::Disposed));
  }
}
