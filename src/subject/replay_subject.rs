use std::collections::VecDeque;

use super::subject_core::{History, SubjectCore};
use crate::error::ContractViolation;

/// How many values a [`ReplaySubject`] keeps for late subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPolicy {
  /// The latest value only.
  One,
  /// The latest `n` values. `Last(0)` keeps nothing.
  Last(usize),
  /// Everything, unbounded.
  All,
}

impl ReplayPolicy {
  fn capacity(self) -> Option<usize> {
    match self {
      ReplayPolicy::One => Some(1),
      ReplayPolicy::Last(n) => Some(n),
      ReplayPolicy::All => None,
    }
  }
}

pub(crate) struct ReplayBuffer<Item> {
  values: VecDeque<Item>,
  capacity: Option<usize>,
}

impl<Item> History<Item> for ReplayBuffer<Item>
where
  Item: Clone + Send + 'static,
{
  fn record(&mut self, value: &Item) {
    match self.capacity {
      Some(0) => return,
      Some(capacity) if self.values.len() == capacity => {
        self.values.pop_front();
      }
      _ => {}
    }
    self.values.push_back(value.clone());
  }

  fn replay(&self) -> Vec<Item> { self.values.iter().cloned().collect() }
}

/// Replays buffered values to every new subscriber, then continues live.
///
/// ```
/// use rxcore::prelude::*;
///
/// let subject = ReplaySubject::<i32, ()>::create(2).unwrap();
/// subject.next(1);
/// subject.next(2);
/// subject.next(3);
/// // prints 2 and 3
/// subject.subscribe_all(|v| println!("{v}"), |_| {}, || {});
/// ```
pub struct ReplaySubject<Item, Err> {
  core: SubjectCore<Item, Err, ReplayBuffer<Item>>,
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Keeps the latest `buffer_size` values; zero is rejected.
  pub fn create(buffer_size: usize) -> Result<Self, ContractViolation> {
    if buffer_size == 0 {
      return Err(ContractViolation::InvalidBufferSize);
    }
    let policy = if buffer_size == 1 { ReplayPolicy::One } else { ReplayPolicy::Last(buffer_size) };
    Ok(Self::with_policy(policy))
  }

  pub fn create_unbounded() -> Self { Self::with_policy(ReplayPolicy::All) }

  pub fn with_policy(policy: ReplayPolicy) -> Self {
    let capacity = policy.capacity();
    ReplaySubject {
      core: SubjectCore::new(ReplayBuffer {
        values: VecDeque::with_capacity(capacity.unwrap_or(0).min(64)),
        capacity,
      }),
    }
  }

  /// Number of values currently buffered.
  pub fn buffered_len(&self) -> usize { self.core.with_state(|state| state.history.values.len()) }
}

impl_subject!(ReplaySubject);

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::prelude::*;

  type Log = Arc<Mutex<Vec<Event<i32, &'static str>>>>;

  fn attach(subject: &ReplaySubject<i32, &'static str>) -> Log {
    let log = Log::default();
    let c_log = log.clone();
    subject.subscribe_event(move |e| c_log.lock().unwrap().push(e));
    log
  }

  #[rxcore_macro::test]
  fn zero_buffer_is_rejected() {
    assert_eq!(
      ReplaySubject::<i32, ()>::create(0).err(),
      Some(ContractViolation::InvalidBufferSize)
    );
  }

  #[rxcore_macro::test]
  fn bounded_buffer_keeps_the_latest() {
    let subject = ReplaySubject::create(2).unwrap();
    for v in 1..=4 {
      subject.next(v);
    }
    assert_eq!(subject.buffered_len(), 2);
    let log = attach(&subject);
    subject.next(5);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(3), Event::Next(4), Event::Next(5)]);
  }

  #[rxcore_macro::test]
  fn unbounded_replays_everything_then_terminal() {
    let subject = ReplaySubject::create_unbounded();
    subject.next(1);
    subject.next(2);
    subject.error("bad");
    let log = attach(&subject);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(1), Event::Next(2), Event::Error("bad")]);
  }

  #[rxcore_macro::test]
  fn last_zero_behaves_like_publish() {
    let subject = ReplaySubject::with_policy(ReplayPolicy::Last(0));
    subject.next(1);
    let log = attach(&subject);
    subject.next(2);
    assert_eq!(*log.lock().unwrap(), vec![Event::Next(2)]);
  }
}
