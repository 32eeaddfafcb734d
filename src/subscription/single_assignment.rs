use parking_lot::Mutex;

use crate::{
  error::ContractViolation,
  subscription::{Disposable, Subscription},
};

#[derive(Default)]
struct State {
  disposed: bool,
  assigned: bool,
  current: Option<Subscription>,
}

/// A slot that accepts exactly one subscription.
///
/// Disposing before assignment is remembered: the subscription assigned
/// later is disposed on arrival.
#[derive(Default)]
pub struct SingleAssignmentDisposable(Mutex<State>);

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  /// Assigns the slot. A second assignment is rejected with
  /// [`ContractViolation::AlreadyAssigned`] and the rejected subscription is
  /// disposed.
  pub fn set(&self, subscription: Subscription) -> Result<(), ContractViolation> {
    let mut state = self.0.lock();
    if state.assigned {
      drop(state);
      tracing::error!("{}", ContractViolation::AlreadyAssigned);
      subscription.dispose();
      return Err(ContractViolation::AlreadyAssigned);
    }
    state.assigned = true;
    if state.disposed {
      drop(state);
      subscription.dispose();
    } else {
      state.current = Some(subscription);
    }
    Ok(())
  }

  pub fn is_assigned(&self) -> bool { self.0.lock().assigned }
}

impl Disposable for SingleAssignmentDisposable {
  fn dispose(&self) {
    let current = {
      let mut state = self.0.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::BooleanDisposable;

  #[rxcore_macro::test]
  fn second_assignment_is_rejected() {
    let slot = SingleAssignmentDisposable::new();
    let first = Subscription::new(BooleanDisposable::new());
    let second = Subscription::new(BooleanDisposable::new());
    assert_eq!(slot.set(first.clone()), Ok(()));
    assert_eq!(slot.set(second.clone()), Err(ContractViolation::AlreadyAssigned));
    assert!(second.is_disposed());
    assert!(!first.is_disposed());
    slot.dispose();
    assert!(first.is_disposed());
  }

  #[rxcore_macro::test]
  fn dispose_before_assignment() {
    let slot = SingleAssignmentDisposable::new();
    slot.dispose();
    let late = Subscription::new(BooleanDisposable::new());
    assert!(slot.set(late.clone()).is_ok());
    assert!(late.is_disposed());
    assert!(slot.is_assigned());
  }
}
