use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

mod anonymous;
mod boolean;
mod composite;
mod dispose_bag;
mod ref_count;
mod scheduled;
mod serial;
mod single_assignment;

pub use anonymous::AnonymousDisposable;
pub use boolean::BooleanDisposable;
pub use composite::CompositeDisposable;
pub use dispose_bag::{DisposeBag, DisposeGuard};
pub use ref_count::RefCountDisposable;
pub use scheduled::ScheduledDisposable;
pub use serial::SerialDisposable;
pub use single_assignment::SingleAssignmentDisposable;

/// A resource that can be released.
///
/// `dispose` is idempotent and safe to race from several threads: the
/// teardown it guards runs at most once, and never while an internal lock is
/// held.
pub trait Disposable: Send + Sync {
  fn dispose(&self);

  fn is_disposed(&self) -> bool;
}

/// Handle to cancel an active subscription.
///
/// Cheap to clone; every clone controls the same resource. The empty
/// subscription owns nothing and always reports itself disposed.
#[derive(Clone, Default)]
pub struct Subscription(Option<Arc<dyn Disposable>>);

impl Subscription {
  #[inline]
  pub fn empty() -> Self { Subscription(None) }

  pub fn new<D: Disposable + 'static>(disposable: D) -> Self {
    Subscription(Some(Arc::new(disposable)))
  }

  pub fn from_arc<D: Disposable + 'static>(disposable: Arc<D>) -> Self {
    Subscription(Some(disposable))
  }

  /// A subscription that runs `teardown` once when disposed.
  pub fn from_fn<F>(teardown: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Subscription::new(AnonymousDisposable::new(teardown))
  }

  /// Disposes both halves together.
  pub fn from_pair(first: Subscription, second: Subscription) -> Self {
    Subscription::from_fn(move || {
      first.dispose();
      second.dispose();
    })
  }

  /// A subscription that is already disposed.
  pub fn disposed() -> Self {
    let flag = BooleanDisposable::new();
    flag.dispose();
    Subscription::new(flag)
  }

  /// Hands ownership to `bag`; disposed when the bag is dropped.
  pub fn disposed_by(self, bag: &DisposeBag) { bag.insert(self) }

  /// Disposes the subscription when the returned guard is dropped.
  pub fn into_guard(self) -> DisposeGuard { DisposeGuard::new(self) }
}

impl Disposable for Subscription {
  #[inline]
  fn dispose(&self) {
    if let Some(inner) = &self.0 {
      inner.dispose()
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.as_ref().map_or(true, |inner| inner.is_disposed()) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("is_disposed", &self.is_disposed())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  #[rxcore_macro::test]
  fn empty_reports_disposed() {
    let sub = Subscription::empty();
    assert!(sub.is_disposed());
    sub.dispose();
  }

  #[rxcore_macro::test]
  fn clones_share_state() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let sub = Subscription::from_fn(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    let other = sub.clone();
    assert!(!other.is_disposed());
    sub.dispose();
    other.dispose();
    assert!(other.is_disposed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn pair_disposes_both() {
    let a = Subscription::new(BooleanDisposable::new());
    let b = Subscription::new(BooleanDisposable::new());
    Subscription::from_pair(a.clone(), b.clone()).dispose();
    assert!(a.is_disposed() && b.is_disposed());
  }
}
