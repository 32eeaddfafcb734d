use std::sync::Arc;

use crate::{
  observable::Producer, observer::Observer, sink::SinkAndSubscription, subscription::Subscription,
};

/// Calls `factory` on every subscription and subscribes to the observable it
/// returns.
///
/// ```
/// use rxcore::prelude::*;
///
/// let source = observable::defer(|| {
///   println!("subscribed");
///   observable::just::<_, std::convert::Infallible>("hello")
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn defer<F, P>(factory: F) -> Defer<F>
where
  F: Fn() -> P,
  P: Producer,
{
  Defer { factory: Arc::new(factory) }
}

pub struct Defer<F> {
  factory: Arc<F>,
}

impl<F> Clone for Defer<F> {
  fn clone(&self) -> Self { Defer { factory: self.factory.clone() } }
}

impl<F, P> Producer for Defer<F>
where
  F: Fn() -> P + Send + Sync + 'static,
  P: Producer,
{
  type Item = P::Item;
  type Err = P::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<P::Item, P::Err> + Send + 'static,
  {
    (self.factory)().run(observer, cancel)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn factory_runs_per_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c_calls = calls.clone();
    let source = observable::defer(move || {
      let n = c_calls.fetch_add(1, Ordering::SeqCst);
      observable::just::<_, std::convert::Infallible>(n)
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let seen = Arc::new(Mutex::new(vec![]));
    for _ in 0..3 {
      let seen = seen.clone();
      source.subscribe(move |v| seen.lock().unwrap().push(v));
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }
}
