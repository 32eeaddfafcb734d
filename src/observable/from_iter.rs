use std::marker::PhantomData;

use crate::{
  observable::Producer, observer::Observer, sink::SinkAndSubscription, subscription::Subscription,
};

/// Emits every item of `iter`, then completes.
///
/// Iteration stops as soon as the downstream is closed, so an infinite
/// iterator is fine behind `take`.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(0..10).take(3).subscribe(|v| println!("{v}"));
/// ```
pub fn from_iter<I, Err>(iter: I) -> FromIter<I, Err>
where
  I: IntoIterator,
{
  FromIter { iter, _err: PhantomData }
}

pub struct FromIter<I, Err> {
  iter: I,
  _err: PhantomData<fn() -> Err>,
}

impl<I: Clone, Err> Clone for FromIter<I, Err> {
  fn clone(&self) -> Self { FromIter { iter: self.iter.clone(), _err: PhantomData } }
}

impl<I, Err> Producer for FromIter<I, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn run<O>(&self, mut observer: O, _cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<I::Item, Err> + Send + 'static,
  {
    let done = SinkAndSubscription::new(Subscription::empty(), Subscription::empty());
    for value in self.iter.clone() {
      if observer.is_closed() {
        return done;
      }
      observer.next(value);
    }
    if !observer.is_closed() {
      observer.complete();
    }
    done
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn emits_in_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let done = Arc::new(Mutex::new(false));
    let c_done = done.clone();
    observable::from_iter(vec!['a', 'b', 'c']).subscribe_all(
      move |v| c_log.lock().unwrap().push(v),
      |_: ()| {},
      move || *c_done.lock().unwrap() = true,
    );
    assert_eq!(*log.lock().unwrap(), vec!['a', 'b', 'c']);
    assert!(*done.lock().unwrap());
  }

  #[rxcore_macro::test]
  fn infinite_iterator_stops_when_taken() {
    let sum = Arc::new(Mutex::new(0u64));
    let c_sum = sum.clone();
    observable::from_iter(0u64..).take(5).subscribe(move |v| *c_sum.lock().unwrap() += v);
    assert_eq!(*sum.lock().unwrap(), 10);
  }
}
