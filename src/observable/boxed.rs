//! Type-erased observables.
//!
//! Operator chains have long concrete types. [`BoxedObservable`] hides them
//! behind one trait object so heterogeneous sources can be stored together,
//! returned from functions, or merged and concatenated.

use std::sync::Arc;

use crate::{
  observable::Producer,
  observer::{BoxedObserver, Observer},
  sink::SinkAndSubscription,
  subscription::Subscription,
};

/// Object-safe form of [`Producer`].
pub trait DynProducer<Item, Err>: Send + Sync {
  fn run_boxed(&self, observer: BoxedObserver<Item, Err>, cancel: Subscription) -> SinkAndSubscription;
}

impl<P> DynProducer<P::Item, P::Err> for P
where
  P: Producer,
{
  fn run_boxed(&self, observer: BoxedObserver<P::Item, P::Err>, cancel: Subscription) -> SinkAndSubscription {
    self.run(observer, cancel)
  }
}

/// A shareable, type-erased observable. Clones subscribe to the same
/// underlying producer.
pub struct BoxedObservable<Item, Err>(Arc<dyn DynProducer<Item, Err>>);

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new<P>(producer: P) -> Self
  where
    P: Producer<Item = Item, Err = Err>,
  {
    BoxedObservable(Arc::new(producer))
  }
}

impl<Item, Err> Clone for BoxedObservable<Item, Err> {
  fn clone(&self) -> Self { BoxedObservable(self.0.clone()) }
}

impl<Item, Err> Producer for BoxedObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.0.run_boxed(Box::new(observer), cancel)
  }
}
