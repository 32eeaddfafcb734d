use std::marker::PhantomData;

use crate::{
  observable::Producer, observer::Observer, sink::SinkAndSubscription, subscription::Subscription,
};

fn finished() -> SinkAndSubscription { SinkAndSubscription::new(Subscription::empty(), Subscription::empty()) }

/// Emits `value`, then completes.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::just(123).subscribe(|v| println!("{v}"));
/// ```
pub fn just<Item, Err>(value: Item) -> Just<Item, Err> { Just { value, _err: PhantomData } }

/// Same as [`just`].
pub fn of<Item, Err>(value: Item) -> Just<Item, Err> { just(value) }

pub struct Just<Item, Err> {
  value: Item,
  _err: PhantomData<fn() -> Err>,
}

impl<Item: Clone, Err> Clone for Just<Item, Err> {
  fn clone(&self) -> Self { just(self.value.clone()) }
}

impl<Item, Err> Producer for Just<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, mut observer: O, _cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    if !observer.is_closed() {
      observer.next(self.value.clone());
      observer.complete();
    }
    finished()
  }
}

/// Completes immediately without emitting.
pub fn empty<Item, Err>() -> Empty<Item, Err> { Empty(PhantomData) }

pub struct Empty<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for Empty<Item, Err> {
  fn clone(&self) -> Self { Empty(PhantomData) }
}

impl<Item, Err> Producer for Empty<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, _cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.complete();
    finished()
  }
}

/// Never emits and never terminates.
pub fn never<Item, Err>() -> Never<Item, Err> { Never(PhantomData) }

pub struct Never<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for Never<Item, Err> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item, Err> Producer for Never<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, _observer: O, _cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    finished()
  }
}

/// Fails immediately with `err`.
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr { err, _item: PhantomData } }

pub struct ThrowErr<Item, Err> {
  err: Err,
  _item: PhantomData<fn() -> Item>,
}

impl<Item, Err: Clone> Clone for ThrowErr<Item, Err> {
  fn clone(&self) -> Self { throw_err(self.err.clone()) }
}

impl<Item, Err> Producer for ThrowErr<Item, Err>
where
  Item: Send + 'static,
  Err: Clone + Send + Sync + 'static,
{
  type Item = Item;
  type Err = Err;

  fn run<O>(&self, observer: O, _cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.error(self.err.clone());
    finished()
  }
}
