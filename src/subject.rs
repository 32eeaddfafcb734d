//! Subjects: observers that are also observables.
//!
//! Values pushed into a subject are multicast to every current subscriber.
//! Handles are cheap to clone and every clone is the same subject.
//!
//! | Subject | A late subscriber first receives |
//! |---------|----------------------------------|
//! | [`PublishSubject`] | nothing |
//! | [`ReplaySubject`] | buffered values, per its [`ReplayPolicy`] |
//! | [`BehaviorSubject`] | the current value |
//!
//! After a terminal event, new subscribers receive the buffered values (if
//! any) followed by that terminal event. After `dispose`, subscribing is a
//! usage error: it is logged and the subscription is disposed immediately.

use crate::{observable::Producer, observer::Observer};

/// Implemented by every subject handle.
pub trait Subject<Item, Err>:
  Producer<Item = Item, Err = Err> + Observer<Item, Err> + Clone + Send + Sync + 'static
{
}

impl<Item, Err, T> Subject<Item, Err> for T where
  T: Producer<Item = Item, Err = Err> + Observer<Item, Err> + Clone + Send + Sync + 'static
{
}

/// Inherent `next`/`error`/`complete`/`dispose` plus the trait impls shared by
/// every subject over a `SubjectCore` field named `core`.
macro_rules! impl_subject {
  ($name:ident) => {
    impl<Item, Err> $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      pub fn next(&self, value: Item) { self.core.emit($crate::event::Event::Next(value)) }

      pub fn error(&self, err: Err) { self.core.emit($crate::event::Event::Error(err)) }

      pub fn complete(&self) { self.core.emit($crate::event::Event::Completed) }

      pub fn emit(&self, event: $crate::event::Event<Item, Err>) { self.core.emit(event) }

      /// Drops every subscriber without notifying it. Later emissions are
      /// ignored and later subscriptions are rejected.
      pub fn dispose(&self) { self.core.dispose() }

      pub fn is_disposed(&self) -> bool { self.core.is_disposed() }

      pub fn has_observers(&self) -> bool { self.core.observer_count() > 0 }

      pub fn observer_count(&self) -> usize { self.core.observer_count() }
    }

    impl<Item, Err> Clone for $name<Item, Err> {
      fn clone(&self) -> Self { $name { core: self.core.clone() } }
    }

    impl<Item, Err> $crate::observer::Observer<Item, Err> for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      fn next(&mut self, value: Item) { $name::next(self, value) }

      fn error(self, err: Err) { $name::error(&self, err) }

      fn complete(self) { $name::complete(&self) }

      fn is_closed(&self) -> bool { self.core.is_stopped() }
    }

    impl<Item, Err> $crate::observable::Producer for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      type Item = Item;
      type Err = Err;

      fn run<O>(&self, observer: O, cancel: $crate::subscription::Subscription) -> $crate::sink::SinkAndSubscription
      where
        O: $crate::observer::Observer<Item, Err> + Send + 'static,
      {
        self.core.subscribe(observer, cancel)
      }
    }
  };
}

mod behavior_subject;
mod publish_subject;
mod replay_subject;
mod subject_core;
mod variable;

pub use behavior_subject::{BehaviorSubject, ValueError};
pub use publish_subject::PublishSubject;
pub use replay_subject::{ReplayPolicy, ReplaySubject};
pub use variable::Variable;
