use std::sync::Arc;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  sink::{SerialSink, SinkAndSubscription},
  subscription::Subscription,
};

/// Mirrors the source until `notifier` emits its first value, then
/// completes and disposes both.
///
/// The notifier is subscribed first, so a notifier that fires synchronously
/// completes the stream before the source is ever heard from. A notifier
/// that completes without a value changes nothing; its error fails the
/// stream.
///
/// ```
/// use rxcore::prelude::*;
///
/// let stop = PublishSubject::<(), std::convert::Infallible>::new();
/// let values = PublishSubject::new();
/// values.clone().take_until(stop.clone()).subscribe(|v: i32| println!("{v}"));
/// values.next(1);
/// stop.next(());
/// values.next(2); // not printed
/// ```
#[derive(Clone)]
pub struct TakeUntilOp<S, N> {
  source: S,
  notifier: N,
}

impl<S, N> TakeUntilOp<S, N> {
  pub(crate) fn new(source: S, notifier: N) -> Self { TakeUntilOp { source, notifier } }
}

impl<S, N> Producer for TakeUntilOp<S, N>
where
  S: Producer,
  N: Producer<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sink = Arc::new(SerialSink::new(observer, cancel));
    let notifier = self.notifier.subscribe_sink(TakeUntilNotifier { sink: sink.clone() });
    let source = self.source.subscribe_sink(TakeUntilSource { sink: sink.clone() });
    SinkAndSubscription::new(Subscription::from_arc(sink), Subscription::from_pair(notifier, source))
  }
}

pub struct TakeUntilSource<O, Item, Err> {
  sink: Arc<SerialSink<O, Item, Err>>,
}

impl<O, Item, Err> Observer<Item, Err> for TakeUntilSource<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.sink.forward(Event::Next(value)) }

  fn error(self, err: Err) { self.sink.forward(Event::Error(err)) }

  fn complete(self) { self.sink.forward(Event::Completed) }

  fn is_closed(&self) -> bool { self.sink.is_stopped() }
}

pub struct TakeUntilNotifier<O, Item, Err> {
  sink: Arc<SerialSink<O, Item, Err>>,
}

impl<O, Item, Err, Signal> Observer<Signal, Err> for TakeUntilNotifier<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, _: Signal) {
    tracing::trace!("take_until notifier fired");
    self.sink.forward(Event::Completed)
  }

  fn error(self, err: Err) { self.sink.forward(Event::Error(err)) }

  fn complete(self) {}

  fn is_closed(&self) -> bool { self.sink.is_stopped() }
}
