use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  event::Event,
  observable::Producer,
  observer::Observer,
  sink::{SerialSink, SinkAndSubscription},
  subscription::Subscription,
};

/// Emits the latest source value each time the sampler ticks, if the source
/// produced one since the previous tick.
///
/// The stream ends at the first tick after the source completed, or when the
/// sampler completes; in the second case a pending value is emitted first.
/// An error from either side fails the stream.
#[derive(Clone)]
pub struct SampleOp<S, T> {
  source: S,
  sampler: T,
}

impl<S, T> SampleOp<S, T> {
  pub(crate) fn new(source: S, sampler: T) -> Self { SampleOp { source, sampler } }
}

struct Latest<Item> {
  element: Option<Item>,
  source_done: bool,
}

struct Sample<O, S: Producer> {
  sink: Arc<SerialSink<O, S::Item, S::Err>>,
  latest: Mutex<Latest<S::Item>>,
}

impl<O, S> Sample<O, S>
where
  O: Observer<S::Item, S::Err>,
  S: Producer,
{
  fn tick(&self, sampler_done: bool) {
    {
      let mut latest = self.latest.lock();
      if let Some(value) = latest.element.take() {
        self.sink.push(Event::Next(value));
      }
      if sampler_done || latest.source_done {
        self.sink.push(Event::Completed);
      }
    }
    self.sink.drain();
  }
}

impl<S, T> Producer for SampleOp<S, T>
where
  S: Producer,
  T: Producer<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn run<O>(&self, observer: O, cancel: Subscription) -> SinkAndSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let sample = Arc::new(Sample::<O, S> {
      sink: Arc::new(SerialSink::new(observer, cancel)),
      latest: Mutex::new(Latest { element: None, source_done: false }),
    });
    let sampler = self.sampler.subscribe_sink(SampleTicker { sample: sample.clone() });
    let source = self.source.subscribe_sink(SampleSource { sample: sample.clone() });
    SinkAndSubscription::new(Subscription::from_arc(sample.sink.clone()), Subscription::from_pair(source, sampler))
  }
}

pub struct SampleSource<O, S: Producer> {
  sample: Arc<Sample<O, S>>,
}

impl<O, S> Observer<S::Item, S::Err> for SampleSource<O, S>
where
  O: Observer<S::Item, S::Err>,
  S: Producer,
{
  fn next(&mut self, value: S::Item) { self.sample.latest.lock().element = Some(value) }

  fn error(self, err: S::Err) { self.sample.sink.forward(Event::Error(err)) }

  fn complete(self) { self.sample.latest.lock().source_done = true }

  fn is_closed(&self) -> bool { self.sample.sink.is_stopped() }
}

pub struct SampleTicker<O, S: Producer> {
  sample: Arc<Sample<O, S>>,
}

impl<O, S, Tick> Observer<Tick, S::Err> for SampleTicker<O, S>
where
  O: Observer<S::Item, S::Err>,
  S: Producer,
{
  fn next(&mut self, _: Tick) { self.sample.tick(false) }

  fn error(self, err: S::Err) { self.sample.sink.forward(Event::Error(err)) }

  fn complete(self) { self.sample.tick(true) }

  fn is_closed(&self) -> bool { self.sample.sink.is_stopped() }
}
