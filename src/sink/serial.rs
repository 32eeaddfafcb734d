use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
  event::Event,
  observer::Observer,
  resources::Tracked,
  subscription::{Disposable, Subscription},
};

struct State<O, Item, Err> {
  observer: Option<O>,
  queue: VecDeque<Event<Item, Err>>,
  draining: bool,
  stopped: bool,
  disposed: bool,
}

/// Thread-safe downstream for operators fed by several sources or threads.
///
/// Events are [`push`](SerialSink::push)ed, which is cheap and may happen
/// while the caller holds its own state lock, and later
/// [`drain`](SerialSink::drain)ed with no lock held. Exactly one thread
/// drains at a time and delivers in push order; a push from inside the
/// observer is queued and delivered after the current call returns. Nothing
/// is accepted after a terminal event, and delivering the terminal event
/// disposes `cancel`.
pub struct SerialSink<O, Item, Err> {
  state: Mutex<State<O, Item, Err>>,
  cancel: Subscription,
  _tracked: Tracked,
}

impl<O, Item, Err> SerialSink<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  pub fn new(observer: O, cancel: Subscription) -> Self {
    SerialSink {
      state: Mutex::new(State {
        observer: Some(observer),
        queue: VecDeque::new(),
        draining: false,
        stopped: false,
        disposed: false,
      }),
      cancel,
      _tracked: Tracked::new("serial_sink"),
    }
  }

  /// Queues `event` without delivering it.
  pub fn push(&self, event: Event<Item, Err>) {
    let mut state = self.state.lock();
    if state.stopped {
      return;
    }
    state.stopped = event.is_stop_event();
    state.queue.push_back(event);
  }

  /// Delivers queued events, unless another call is already doing so.
  pub fn drain(&self) {
    let mut observer = {
      let mut state = self.state.lock();
      if state.draining || state.queue.is_empty() {
        return;
      }
      match state.observer.take() {
        Some(observer) => {
          state.draining = true;
          observer
        }
        None => {
          state.queue.clear();
          return;
        }
      }
    };

    loop {
      let event = {
        let mut state = self.state.lock();
        if state.disposed {
          state.draining = false;
          state.queue.clear();
          None
        } else {
          match state.queue.pop_front() {
            Some(event) => Some(event),
            None => {
              state.draining = false;
              state.observer = Some(observer);
              return;
            }
          }
        }
      };
      match event {
        Some(Event::Next(v)) => observer.next(v),
        Some(Event::Error(e)) => {
          observer.error(e);
          return self.finish();
        }
        Some(Event::Completed) => {
          observer.complete();
          return self.finish();
        }
        // disposed while draining: the observer is dropped here
        None => return,
      }
    }
  }

  /// `push` then `drain`.
  pub fn forward(&self, event: Event<Item, Err>) {
    self.push(event);
    self.drain();
  }

  /// `true` once a terminal event was pushed or the sink was disposed.
  pub fn is_stopped(&self) -> bool { self.state.lock().stopped }

  fn finish(&self) {
    {
      let mut state = self.state.lock();
      state.draining = false;
      state.queue.clear();
    }
    self.cancel.dispose();
  }
}

impl<O, Item, Err> Disposable for SerialSink<O, Item, Err>
where
  O: Send,
  Item: Send,
  Err: Send,
{
  fn dispose(&self) {
    let observer = {
      let mut state = self.state.lock();
      if state.disposed {
        return;
      }
      state.disposed = true;
      state.stopped = true;
      state.queue.clear();
      state.observer.take()
    };
    drop(observer);
  }

  fn is_disposed(&self) -> bool { self.state.lock().disposed }
}
