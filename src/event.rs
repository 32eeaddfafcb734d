/// One notification of the observer grammar `Next* (Error | Completed)?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  /// `true` for `Error` and `Completed`.
  #[inline]
  pub fn is_stop_event(&self) -> bool { !matches!(self, Event::Next(_)) }

  #[inline]
  pub fn is_completed(&self) -> bool { matches!(self, Event::Completed) }

  pub fn element(&self) -> Option<&Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&Err> {
    match self {
      Event::Error(e) => Some(e),
      _ => None,
    }
  }

  pub fn map<B>(self, f: impl FnOnce(Item) -> B) -> Event<B, Err> {
    match self {
      Event::Next(v) => Event::Next(f(v)),
      Event::Error(e) => Event::Error(e),
      Event::Completed => Event::Completed,
    }
  }

  pub fn map_err<E>(self, f: impl FnOnce(Err) -> E) -> Event<Item, E> {
    match self {
      Event::Next(v) => Event::Next(v),
      Event::Error(e) => Event::Error(f(e)),
      Event::Completed => Event::Completed,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn stop_events() {
    assert!(!Event::<i32, ()>::Next(1).is_stop_event());
    assert!(Event::<i32, ()>::Error(()).is_stop_event());
    assert!(Event::<i32, ()>::Completed.is_completed());
  }

  #[rxcore_macro::test]
  fn map_keeps_terminal() {
    let e: Event<i32, &str> = Event::Error("x");
    assert_eq!(e.map(|v| v + 1), Event::Error("x"));
    assert_eq!(Event::<i32, &str>::Next(1).map(|v| v + 1).element(), Some(&2));
  }
}
