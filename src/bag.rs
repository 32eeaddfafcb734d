//! Insertion-ordered storage for observer registries.
//!
//! Most registries hold one or two entries, so the first entries live in an
//! inline array and only large bags fall back to an ordered map. Keys are
//! handed out from a monotonically increasing counter and never reused.

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// Entries kept in the array before spilling into the map.
const ARRAY_CAPACITY: usize = 30;

/// Identifies one entry of a [`Bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BagKey(u64);

pub struct Bag<T> {
  next_key: u64,
  // every key in `overflow` is greater than every key in `array`
  array: SmallVec<[(BagKey, T); 2]>,
  overflow: BTreeMap<BagKey, T>,
}

impl<T> Default for Bag<T> {
  fn default() -> Self { Bag { next_key: 0, array: SmallVec::new(), overflow: BTreeMap::new() } }
}

impl<T> Bag<T> {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, value: T) -> BagKey {
    let key = BagKey(self.next_key);
    self.next_key += 1;
    if self.overflow.is_empty() && self.array.len() < ARRAY_CAPACITY {
      self.array.push((key, value));
    } else {
      self.overflow.insert(key, value);
    }
    key
  }

  pub fn remove(&mut self, key: BagKey) -> Option<T> {
    if let Some(idx) = self.array.iter().position(|(k, _)| *k == key) {
      return Some(self.array.remove(idx).1);
    }
    self.overflow.remove(&key)
  }

  #[inline]
  pub fn len(&self) -> usize { self.array.len() + self.overflow.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn clear(&mut self) {
    self.array.clear();
    self.overflow.clear();
  }

  /// Entries in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.array.iter().map(|(_, v)| v).chain(self.overflow.values())
  }

  /// Removes every entry, returning them in insertion order.
  pub fn drain(&mut self) -> Vec<T> {
    let mut out: Vec<T> = self.array.drain(..).map(|(_, v)| v).collect();
    out.extend(std::mem::take(&mut self.overflow).into_values());
    out
  }
}

impl<T: Clone> Bag<T> {
  /// Clones the entries out before calling `f`, so `f` may freely mutate
  /// whatever owns the bag.
  pub fn for_each(&self, mut f: impl FnMut(T)) {
    for v in self.snapshot() {
      f(v)
    }
  }

  pub fn snapshot(&self) -> Vec<T> { self.iter().cloned().collect() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn keys_are_monotonic() {
    let mut bag = Bag::new();
    let a = bag.insert('a');
    bag.remove(a);
    let b = bag.insert('b');
    assert!(b > a);
    assert_eq!(bag.len(), 1);
  }

  #[rxcore_macro::test]
  fn spills_in_insertion_order() {
    let mut bag = Bag::new();
    let keys: Vec<_> = (0..100).map(|i| bag.insert(i)).collect();
    assert_eq!(bag.iter().copied().collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());

    for k in keys.iter().step_by(2) {
      assert!(bag.remove(*k).is_some());
    }
    assert_eq!(bag.len(), 50);
    assert!(bag.remove(keys[0]).is_none());

    bag.insert(1000);
    let all = bag.snapshot();
    assert_eq!(all.first(), Some(&1));
    assert_eq!(all.last(), Some(&1000));
    assert!(all.windows(2).take(49).all(|w| w[0] < w[1]));
  }

  #[rxcore_macro::test]
  fn drain_empties() {
    let mut bag = Bag::new();
    for i in 0..40 {
      bag.insert(i);
    }
    let drained = bag.drain();
    assert_eq!(drained.len(), 40);
    assert_eq!(drained[39], 39);
    assert!(bag.is_empty());
  }
}
