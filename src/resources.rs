//! Resource accounting hook.
//!
//! With the `trace-resources` feature every tracked allocation emits a
//! `tracing` event on target `rxcore::resources` carrying `kind` and a
//! `delta` of `1` or `-1`. Hosts that want a live count install a
//! subscriber layer that sums the deltas. Without the feature this is inert.

pub(crate) struct Tracked(#[allow(dead_code)] &'static str);

impl Tracked {
  #[inline]
  pub(crate) fn new(kind: &'static str) -> Self {
    #[cfg(feature = "trace-resources")]
    tracing::trace!(target: "rxcore::resources", kind, delta = 1i64);
    Tracked(kind)
  }
}

impl Drop for Tracked {
  #[inline]
  fn drop(&mut self) {
    #[cfg(feature = "trace-resources")]
    tracing::trace!(target: "rxcore::resources", kind = self.0, delta = -1i64);
  }
}
