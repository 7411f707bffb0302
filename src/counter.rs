//! Monotonic event counting through shared references.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter bumped through `&self`.
///
/// The companion to a frozen object: construct the object immutable, embed a
/// `Counter` for the one field that must move, and share the whole thing
/// freely with no exclusive borrows and no lock. There is deliberately no
/// store or decrement surface; the value only grows.
///
/// All operations are Relaxed. The count carries no payload for other threads
/// to synchronize against, so ordering stronger than the atomicity of the
/// add itself buys nothing here.
///
/// # Examples
///
/// ```rust
/// use permit_once::Counter;
///
/// struct Endpoint {
///    url: String,       // frozen after construction
///    hits: Counter,
/// }
///
/// let ep = Endpoint { url: "/health".into(), hits: Counter::new() };
/// ep.hits.bump();
/// ep.hits.bump();
/// assert_eq!(ep.hits.value(), 2);
/// assert_eq!(ep.url, "/health");
/// ```
pub struct Counter(AtomicU64);

impl Counter {
   /// A counter starting at zero.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self(AtomicU64::new(0))
   }

   /// A counter starting at `value`.
   #[inline]
   #[must_use]
   pub const fn starting_at(value: u64) -> Self {
      Self(AtomicU64::new(value))
   }

   /// Current count. A snapshot; concurrent bumps may land immediately after.
   #[inline]
   pub fn value(&self) -> u64 {
      self.0.load(Ordering::Relaxed)
   }

   /// Adds one, returning the updated count.
   #[inline]
   pub fn bump(&self) -> u64 {
      self.0.fetch_add(1, Ordering::Relaxed) + 1
   }

   /// Adds `n`, returning the updated count.
   #[inline]
   pub fn bump_by(&self, n: u64) -> u64 {
      self.0.fetch_add(n, Ordering::Relaxed) + n
   }
}

impl Default for Counter {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl Clone for Counter {
   /// Clones the current count into an independent counter.
   #[inline]
   fn clone(&self) -> Self {
      Self::starting_at(self.value())
   }
}

impl fmt::Debug for Counter {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Counter").field(&self.value()).finish()
   }
}

impl From<u64> for Counter {
   #[inline]
   fn from(value: u64) -> Self {
      Self::starting_at(value)
   }
}
