//! Cooperative scheduling permits.
//!
//! Some environments hand each running thread a token it must hold while
//! touching shared runtime state: an interpreter attachment, a reactor slot,
//! a single global execution lock. The cardinal rule for such a token is to
//! never sleep while holding it, because the thread that would wake you may
//! need the token to make progress.
//!
//! [`Permit`] captures that rule as a trait: anything that can step aside for
//! the duration of a closure and take its place back afterwards. The `*_in`
//! methods on [`LazyCell`](crate::LazyCell) accept a permit and release it
//! around every suspension, so a parked waiter cannot starve the initializer
//! it is waiting on.
//!
//! [`Slot`] is a ready-made single-permit model, useful on its own and in
//! tests: one shared execution slot, occupied by at most one thread at a
//! time, with RAII attachment.

use parking_lot::{Mutex, MutexGuard};

/// A token whose holder must step aside while blocked.
pub trait Permit {
   /// Runs `op` with the permit released, reacquiring it before returning.
   ///
   /// Reacquisition may block until the permit is free again.
   fn released<R>(&mut self, op: impl FnOnce() -> R) -> R;
}

/// The absence of a permit: `released` runs the operation unchanged.
impl Permit for () {
   #[inline]
   fn released<R>(&mut self, op: impl FnOnce() -> R) -> R {
      op()
   }
}

/// A single cooperative execution slot shared by a group of threads.
///
/// At most one thread is attached at a time; everything modeled as requiring
/// the permit must be done while attached. Detach-and-reattach around blocking
/// waits comes for free through [`Attached`]'s [`Permit`] implementation.
///
/// # Examples
///
/// ```rust
/// use permit_once::{LazyCell, Slot};
///
/// static SLOT: Slot = Slot::new();
/// static VALUE: LazyCell<u32> = LazyCell::new();
///
/// let mut attached = SLOT.attach();
/// // Were another thread initializing right now, our attachment would be
/// // released while we wait for its result.
/// let v = VALUE.get_or_init_in(&mut attached, || 7);
/// assert_eq!(*v, 7);
/// ```
pub struct Slot {
   inner: Mutex<()>,
}

impl Slot {
   /// Creates a new, unoccupied slot.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         inner: Mutex::new(()),
      }
   }

   /// Blocks until the slot is free, then attaches the calling thread.
   #[inline]
   pub fn attach(&self) -> Attached<'_> {
      Attached {
         slot: self,
         guard: Some(self.inner.lock()),
      }
   }

   /// Attaches without blocking.
   ///
   /// Returns `None` if another thread currently occupies the slot.
   #[inline]
   pub fn try_attach(&self) -> Option<Attached<'_>> {
      self.inner.try_lock().map(|guard| Attached {
         slot: self,
         guard: Some(guard),
      })
   }
}

impl Default for Slot {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl core::fmt::Debug for Slot {
   fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
      f.debug_struct("Slot")
         .field("occupied", &self.inner.is_locked())
         .finish()
   }
}

/// Proof that the calling thread currently occupies a [`Slot`].
///
/// Dropping detaches. The [`Permit`] implementation detaches for the duration
/// of the wrapped operation and blocks to reattach before returning, on every
/// exit path of the operation's enclosing call.
pub struct Attached<'s> {
   slot: &'s Slot,
   guard: Option<MutexGuard<'s, ()>>,
}

impl Permit for Attached<'_> {
   fn released<R>(&mut self, op: impl FnOnce() -> R) -> R {
      drop(self.guard.take());
      let out = op();
      self.guard = Some(self.slot.inner.lock());
      out
   }
}
