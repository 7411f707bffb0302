//! Initialization state tracking shared by the cell types.
//!
//! Every lazy cell carries one [`InitState`]: a packed `AtomicU8` combined
//! with `parking_lot_core`'s futex-style parking for threads that lose the
//! initialization race. The layout:
//! - Bit 0: READY - the slot holds a fully constructed value
//! - Bit 1: BUSY - one thread owns the initialization critical section
//! - Bit 2: PARKED - at least one thread is parked on this state
//! - Bits 3-7: generation counter, bumped on every publish or reset so a
//!   parked thread never confuses two distinct initialization attempts
//!
//! Reads of a populated cell never touch the parking layer; losers of the
//! race park instead of spinning, and may release a cooperative scheduling
//! permit for exactly the duration of each park via [`InitState::acquire_in`].

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

use crate::permit::Permit;

/// Packed initialization state for a lazy cell.
#[repr(transparent)]
pub(crate) struct InitState(AtomicU8);

/// Outcome of a single, non-parking acquisition attempt.
enum Claim<'a> {
   /// The slot already holds a value.
   Ready,
   /// The caller now owns the initialization critical section.
   Owned(InitGuard<'a>),
   /// Another thread owns it; carries the state observed at that moment so
   /// the caller can park against exactly that state.
   Contended(u8),
}

impl InitState {
   /// Bit flag: the slot holds a fully constructed value.
   const READY: u8 = 1;
   /// Bit flag: one thread owns the initialization critical section.
   const BUSY: u8 = 2;
   /// Bit flag: at least one thread is parked waiting for the outcome.
   const PARKED: u8 = 4;
   /// Smallest generation increment.
   const GEN_ONE: u8 = 8;
   /// Mask covering the generation bits.
   const GEN_MASK: u8 = !(Self::READY | Self::BUSY | Self::PARKED);

   /// Next generation value given the current state.
   #[inline(always)]
   const fn next_generation(state: u8) -> u8 {
      (state & Self::GEN_MASK).wrapping_add(Self::GEN_ONE) & Self::GEN_MASK
   }

   /// State of an empty cell.
   #[inline]
   pub(crate) const fn empty() -> Self {
      Self(AtomicU8::new(0))
   }

   /// State of a cell constructed with a value already in place.
   #[inline]
   pub(crate) const fn populated() -> Self {
      Self(AtomicU8::new(Self::READY))
   }

   /// Whether the slot holds a value.
   ///
   /// An Acquire load pairs with the Release swap in [`publish`](Self::publish):
   /// any caller that observes READY also observes the writes that constructed
   /// the value.
   #[inline]
   pub(crate) fn is_ready(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::READY != 0
   }

   /// Wakes every thread parked on this state.
   #[inline]
   fn wake_all(&self) {
      // SAFETY: the key is the address of our own atomic, the same address
      // `park` uses below.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread until the state moves away from `seen`.
   #[inline]
   fn park(&self, seen: u8) {
      // SAFETY: same key discipline as `wake_all`.
      unsafe {
         // The validate closure runs with the parking-lot bucket held, so a
         // wakeup between our last load and going to sleep cannot be lost:
         // if the state already changed we never sleep at all.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == seen,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
         // Spurious wakeups are fine; every caller loops and re-claims.
      }
   }

   /// Marks the slot populated, bumps the generation and wakes parked threads.
   /// Returns `true` if the slot was not already READY.
   #[inline]
   pub(crate) fn publish(&self) -> bool {
      let seen = self.0.load(Ordering::Relaxed);
      let next = Self::READY | Self::next_generation(seen);

      // Release: the value write in the owning cell happens-before any
      // Acquire load that observes READY.
      let prev = self.0.swap(next, Ordering::Release);

      if prev & Self::PARKED != 0 {
         self.wake_all();
      }
      prev & Self::READY == 0
   }

   /// Resets the slot to empty, bumps the generation and wakes parked
   /// threads. Returns `true` if the slot was READY.
   ///
   /// Waking on reset is what turns a failed initialization attempt into a
   /// fresh race instead of a stuck parking lot: every waiter re-claims and
   /// one of them becomes the next owner.
   #[inline]
   pub(crate) fn reset(&self) -> bool {
      let seen = self.0.load(Ordering::Relaxed);
      let next = Self::next_generation(seen);

      let prev = self.0.swap(next, Ordering::Release);

      if prev & Self::PARKED != 0 {
         self.wake_all();
      }
      prev & Self::READY != 0
   }

   /// One acquisition attempt, never parking.
   ///
   /// `may_park` controls whether the PARKED flag is raised on contention;
   /// callers that will not park must not raise it.
   #[inline]
   fn claim(&self, may_park: bool) -> Claim<'_> {
      loop {
         let seen = self.0.load(Ordering::Acquire);
         if seen & Self::READY != 0 {
            return Claim::Ready;
         }

         if seen & Self::BUSY == 0 {
            match self.0.compare_exchange_weak(
               seen,
               seen | Self::BUSY,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Claim::Owned(InitGuard::new(self)),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if may_park && seen & Self::PARKED == 0 {
            match self.0.compare_exchange_weak(
               seen,
               seen | Self::PARKED,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               // Park against the state we just wrote, not the stale one.
               Ok(_) => return Claim::Contended(seen | Self::PARKED),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         return Claim::Contended(seen);
      }
   }

   /// Shared driver for the blocking acquisitions: claims in a loop, handing
   /// the observed state to `wait` whenever the section is owned elsewhere.
   #[inline]
   fn acquire_with(&self, mut wait: impl FnMut(u8)) -> Option<InitGuard<'_>> {
      loop {
         match self.claim(true) {
            Claim::Ready => return None,
            Claim::Owned(guard) => return Some(guard),
            Claim::Contended(seen) => wait(seen),
         }
      }
   }

   /// Acquires the initialization critical section, parking if necessary.
   ///
   /// `Some(guard)` means the caller must initialize; `None` means another
   /// thread published a value while we waited.
   #[inline]
   pub(crate) fn acquire(&self) -> Option<InitGuard<'_>> {
      self.acquire_with(|seen| self.park(seen))
   }

   /// Like [`acquire`](Self::acquire), but releases `permit` for the duration
   /// of every park and reacquires it before returning.
   ///
   /// The release happens only around the suspension itself. A caller that
   /// wins the race keeps its permit while running the initializer.
   #[inline]
   pub(crate) fn acquire_in<P: Permit>(&self, permit: &mut P) -> Option<InitGuard<'_>> {
      self.acquire_with(|seen| permit.released(|| self.park(seen)))
   }

   /// Acquires the initialization critical section from an async task.
   ///
   /// Yields to the runtime a bounded number of times first; on a
   /// multi-threaded runtime it then parks inside `block_in_place` so the
   /// worker thread is surrendered rather than blocked.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub(crate) async fn acquire_async(&self) -> Option<InitGuard<'_>> {
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            match self.claim(true) {
               Claim::Ready => return None,
               Claim::Owned(guard) => return Some(guard),
               Claim::Contended(seen) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != seen {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            return match self.claim(true) {
               Claim::Ready => None,
               Claim::Owned(guard) => Some(guard),
               Claim::Contended(seen) => tokio::task::block_in_place(|| {
                  self.park(seen);
                  self.acquire()
               }),
            };
         }
      }
   }

   /// Attempts to acquire without parking.
   ///
   /// `None` both when the slot is populated and when the section is owned by
   /// another thread.
   #[inline]
   pub(crate) fn try_acquire(&self) -> Option<InitGuard<'_>> {
      match self.claim(false) {
         Claim::Owned(guard) => Some(guard),
         Claim::Ready | Claim::Contended(_) => None,
      }
   }
}

/// RAII ownership of the initialization critical section.
///
/// Call [`finish`](Self::finish) after writing the value to publish it.
/// Dropping the guard instead means the initializer failed or panicked: the
/// state resets to empty and parked threads wake to race again.
pub(crate) struct InitGuard<'a> {
   state: &'a InitState,
}

impl<'a> InitGuard<'a> {
   /// The BUSY flag must already be set on `state`.
   #[inline(always)]
   const fn new(state: &'a InitState) -> Self {
      Self { state }
   }

   /// Publishes the value written under this guard and wakes parked threads.
   /// Returns `true` if the slot was not already READY.
   #[inline(always)]
   pub(crate) fn finish(self) -> bool {
      let fresh = self.state.publish();
      mem::forget(self); // Drop would reset the state we just published.
      fresh
   }
}

impl Drop for InitGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.reset();
   }
}
