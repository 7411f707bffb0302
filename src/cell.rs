//! The core lazy one-time initialization cell.
//!
//! [`LazyCell<T>`] holds at most one value of `T`, computed on first access by
//! exactly one caller. Concurrent callers that find the cell empty race for
//! the initialization critical section; the single winner runs the
//! initializer, everyone else parks until the result is published and then
//! returns that same result. Once populated, reads are lock-free and never
//! suspend.
//!
//! Failed initialization does not poison the cell: if the initializer returns
//! an error or panics, the cell goes back to empty and the next call starts a
//! fresh attempt. Exactly-once applies to the attempt that succeeds.
//!
//! The `*_in` methods take a [`Permit`] and release it for exactly the time
//! the caller spends parked, which keeps a waiting holder of a global
//! execution permit from deadlocking the initializer that needs it.

use core::cell::UnsafeCell;
use core::{fmt, mem};

use crate::permit::Permit;
use crate::state::{InitGuard, InitState};

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;

/// A thread-safe cell holding at most one lazily computed value.
///
/// Safe to share freely: the populated state is terminal, so every caller
/// observes the same value for the lifetime of the cell, and no caller ever
/// observes a partially constructed one.
///
/// # Examples
///
/// ```rust
/// use permit_once::LazyCell;
///
/// static CONFIG: LazyCell<String> = LazyCell::new();
///
/// // Computed by whichever caller gets here first, exactly once.
/// let cfg = CONFIG.get_or_init(|| "production".to_string());
/// assert_eq!(cfg, "production");
/// assert_eq!(CONFIG.get(), Some(&"production".to_string()));
/// ```
pub struct LazyCell<T> {
   slot: UnsafeCell<mem::MaybeUninit<T>>,
   state: InitState,
}

impl<T> LazyCell<T> {
   /// Creates a new, empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: InitState::empty(),
         slot: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a cell already populated with `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         state: InitState::populated(),
         slot: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Whether the cell holds a value. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.state.is_ready()
   }

   /// Returns the value if the cell is populated. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_initialized() {
         // SAFETY: is_initialized() observed READY with Acquire ordering.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Returns the value mutably if the cell is populated. Never blocks.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      if self.is_initialized() {
         // SAFETY: populated, and `&mut self` gives exclusive access.
         Some(unsafe { self.get_unchecked_mut() })
      } else {
         None
      }
   }

   /// Populates the cell with `value` unless it already holds one.
   ///
   /// Blocks if another thread is mid-initialization. On return the cell is
   /// guaranteed populated, though not necessarily with `value`: `Err(value)`
   /// hands the argument back when someone else got there first.
   #[inline]
   pub fn set(&self, value: T) -> Result<(), T> {
      let mut unused = Some(value);
      self.get_or_init(|| match unused.take() {
         Some(value) => value,
         // The closure runs at most once per call; the option is always full.
         None => unreachable!("set initializer ran twice"),
      });
      match unused {
         None => Ok(()),
         Some(value) => Err(value),
      }
   }

   /// Populates the cell with `value` without blocking.
   ///
   /// Fails both when the cell already holds a value and when another thread
   /// currently owns the initialization critical section.
   #[inline]
   pub fn try_set(&self, value: T) -> Result<&T, T> {
      let Some(guard) = self.state.try_acquire() else {
         return Err(value);
      };
      // SAFETY: the guard grants exclusive write access to the slot.
      let stored = unsafe { (*self.slot.get()).write(value) };
      guard.finish();
      Ok(stored)
   }

   /// Takes the value out, leaving the cell empty.
   ///
   /// Requires exclusive access, so it never blocks and never races.
   #[inline]
   pub fn take(&mut self) -> Option<T> {
      if self.state.reset() {
         // SAFETY: reset() returning true proves the slot was populated; the
         // state is empty again so nothing else will read the moved-out value,
         // and `&mut self` rules out concurrent access entirely.
         Some(unsafe { (*self.slot.get()).assume_init_read() })
      } else {
         None
      }
   }

   /// Returns the value, computing it with `f` if the cell is empty.
   ///
   /// Among concurrent callers of an empty cell exactly one runs `f`; the
   /// rest park until the result is published and return it. Populated cells
   /// answer on the lock-free fast path.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      if let Some(guard) = self.state.acquire() {
         self.init_once(guard, f);
      }
      // SAFETY: either init_once published above, or acquire() returned None
      // because another thread published first.
      unsafe { self.get_unchecked() }
   }

   /// [`get_or_init`](Self::get_or_init), releasing `permit` while parked.
   ///
   /// Identical semantics, with one addition: whenever this caller has to
   /// suspend for another thread's initializer, `permit` is released for the
   /// duration of the suspension and reacquired before this method returns.
   /// A caller that wins the race keeps the permit while running `f`.
   #[inline]
   pub fn get_or_init_in<P, F>(&self, permit: &mut P, f: F) -> &T
   where
      P: Permit,
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      if let Some(guard) = self.state.acquire_in(permit) {
         self.init_once(guard, f);
      }
      // SAFETY: as in get_or_init.
      unsafe { self.get_unchecked() }
   }

   /// Returns the value, computing it with a fallible `f` if the cell is empty.
   ///
   /// On `Err` the error reaches the caller unwrapped and the cell stays
   /// empty; parked threads wake and race over the next attempt. Nothing
   /// about the failure is cached.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      if let Some(guard) = self.state.acquire() {
         self.try_init_once(guard, f)?;
      }
      debug_assert!(self.is_initialized());
      // SAFETY: published by us just above or by the thread we waited on.
      Ok(unsafe { self.get_unchecked() })
   }

   /// [`get_or_try_init`](Self::get_or_try_init), releasing `permit` while
   /// parked.
   pub fn get_or_try_init_in<P, F, E>(&self, permit: &mut P, f: F) -> Result<&T, E>
   where
      P: Permit,
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      if let Some(guard) = self.state.acquire_in(permit) {
         self.try_init_once(guard, f)?;
      }
      debug_assert!(self.is_initialized());
      // SAFETY: as in get_or_try_init.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Returns the value, computing it with an async `f` if the cell is empty.
   ///
   /// Waiting yields to the runtime rather than blocking the worker thread
   /// where possible; see the crate features for the runtime requirements.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      if let Some(value) = self.get() {
         return value;
      }
      if let Some(guard) = self.state.acquire_async().await {
         let value = f().await;
         // SAFETY: the guard grants exclusive write access to the slot.
         unsafe { (*self.slot.get()).write(value) };
         guard.finish();
      }
      // SAFETY: as in get_or_init.
      unsafe { self.get_unchecked() }
   }

   /// Async [`get_or_try_init`](Self::get_or_try_init): on `Err` the cell
   /// stays empty and the error propagates to the caller.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      if let Some(guard) = self.state.acquire_async().await {
         let value = f().await?; // guard drop reopens the cell on Err
         // SAFETY: the guard grants exclusive write access to the slot.
         unsafe { (*self.slot.get()).write(value) };
         guard.finish();
      }
      debug_assert!(self.is_initialized());
      // SAFETY: as in get_or_try_init.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Returns the value without checking that the cell is populated.
   ///
   /// # Safety
   ///
   /// The cell must be populated; calling this on an empty `LazyCell` is
   /// undefined behavior.
   #[inline]
   pub unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized());
      // SAFETY: the caller guarantees the slot is populated.
      unsafe { (*self.slot.get()).assume_init_ref() }
   }

   /// Mutable [`get_unchecked`](Self::get_unchecked).
   ///
   /// # Safety
   ///
   /// The cell must be populated; calling this on an empty `LazyCell` is
   /// undefined behavior.
   #[inline]
   pub unsafe fn get_unchecked_mut(&mut self) -> &mut T {
      debug_assert!(self.is_initialized());
      // SAFETY: the caller guarantees the slot is populated, and `&mut self`
      // gives exclusive access.
      unsafe { (*self.slot.get()).assume_init_mut() }
   }

   // --- Internal initialization helpers ---

   /// Runs `f` inside the acquired critical section and publishes its result.
   #[cold]
   fn init_once<F>(&self, guard: InitGuard<'_>, f: F)
   where
      F: FnOnce() -> T,
   {
      let value = f();
      // SAFETY: the guard grants exclusive write access to the slot.
      unsafe { (*self.slot.get()).write(value) };
      guard.finish();
   }

   /// Fallible [`init_once`](Self::init_once). On `Err` the guard drop
   /// reopens the cell for the next attempt.
   #[cold]
   fn try_init_once<F, E>(&self, guard: InitGuard<'_>, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let value = f()?;
      // SAFETY: the guard grants exclusive write access to the slot.
      unsafe { (*self.slot.get()).write(value) };
      guard.finish();
      Ok(())
   }
}

// --- Trait implementations ---

// SAFETY:
// Sharing a `LazyCell<T>` shares `&T` once populated, so `T: Sync` is
// required; `T: Send` as well, because the thread that stores the value and
// the thread that drops the cell may differ.
unsafe impl<T: Sync + Send> Sync for LazyCell<T> {}
// SAFETY:
// Moving the cell moves the owned `T`, so `T: Send` suffices.
unsafe impl<T: Send> Send for LazyCell<T> {}

impl<T> Default for LazyCell<T> {
   /// Equivalent to [`LazyCell::new`].
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T> From<T> for LazyCell<T> {
   /// Equivalent to [`LazyCell::with_value`].
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T: fmt::Debug> fmt::Debug for LazyCell<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("LazyCell");
      match self.get() {
         Some(value) => d.field(value),
         None => d.field(&format_args!("<empty>")),
      };
      d.finish()
   }
}

impl<T: Clone> Clone for LazyCell<T> {
   /// Clones the current contents: a populated clone of a populated cell, an
   /// empty clone of an empty one. The clones are fully independent.
   #[inline]
   fn clone(&self) -> Self {
      match self.get() {
         Some(value) => Self::with_value(value.clone()),
         None => Self::new(),
      }
   }
}

impl<T: PartialEq> PartialEq for LazyCell<T> {
   /// Two cells are equal when both are empty or both hold equal values.
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      self.get() == other.get()
   }
}

impl<T: Eq> Eq for LazyCell<T> {}

impl<T> Drop for LazyCell<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_initialized() {
         // SAFETY: populated, exclusive access, and nothing reads the slot
         // after drop.
         unsafe { self.slot.get_mut().assume_init_drop() };
      }
   }
}
