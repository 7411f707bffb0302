//! Runtime-checked shared/exclusive access.
//!
//! [`BorrowCell<T>`] enforces the exclusive-at-any-instant rule at the point
//! of access instead of at compile time: a live census of borrows is kept in
//! a single atomic, and a request that conflicts with it comes back as an
//! [`Err`] - never a block, never a panic, never a data race. Useful where
//! shared mutable state crosses a boundary the borrow checker cannot see
//! through, and the state is too rich for a plain atomic.

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

/// High bit of the census word marks a live exclusive borrow; the low bits
/// count live shared borrows.
const WRITER: usize = !(usize::MAX >> 1);

/// Error returned when a borrow request conflicts with a live borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowError {
   /// A shared borrow was refused: an exclusive borrow is live.
   Shared,
   /// An exclusive borrow was refused: some borrow is live.
   Exclusive,
}

impl fmt::Display for BorrowError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Shared => f.write_str("value is exclusively borrowed"),
         Self::Exclusive => f.write_str("value is already borrowed"),
      }
   }
}

impl std::error::Error for BorrowError {}

/// An interior-mutability cell that checks borrows at access time.
///
/// Conflicting concurrent access is reported, not blocked on: both borrow
/// methods return immediately, with a guard on success and a [`BorrowError`]
/// on conflict. Guards release their claim on drop.
///
/// For state as simple as a counter or a flag, prefer an atomic (for
/// instance [`Counter`](crate::Counter)) and skip the census entirely.
///
/// # Examples
///
/// ```rust
/// use permit_once::BorrowCell;
///
/// let cell = BorrowCell::new(vec![1, 2, 3]);
///
/// {
///    let a = cell.try_borrow().unwrap();
///    let b = cell.try_borrow().unwrap();          // shared borrows coexist
///    assert!(cell.try_borrow_mut().is_err());     // but exclude writers
///    assert_eq!(a.len() + b.len(), 6);
/// }
///
/// cell.try_borrow_mut().unwrap().push(4);         // all guards dropped
/// assert_eq!(cell.try_borrow().unwrap().len(), 4);
/// ```
pub struct BorrowCell<T> {
   census: AtomicUsize,
   value: UnsafeCell<T>,
}

impl<T> BorrowCell<T> {
   /// Creates a cell owning `value`.
   #[inline]
   #[must_use]
   pub const fn new(value: T) -> Self {
      Self {
         census: AtomicUsize::new(0),
         value: UnsafeCell::new(value),
      }
   }

   /// Consumes the cell, returning the value.
   #[inline]
   pub fn into_inner(self) -> T {
      self.value.into_inner()
   }

   /// Direct access through exclusive ownership; the census is not consulted
   /// because `&mut self` already proves no guard is live.
   #[inline]
   pub fn get_mut(&mut self) -> &mut T {
      self.value.get_mut()
   }

   /// Requests a shared borrow.
   ///
   /// Succeeds alongside any number of live shared borrows; fails while an
   /// exclusive borrow is live.
   pub fn try_borrow(&self) -> Result<Shared<'_, T>, BorrowError> {
      let mut seen = self.census.load(Ordering::Relaxed);
      loop {
         if seen & WRITER != 0 {
            return Err(BorrowError::Shared);
         }
         match self.census.compare_exchange_weak(
            seen,
            seen + 1,
            Ordering::Acquire,
            Ordering::Relaxed,
         ) {
            Ok(_) => return Ok(Shared { cell: self }),
            Err(actual) => seen = actual,
         }
      }
   }

   /// Requests an exclusive borrow.
   ///
   /// Succeeds only when no borrow of either kind is live.
   pub fn try_borrow_mut(&self) -> Result<Exclusive<'_, T>, BorrowError> {
      match self
         .census
         .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
      {
         Ok(_) => Ok(Exclusive { cell: self }),
         Err(_) => Err(BorrowError::Exclusive),
      }
   }
}

// SAFETY:
// The census serializes exclusive access and keeps readers out while a writer
// is live, so sharing the cell shares `&T` (needs `T: Sync`) and may hand an
// `&mut T` to another thread (needs `T: Send`).
unsafe impl<T: Send + Sync> Sync for BorrowCell<T> {}
// SAFETY: moving the cell moves the owned `T`.
unsafe impl<T: Send> Send for BorrowCell<T> {}

impl<T: Default> Default for BorrowCell<T> {
   #[inline]
   fn default() -> Self {
      Self::new(T::default())
   }
}

impl<T> From<T> for BorrowCell<T> {
   #[inline]
   fn from(value: T) -> Self {
      Self::new(value)
   }
}

impl<T: fmt::Debug> fmt::Debug for BorrowCell<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("BorrowCell");
      match self.try_borrow() {
         Ok(value) => d.field(&*value),
         Err(_) => d.field(&format_args!("<exclusively borrowed>")),
      };
      d.finish()
   }
}

/// A live shared borrow of a [`BorrowCell`].
pub struct Shared<'b, T> {
   cell: &'b BorrowCell<T>,
}

impl<T> Deref for Shared<'_, T> {
   type Target = T;

   #[inline]
   fn deref(&self) -> &T {
      // SAFETY: the census holds our reader claim; no exclusive borrow can
      // exist until it is returned.
      unsafe { &*self.cell.value.get() }
   }
}

impl<T> Drop for Shared<'_, T> {
   #[inline]
   fn drop(&mut self) {
      self.cell.census.fetch_sub(1, Ordering::Release);
   }
}

impl<T: fmt::Debug> fmt::Debug for Shared<'_, T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Debug::fmt(&**self, f)
   }
}

/// A live exclusive borrow of a [`BorrowCell`].
pub struct Exclusive<'b, T> {
   cell: &'b BorrowCell<T>,
}

impl<T> Deref for Exclusive<'_, T> {
   type Target = T;

   #[inline]
   fn deref(&self) -> &T {
      // SAFETY: the census holds the writer claim; we are the only borrow.
      unsafe { &*self.cell.value.get() }
   }
}

impl<T> DerefMut for Exclusive<'_, T> {
   #[inline]
   fn deref_mut(&mut self) -> &mut T {
      // SAFETY: as in deref, and `&mut self` keeps this reference unique.
      unsafe { &mut *self.cell.value.get() }
   }
}

impl<T> Drop for Exclusive<'_, T> {
   #[inline]
   fn drop(&mut self) {
      self.cell.census.store(0, Ordering::Release);
   }
}

impl<T: fmt::Debug> fmt::Debug for Exclusive<'_, T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Debug::fmt(&**self, f)
   }
}
