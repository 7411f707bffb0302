//! A value computed on first access.
//!
//! [`Lazy<T, F>`] pairs a [`LazyCell`] with the initializer itself, fixed at
//! construction time. It is the shape to reach for when the computation is
//! known up front and the value should simply appear on first dereference,
//! typically in a `static`.

use core::cell::Cell;
use core::fmt;
use core::ops::Deref;

use crate::cell::LazyCell;
use crate::permit::Permit;

/// A lazily computed value with the initializer stored alongside it.
///
/// Dereferencing forces the computation; concurrent first dereferences run
/// the initializer exactly once, like [`LazyCell::get_or_init`].
///
/// Unlike the cell's fallible initialization, a `Lazy` whose initializer
/// panics is spent: the `FnOnce` is consumed by the attempt, and later
/// forcing panics. Use [`LazyCell::get_or_try_init`] directly when failed
/// attempts must be retryable.
///
/// # Examples
///
/// ```rust
/// use permit_once::Lazy;
///
/// static LOOKUP: Lazy<Vec<u32>> = Lazy::new(|| (0..64).map(|i| i * i).collect());
///
/// assert_eq!(LOOKUP[8], 64);
/// ```
pub struct Lazy<T, F = fn() -> T> {
   cell: LazyCell<T>,
   init: Cell<Option<F>>,
}

impl<T, F> Lazy<T, F> {
   /// Creates a new lazy value computed by `init`.
   #[inline]
   #[must_use]
   pub const fn new(init: F) -> Self {
      Self {
         cell: LazyCell::new(),
         init: Cell::new(Some(init)),
      }
   }

   /// Returns the value if it has already been forced. Never blocks.
   #[inline]
   pub fn get(this: &Self) -> Option<&T> {
      this.cell.get()
   }
}

impl<T, F: FnOnce() -> T> Lazy<T, F> {
   /// Takes the stored initializer and runs it. Only ever reached inside the
   /// cell's initialization critical section, so the slot can be empty solely
   /// after a previous attempt panicked the closure away.
   fn run_init(&self) -> T {
      match self.init.take() {
         Some(init) => init(),
         None => panic!("lazy value poisoned by an earlier initializer panic"),
      }
   }

   /// Forces the value, computing it if this is the first access.
   #[inline]
   pub fn force(this: &Self) -> &T {
      this.cell.get_or_init(|| this.run_init())
   }

   /// [`force`](Self::force), releasing `permit` while parked behind another
   /// thread's computation.
   #[inline]
   pub fn force_in<'a, P: Permit>(this: &'a Self, permit: &mut P) -> &'a T {
      this.cell.get_or_init_in(permit, || this.run_init())
   }
}

// SAFETY:
// Forcing from a shared reference may run `F` on any thread and hand the
// produced `T` to any thread; the cell's own bounds cover `T`, and `F: Send`
// covers moving the initializer execution across threads. The `Cell` holding
// the initializer is only touched inside the initialization critical section.
unsafe impl<T, F: Send> Sync for Lazy<T, F> where LazyCell<T>: Sync {}

impl<T, F: FnOnce() -> T> Deref for Lazy<T, F> {
   type Target = T;

   #[inline]
   fn deref(&self) -> &T {
      Self::force(self)
   }
}

impl<T: Default> Default for Lazy<T> {
   /// A lazy `T::default()`.
   #[inline]
   fn default() -> Self {
      Self::new(T::default)
   }
}

impl<T: fmt::Debug, F> fmt::Debug for Lazy<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Lazy");
      match Self::get(self) {
         Some(value) => d.field(value),
         None => d.field(&format_args!("<unforced>")),
      };
      d.finish()
   }
}
