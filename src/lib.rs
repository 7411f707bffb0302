//! Thread-safe lazy initialization that cooperates with a scheduling permit.
//!
//! The centerpiece is [`LazyCell<T>`]: a cell holding at most one value,
//! computed on first access by exactly one caller. Concurrent callers of an
//! empty cell race; the single winner runs the initializer, the losers park
//! (a real suspension, not a spin) until the result is published, and every
//! caller returns that same value for the lifetime of the cell. Reads of a
//! populated cell are lock-free.
//!
//! What sets these cells apart is the `*_in` method family: callers that hold
//! a *cooperative scheduling permit* - an interpreter attachment, a global
//! execution slot, any token other threads need to make progress - pass it
//! in, and the cell releases it for exactly the time the caller spends
//! parked. An initializer that itself needs the permit can therefore always
//! complete, where naive waiting would deadlock.
//!
//! # Types
//!
//! - [`LazyCell<T>`]: the core one-time-initialization cell.
//! - [`Lazy<T, F>`]: a cell with its initializer stored alongside, forced on
//!   first dereference.
//! - [`Permit`] / [`Slot`] / [`Attached`]: the permit abstraction and a
//!   ready-made single-slot model of it.
//! - [`Counter`]: a monotonic counter bumped through `&self`, for embedding
//!   in otherwise-frozen shared objects.
//! - [`BorrowCell<T>`]: runtime-checked shared/exclusive access that reports
//!   conflicts instead of corrupting or blocking.
//!
//! # Failure semantics
//!
//! A failed initialization does not poison a cell. When the initializer of
//! [`LazyCell::get_or_try_init`] returns `Err` (or panics), the cell resets
//! to empty, parked callers wake, and the next call races a fresh attempt.
//! Exactly-once is a property of the attempt that succeeds.
//!
//! # Examples
//!
//! ## One-time initialization under contention
//!
//! ```rust
//! use permit_once::LazyCell;
//!
//! static ENDPOINT: LazyCell<String> = LazyCell::new();
//!
//! // Whichever thread arrives first computes the value; the rest reuse it.
//! let url = ENDPOINT.get_or_init(|| format!("https://{}:{}", "localhost", 8080));
//! assert_eq!(url, "https://localhost:8080");
//! ```
//!
//! ## Waiting without holding the permit
//!
//! ```rust
//! use permit_once::{LazyCell, Slot};
//!
//! static SLOT: Slot = Slot::new();
//! static SHARED: LazyCell<u32> = LazyCell::new();
//!
//! let mut attached = SLOT.attach();
//! // If another thread were initializing, our attachment would be handed
//! // back for the duration of the wait - the initializer may need it.
//! let value = SHARED.get_or_init_in(&mut attached, || 42);
//! assert_eq!(*value, 42);
//! ```

/// Runtime-checked shared/exclusive access.
mod borrow;

/// The core lazy one-time initialization cell.
mod cell;

/// Monotonic counters for frozen shared objects.
mod counter;

/// Deref-forced lazy values.
mod lazy;

/// Cooperative scheduling permits.
mod permit;

/// Internal initialization state machine.
mod state;

pub use borrow::{BorrowCell, BorrowError, Exclusive, Shared};
pub use cell::LazyCell;
pub use counter::Counter;
pub use lazy::Lazy;
pub use permit::{Attached, Permit, Slot};
