use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use permit_once::{Lazy, Slot};

#[test]
fn deref_forces_exactly_once() {
   static RUNS: AtomicUsize = AtomicUsize::new(0);
   static SQUARES: Lazy<Vec<usize>> = Lazy::new(|| {
      RUNS.fetch_add(1, Ordering::SeqCst);
      (0..32).map(|i| i * i).collect()
   });

   assert_eq!(Lazy::get(&SQUARES), None);
   assert_eq!(SQUARES[5], 25);
   assert_eq!(SQUARES.len(), 32);
   assert_eq!(Lazy::get(&SQUARES).map(Vec::len), Some(32));
   assert_eq!(RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_forcing_runs_the_initializer_once() {
   static RUNS: AtomicUsize = AtomicUsize::new(0);
   static VALUE: Lazy<u64> = Lazy::new(|| {
      RUNS.fetch_add(1, Ordering::SeqCst);
      thread::sleep(std::time::Duration::from_millis(10));
      41 + 1
   });

   let forcers: Vec<_> = (0..8)
      .map(|_| thread::spawn(|| *Lazy::force(&VALUE)))
      .collect();

   for forcer in forcers {
      assert_eq!(forcer.join().unwrap(), 42);
   }
   assert_eq!(RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn force_in_keeps_the_attachment() {
   static SLOT: Slot = Slot::new();
   static VALUE: Lazy<u32> = Lazy::new(|| 9);

   let mut attached = SLOT.attach();
   assert_eq!(*Lazy::force_in(&VALUE, &mut attached), 9);
   assert!(SLOT.try_attach().is_none());
   drop(attached);
   assert!(SLOT.try_attach().is_some());
}

#[test]
fn default_is_a_lazy_default() {
   let lazy: Lazy<Vec<i32>> = Lazy::default();
   assert!(Lazy::get(&lazy).is_none());
   assert!(lazy.is_empty());
   assert!(Lazy::get(&lazy).is_some());
}

#[test]
fn debug_shows_forcing_state() {
   let lazy: Lazy<i32> = Lazy::new(|| 3);
   assert_eq!(format!("{lazy:?}"), "Lazy(<unforced>)");
   Lazy::force(&lazy);
   assert_eq!(format!("{lazy:?}"), "Lazy(3)");
}
