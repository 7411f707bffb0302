use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use permit_once::{LazyCell, Permit, Slot};

#[test]
fn unit_permit_is_the_identity() {
   let mut none = ();
   assert_eq!(none.released(|| 5), 5);
}

#[test]
fn released_frees_the_slot_for_the_duration() {
   let slot = Slot::new();
   let mut attached = slot.attach();

   // Occupied while attached...
   assert!(slot.try_attach().is_none());

   attached.released(|| {
      // ...free inside the released section...
      let reattach = slot.try_attach();
      assert!(reattach.is_some());
   });

   // ...and reacquired on the way out.
   assert!(slot.try_attach().is_none());
   drop(attached);
   assert!(slot.try_attach().is_some());
}

#[test]
fn attach_blocks_until_the_slot_frees() {
   let slot = Arc::new(Slot::new());
   let held = slot.attach();

   let waiter = {
      let slot = Arc::clone(&slot);
      thread::spawn(move || {
         let _attached = slot.attach();
         true
      })
   };

   thread::sleep(Duration::from_millis(20));
   assert!(!waiter.is_finished());

   drop(held);
   assert!(waiter.join().unwrap());
}

#[test]
fn get_or_init_in_reacquires_after_the_fast_path() {
   let slot = Slot::new();
   let cell = LazyCell::with_value(7);

   let mut attached = slot.attach();
   let value = cell.get_or_init_in(&mut attached, || unreachable!());
   assert_eq!(*value, 7);
   // Still attached after returning.
   assert!(slot.try_attach().is_none());
}

#[test]
fn winner_keeps_the_permit_while_initializing() {
   let slot = Slot::new();
   let cell: LazyCell<u32> = LazyCell::new();

   let mut attached = slot.attach();
   let value = cell.get_or_init_in(&mut attached, || {
      // No waiting happened, so the attachment was never given up.
      assert!(slot.try_attach().is_none());
      42
   });
   assert_eq!(*value, 42);
}

#[test]
fn parked_waiter_releases_the_slot_the_initializer_needs() {
   // The deadlock scenario: the race winner's initializer must attach to the
   // slot, while the losing caller already holds the slot when it starts to
   // wait. Without release-while-parked this cannot terminate.
   let slot = Arc::new(Slot::new());
   let cell = Arc::new(LazyCell::new());
   let init_running = Arc::new(AtomicBool::new(false));
   let init_runs = Arc::new(AtomicUsize::new(0));

   let winner = {
      let slot = Arc::clone(&slot);
      let cell = Arc::clone(&cell);
      let init_running = Arc::clone(&init_running);
      let init_runs = Arc::clone(&init_runs);
      thread::spawn(move || {
         *cell.get_or_init(|| {
            init_runs.fetch_add(1, Ordering::SeqCst);
            init_running.store(true, Ordering::SeqCst);
            // Give the other caller time to attach and park.
            thread::sleep(Duration::from_millis(100));
            let _attached = slot.attach();
            42
         })
      })
   };

   let waiter = {
      let slot = Arc::clone(&slot);
      let cell = Arc::clone(&cell);
      let init_running = Arc::clone(&init_running);
      let init_runs = Arc::clone(&init_runs);
      thread::spawn(move || {
         // Enter the race only after the winner owns it.
         while !init_running.load(Ordering::SeqCst) {
            thread::yield_now();
         }
         let mut attached = slot.attach();
         let value = *cell.get_or_init_in(&mut attached, || {
            init_runs.fetch_add(1, Ordering::SeqCst);
            7
         });
         // The wait ended with the slot reattached.
         assert!(slot.try_attach().is_none());
         value
      })
   };

   assert_eq!(winner.join().unwrap(), 42);
   assert_eq!(waiter.join().unwrap(), 42);
   assert_eq!(init_runs.load(Ordering::SeqCst), 1);
   assert_eq!(cell.get(), Some(&42));
}

#[test]
fn fallible_initialization_with_a_permit() {
   let slot = Slot::new();
   let cell: LazyCell<u32> = LazyCell::new();
   let mut attached = slot.attach();

   let result = cell.get_or_try_init_in(&mut attached, || Err::<u32, _>("nope"));
   assert_eq!(result, Err("nope"));
   assert!(!cell.is_initialized());

   let result = cell.get_or_try_init_in(&mut attached, || Ok::<_, &str>(11));
   assert_eq!(result, Ok(&11));
   assert!(slot.try_attach().is_none());
}
