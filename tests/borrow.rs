use std::sync::Arc;
use std::thread;

use permit_once::{BorrowCell, BorrowError};

#[test]
fn shared_borrows_coexist() {
   let cell = BorrowCell::new(vec![1, 2, 3]);

   let a = cell.try_borrow().unwrap();
   let b = cell.try_borrow().unwrap();
   assert_eq!(*a, vec![1, 2, 3]);
   assert_eq!(a.len(), b.len());
}

#[test]
fn writers_exclude_everyone() {
   let cell = BorrowCell::new(0u32);

   let writer = cell.try_borrow_mut().unwrap();
   assert_eq!(cell.try_borrow().unwrap_err(), BorrowError::Shared);
   assert_eq!(cell.try_borrow_mut().unwrap_err(), BorrowError::Exclusive);
   drop(writer);

   // Both kinds work again after release.
   assert!(cell.try_borrow().is_ok());
   assert!(cell.try_borrow_mut().is_ok());
}

#[test]
fn readers_exclude_writers() {
   let cell = BorrowCell::new(0u32);

   let reader = cell.try_borrow().unwrap();
   assert_eq!(cell.try_borrow_mut().unwrap_err(), BorrowError::Exclusive);
   drop(reader);
   assert!(cell.try_borrow_mut().is_ok());
}

#[test]
fn guards_release_on_every_drop() {
   let cell = BorrowCell::new(String::from("census"));

   for _ in 0..100 {
      let guard = cell.try_borrow().unwrap();
      assert_eq!(&*guard, "census");
   }
   let mut guard = cell.try_borrow_mut().unwrap();
   guard.push_str(" kept");
   drop(guard);
   assert_eq!(&*cell.try_borrow().unwrap(), "census kept");
}

#[test]
fn exclusive_ownership_bypasses_the_census() {
   let mut cell = BorrowCell::new(vec![1]);
   cell.get_mut().push(2);
   assert_eq!(cell.into_inner(), vec![1, 2]);
}

#[test]
fn conflicts_are_reported_across_threads() {
   let cell = Arc::new(BorrowCell::new(0u64));
   let reader = cell.try_borrow().unwrap();

   let outcome = {
      let cell = Arc::clone(&cell);
      thread::spawn(move || cell.try_borrow_mut().err())
         .join()
         .unwrap()
   };
   assert_eq!(outcome, Some(BorrowError::Exclusive));
   drop(reader);

   let outcome = {
      let cell = Arc::clone(&cell);
      thread::spawn(move || cell.try_borrow_mut().is_ok())
         .join()
         .unwrap()
   };
   assert!(outcome);
}

#[test]
fn writes_are_visible_to_later_readers() {
   let cell = Arc::new(BorrowCell::new(Vec::new()));

   let writers: Vec<_> = (0..8)
      .map(|i| {
         let cell = Arc::clone(&cell);
         thread::spawn(move || {
            // Contended writers retry; each write happens alone.
            loop {
               if let Ok(mut guard) = cell.try_borrow_mut() {
                  guard.push(i);
                  return;
               }
               thread::yield_now();
            }
         })
      })
      .collect();

   for writer in writers {
      writer.join().unwrap();
   }

   let seen = cell.try_borrow().unwrap();
   assert_eq!(seen.len(), 8);
   let mut sorted = seen.clone();
   sorted.sort_unstable();
   assert_eq!(sorted, (0..8).collect::<Vec<_>>());
}

#[test]
fn error_messages_name_the_conflict() {
   assert_eq!(
      BorrowError::Shared.to_string(),
      "value is exclusively borrowed"
   );
   assert_eq!(BorrowError::Exclusive.to_string(), "value is already borrowed");
}

#[test]
fn debug_renders_through_a_shared_borrow() {
   let cell = BorrowCell::new(5);
   assert_eq!(format!("{cell:?}"), "BorrowCell(5)");

   let _writer = cell.try_borrow_mut().unwrap();
   assert_eq!(format!("{cell:?}"), "BorrowCell(<exclusively borrowed>)");
}
