use std::sync::Arc;
use std::thread;

use permit_once::Counter;

#[test]
fn starts_where_told() {
   assert_eq!(Counter::new().value(), 0);
   assert_eq!(Counter::starting_at(10).value(), 10);
   assert_eq!(Counter::from(3).value(), 3);
   assert_eq!(Counter::default().value(), 0);
}

#[test]
fn bump_returns_the_updated_count() {
   let counter = Counter::new();
   assert_eq!(counter.bump(), 1);
   assert_eq!(counter.bump(), 2);
   assert_eq!(counter.bump_by(10), 12);
   assert_eq!(counter.value(), 12);
}

#[test]
fn concurrent_bumps_all_land() {
   let counter = Arc::new(Counter::new());

   let bumpers: Vec<_> = (0..8)
      .map(|_| {
         let counter = Arc::clone(&counter);
         thread::spawn(move || {
            for _ in 0..1_000 {
               counter.bump();
            }
         })
      })
      .collect();

   for bumper in bumpers {
      bumper.join().unwrap();
   }
   assert_eq!(counter.value(), 8_000);
}

#[test]
fn observed_values_never_decrease() {
   let counter = Arc::new(Counter::new());

   let bumper = {
      let counter = Arc::clone(&counter);
      thread::spawn(move || {
         for _ in 0..10_000 {
            counter.bump();
         }
      })
   };

   let mut last = 0;
   while last < 10_000 {
      let now = counter.value();
      assert!(now >= last);
      last = now;
   }
   bumper.join().unwrap();
   assert_eq!(counter.value(), 10_000);
}

#[test]
fn clone_snapshots_independently() {
   let counter = Counter::starting_at(5);
   let copy = counter.clone();
   counter.bump();
   assert_eq!(counter.value(), 6);
   assert_eq!(copy.value(), 5);
}

#[test]
fn debug_shows_the_count() {
   let counter = Counter::starting_at(7);
   assert_eq!(format!("{counter:?}"), "Counter(7)");
}
