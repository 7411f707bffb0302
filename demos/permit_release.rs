use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use permit_once::{LazyCell, Slot};

// One global execution slot: think interpreter attachment. The initializer
// below needs it to finish, and the waiting thread holds it when it starts
// to wait - deadlock, unless the waiter steps aside while parked.
static SLOT: Slot = Slot::new();
static SHARED: LazyCell<u64> = LazyCell::new();
static INIT_RUNNING: AtomicBool = AtomicBool::new(false);

fn main() {
   let winner = thread::spawn(|| {
      *SHARED.get_or_init(|| {
         INIT_RUNNING.store(true, Ordering::SeqCst);
         println!("initializer: started, acquiring the slot...");
         thread::sleep(Duration::from_millis(100));
         let _attached = SLOT.attach();
         println!("initializer: got the slot, publishing");
         42
      })
   });

   let waiter = thread::spawn(|| {
      while !INIT_RUNNING.load(Ordering::SeqCst) {
         thread::yield_now();
      }
      let mut attached = SLOT.attach();
      println!("waiter: attached, waiting for the initializer");
      let value = *SHARED.get_or_init_in(&mut attached, || unreachable!());
      println!("waiter: woke up reattached, value = {}", value);
      value
   });

   assert_eq!(winner.join().unwrap(), 42);
   assert_eq!(waiter.join().unwrap(), 42);
   println!("no deadlock, one initializer run");
}
