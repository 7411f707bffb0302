use std::sync::atomic::{AtomicUsize, Ordering};

use permit_once::Lazy;

static LOADS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Settings {
   endpoint: String,
   retries: u32,
}

static SETTINGS: Lazy<Settings> = Lazy::new(|| {
   // Runs once, on whichever thread dereferences first.
   LOADS.fetch_add(1, Ordering::Relaxed);
   println!("loading settings...");
   std::thread::sleep(std::time::Duration::from_millis(50));
   Settings {
      endpoint: std::env::var("ENDPOINT").unwrap_or_else(|_| "localhost:8080".into()),
      retries: 3,
   }
});

fn main() {
   let readers: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("endpoint: {}, retries: {}", SETTINGS.endpoint, SETTINGS.retries);
         })
      })
      .collect();

   for reader in readers {
      reader.join().unwrap();
   }

   assert_eq!(LOADS.load(Ordering::Relaxed), 1); // loaded exactly once
   println!("final: {:?}", *SETTINGS);
}
