use permit_once::LazyCell;

static REMOTE_ID: LazyCell<String> = LazyCell::new();

fn fetch_remote_id(fail: bool) -> Result<&'static String, &'static str> {
   REMOTE_ID.get_or_try_init(|| {
      println!("contacting backend (fail={})...", fail);
      if fail {
         Err("backend unreachable")
      } else {
         Ok("instance-7f3a".to_string())
      }
   })
}

fn main() {
   // First attempt fails; the cell stays empty.
   match fetch_remote_id(true) {
      Ok(_) => panic!("should have failed"),
      Err(e) => println!("caught: {}", e),
   }
   assert!(!REMOTE_ID.is_initialized());

   // Nothing was cached, so the retry initializes normally.
   match fetch_remote_id(false) {
      Ok(id) => println!("got id: {}", id),
      Err(_) => panic!("should have succeeded"),
   }
   assert!(REMOTE_ID.is_initialized());

   // A populated cell ignores even failing initializers.
   match fetch_remote_id(true) {
      Ok(id) => println!("still: {}", id),
      Err(_) => panic!("should have returned the cached id"),
   }
}
