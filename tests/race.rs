use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use env_facts::RaceOnce;

#[test]
fn test_new_is_empty() {
   let cell: RaceOnce<i32> = RaceOnce::new();
   assert!(!cell.is_set());
   assert_eq!(cell.get(), None);
}

#[test]
fn test_with_value_is_set() {
   let cell = RaceOnce::with_value(42);
   assert!(cell.is_set());
   assert_eq!(cell.get(), Some(&42));
}

#[test]
fn test_try_publish() {
   let cell: RaceOnce<i32> = RaceOnce::new();

   // First publish wins and pins the value
   assert!(cell.try_publish(42));
   assert!(cell.is_set());
   assert_eq!(cell.get(), Some(&42));

   // Second publish is a no-op and never changes the stored value
   assert!(!cell.try_publish(24));
   assert_eq!(cell.get(), Some(&42));

   // Nor does any later attempt, no matter the value proposed
   assert!(!cell.try_publish(42));
   assert_eq!(cell.get(), Some(&42));
}

#[test]
fn test_try_publish_on_prefilled_cell() {
   let cell = RaceOnce::with_value(String::from("first"));
   assert!(!cell.try_publish(String::from("second")));
   assert_eq!(cell.get(), Some(&String::from("first")));
}

#[test]
fn test_get_or_publish() {
   let cell: RaceOnce<i32> = RaceOnce::new();
   let counter = AtomicUsize::new(0);

   let value = cell.get_or_publish(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      42
   });
   assert_eq!(value, 42);
   assert!(cell.is_set());
   assert_eq!(counter.load(Ordering::SeqCst), 1);

   // Second call hits the fast path and never runs the closure
   let value = cell.get_or_publish(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      panic!("Should not be called")
   });
   assert_eq!(value, 42);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_or_publish_returns_local_value_when_raced() {
   // A publish that lands between the fast-path read and this call's own
   // publish attempt: the caller still gets its locally computed value, the
   // cell keeps the winner.
   let cell: RaceOnce<i32> = RaceOnce::new();
   let value = cell.get_or_publish(|| {
      assert!(cell.try_publish(10)); // Simulated concurrent winner
      99
   });
   assert_eq!(value, 99);
   assert_eq!(cell.get(), Some(&10));
}

#[test]
fn test_multi_thread_publish_race() {
   let cell = Arc::new(RaceOnce::new());
   let wins = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|i| {
         let cell_clone = Arc::clone(&cell);
         let wins_clone = Arc::clone(&wins);
         thread::spawn(move || {
            thread::sleep(Duration::from_millis(5)); // Introduce slight offset
            if cell_clone.try_publish(i) {
               wins_clone.fetch_add(1, Ordering::SeqCst);
               i // The value this thread successfully published
            } else {
               // Lost the race; settle on the winner's value. A loser that
               // collided with an in-flight publish may briefly read None,
               // so spin until the winner's commit is visible.
               loop {
                  if let Some(v) = cell_clone.get() {
                     break *v;
                  }
                  thread::yield_now();
               }
            }
         })
      })
      .collect();

   let mut first_val = None;
   for handle in threads {
      let val = handle.join().unwrap();
      if first_val.is_none() {
         first_val = Some(val);
      }
      // All threads settle on the same final value
      assert_eq!(Some(val), first_val);
   }
   // Exactly one publish wins, and the retained value is one that was
   // actually proposed (0..10, checked via the winner's return above)
   assert_eq!(wins.load(Ordering::SeqCst), 1);
   assert_eq!(cell.get().copied(), first_val);
   assert!(first_val.is_some_and(|v| (0..10).contains(&v)));
}

#[test]
fn test_multi_thread_get_or_publish() {
   let cell = Arc::new(RaceOnce::new());
   let runs = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|_| {
         let cell_clone = Arc::clone(&cell);
         let runs_clone = Arc::clone(&runs);
         thread::spawn(move || {
            cell_clone.get_or_publish(|| {
               runs_clone.fetch_add(1, Ordering::SeqCst);
               // Deterministic computation: every racer derives the same
               // value, so redundant runs are harmless by construction
               thread::sleep(Duration::from_millis(10));
               42
            })
         })
      })
      .collect();

   for handle in threads {
      assert_eq!(handle.join().unwrap(), 42);
   }
   assert_eq!(cell.get(), Some(&42));

   // Redundant cold-start computation is allowed (this is not a blocking
   // single-flight cell), but at least one run must have happened and the
   // closure never runs again once the value is published.
   let runs_before = runs.load(Ordering::SeqCst);
   assert!((1..=10).contains(&runs_before));
   cell.get_or_publish(|| panic!("Should not be called"));
   assert_eq!(runs.load(Ordering::SeqCst), runs_before);
}

#[test]
fn test_get_mut_and_into_inner() {
   let mut cell = RaceOnce::with_value(String::from("hello"));
   cell.get_mut().unwrap().push_str(" world");
   assert_eq!(cell.into_inner(), Some(String::from("hello world")));

   let mut empty: RaceOnce<String> = RaceOnce::new();
   assert_eq!(empty.get_mut(), None);
   assert_eq!(empty.into_inner(), None);
}

#[test]
fn test_from_value_and_option() {
   let from_value: RaceOnce<i32> = RaceOnce::from(42);
   assert_eq!(from_value.get(), Some(&42));

   let from_some: RaceOnce<i32> = RaceOnce::from(Some(42));
   assert!(from_some.is_set());
   assert_eq!(from_some.get(), Some(&42));

   let from_none: RaceOnce<i32> = RaceOnce::from(None);
   assert!(!from_none.is_set());
   assert_eq!(from_none.get(), None);
}

#[test]
fn test_default_is_empty() {
   let cell: RaceOnce<i32> = RaceOnce::default();
   assert!(!cell.is_set());
   assert_eq!(cell.get(), None);
}

#[test]
fn test_clone() {
   let cell = RaceOnce::with_value(42);
   let clone = cell.clone();
   assert_eq!(clone.get(), Some(&42));

   let empty: RaceOnce<i32> = RaceOnce::new();
   let empty_clone = empty.clone();
   assert_eq!(empty_clone.get(), None);

   // Clone state is independent of the original
   assert!(empty_clone.try_publish(99));
   assert_eq!(empty.get(), None);
   assert_eq!(empty_clone.get(), Some(&99));
}

#[test]
fn test_eq_and_debug() {
   let a = RaceOnce::with_value(1);
   let b = RaceOnce::with_value(1);
   let c = RaceOnce::with_value(2);
   let empty: RaceOnce<i32> = RaceOnce::new();

   assert_eq!(a, b);
   assert_ne!(a, c);
   assert_ne!(a, empty);
   assert_eq!(empty, RaceOnce::new());

   assert_eq!(format!("{a:?}"), "RaceOnce(1)");
   assert_eq!(format!("{empty:?}"), "RaceOnce(<empty>)");
   assert_eq!(format!("{a}"), "1");
   assert_eq!(format!("{empty}"), "<empty>");
}

#[test]
fn test_published_value_is_dropped() {
   struct DropFlag(Arc<AtomicUsize>);
   impl Drop for DropFlag {
      fn drop(&mut self) {
         self.0.fetch_add(1, Ordering::SeqCst);
      }
   }

   let drops = Arc::new(AtomicUsize::new(0));
   {
      let cell = RaceOnce::new();
      assert!(cell.try_publish(DropFlag(Arc::clone(&drops))));
      // The losing value is dropped immediately, the winner on cell drop
      assert!(!cell.try_publish(DropFlag(Arc::clone(&drops))));
      assert_eq!(drops.load(Ordering::SeqCst), 1);
   }
   assert_eq!(drops.load(Ordering::SeqCst), 2);
}
