use fibre_loader::LoaderBuilder;
use std::convert::Infallible;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

fn main() {
  // Batches of up to 4 keys, a 20ms window and a 2-second result cache.
  let loader = LoaderBuilder::new()
    .max_batch(4)
    .wait(Duration::from_millis(20))
    .time_to_live(Duration::from_secs(2))
    .fetch(|ids: &[u32]| {
      println!("--- Database: one query for ids {:?}", ids);
      ids
        .iter()
        .map(|id| Ok::<_, Infallible>(format!("user #{}", id)))
        .collect()
    })
    .build()
    .expect("Failed to build loader");

  println!("Six threads each ask for one user at the same time.\n");
  let barrier = Barrier::new(6);
  thread::scope(|scope| {
    for id in 1..=6 {
      let loader = loader.clone();
      let barrier = &barrier;
      scope.spawn(move || {
        barrier.wait();
        let user = loader.load(id).expect("fetch never fails here");
        println!("thread {} got '{}'", id, user);
      });
    }
  });

  println!("\nAsking for user 3 again is served from the cache.");
  let user = loader.load(3).expect("cached");
  println!("got '{}'", user);

  println!("\nLoader metrics: {:#?}", loader.metrics());
}
