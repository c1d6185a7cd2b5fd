use fibre_loader::LoaderBuilder;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tokio::time::{sleep, Duration};

#[derive(Debug)]
struct DbError(String);

impl std::fmt::Display for DbError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// A simulated database that answers a whole batch with one slow query.
async fn query_database(ids: Vec<u64>, queries: Arc<AtomicUsize>) -> Vec<Result<String, DbError>> {
  queries.fetch_add(1, Ordering::SeqCst);
  println!("--- Database: SELECT ... WHERE id IN {:?}", ids);
  sleep(Duration::from_millis(50)).await;
  ids
    .into_iter()
    .map(|id| {
      if id == 13 {
        Err(DbError(format!("row {} is corrupt", id)))
      } else {
        Ok(format!("post #{}", id))
      }
    })
    .collect()
}

#[tokio::main]
async fn main() {
  let queries = Arc::new(AtomicUsize::new(0));

  let loader = LoaderBuilder::new()
    .max_batch(100)
    .wait(Duration::from_millis(10))
    .async_fetch({
      let queries = queries.clone();
      move |ids: Vec<u64>| query_database(ids, queries.clone())
    })
    .build_async()
    .expect("Failed to build async loader");

  println!("--- N+1 Demonstration ---");
  println!("Spawning 20 tasks that each resolve one post.\n");

  let mut handles = Vec::new();
  for id in 1..=20u64 {
    let loader = loader.clone();
    handles.push(tokio::spawn(async move {
      match loader.load(id).await {
        Ok(post) => println!("Task {}: {}", id, post),
        Err(e) => println!("Task {}: failed: {}", id, e),
      }
    }));
  }
  for handle in handles {
    handle.await.unwrap();
  }

  println!(
    "\n20 lookups were served by {} database query.",
    queries.load(Ordering::SeqCst)
  );
  println!("Loader metrics: {:#?}", loader.metrics());
}
