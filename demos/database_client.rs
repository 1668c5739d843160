//! Database client wired through a holdfast context
//!
//! The process owns one database handle. Startup connects with exponential
//! backoff, each request runs as a retried unit of work, and SIGINT/SIGTERM
//! release the handle before the process exits.
//!
//! Run with: cargo run --example database_client
//! Set DATABASE_URL and APP_ENV=development to see every attempt logged.

use futures::future::{BoxFuture, FutureExt};
use holdfast::core::TracingListener;
use holdfast::handle::Work;
use holdfast::{Context, Endpoint, FnListener, HandleConfig, HandleEvent, OperationError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, thiserror::Error)]
enum DbError {
    #[error("connection refused by {0}")]
    Refused(String),
    #[error("deadlock detected")]
    Deadlock,
}

/// Simulated database: refuses the first two connections and deadlocks on
/// every other insert attempt.
struct SimulatedDb {
    url: String,
    opens: AtomicU32,
    inserts: AtomicU32,
    rows: Mutex<Vec<String>>,
}

impl SimulatedDb {
    fn new(config: &HandleConfig) -> Self {
        Self {
            url: config.target.clone(),
            opens: AtomicU32::new(0),
            inserts: AtomicU32::new(0),
            rows: Mutex::new(Vec::new()),
        }
    }

    async fn insert(&self, row: &str) -> Result<usize, DbError> {
        sleep(Duration::from_millis(5)).await;
        if self.inserts.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(DbError::Deadlock);
        }
        let mut rows = self.rows.lock().unwrap();
        rows.push(row.to_string());
        Ok(rows.len())
    }
}

impl Endpoint for SimulatedDb {
    type Error = DbError;

    fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
        async move {
            let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[DB] connecting to {} (attempt {})", self.url, attempt);
            if attempt <= 2 {
                return Err(DbError::Refused(self.url.clone()));
            }
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
        async move {
            println!("[DB] closing connection to {}", self.url);
            Ok(())
        }
        .boxed()
    }

    fn unit_of_work<'a, T>(&'a self, work: Work<'a, Self, T>) -> BoxFuture<'a, Result<T, Self::Error>>
    where
        T: Send + 'a,
    {
        async move {
            println!("[DB] BEGIN");
            let result = work(self).await;
            println!("[DB] {}", if result.is_ok() { "COMMIT" } else { "ROLLBACK" });
            result
        }
        .boxed()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("holdfast database client\n");

    let config = HandleConfig::from_env()
        .unwrap_or_else(|err| {
            println!("{}; using a local database", err);
            HandleConfig::new("postgres://localhost/app")
        })
        .name("primary");

    let ctx = Context::builder(config, SimulatedDb::new)
        .listener(FnListener::new(|event: &HandleEvent| {
            if let HandleEvent::StateTransition { from, to, .. } = event {
                println!("[handle] {:?} -> {:?}", from, to);
            }
        }))
        .listener(TracingListener)
        .retry_listener(TracingListener)
        .build();

    ctx.register_shutdown_hook(|code| std::process::exit(code));

    // Refused twice: waits 2s then 4s before the third attempt succeeds.
    if let Err(err) = ctx.connect().await {
        eprintln!("startup failed: {}", err);
        return;
    }

    for order in ["order-1", "order-2", "order-3"] {
        let result = ctx
            .run_with_retry(move |db: &SimulatedDb| db.insert(order).boxed())
            .await;

        match result {
            Ok(count) => println!("stored {} ({} rows)", order, count),
            Err(OperationError::Exhausted { attempts, source }) => {
                println!("gave up on {} after {} attempts: {}", order, attempts, source)
            }
            Err(err) => println!("{} not stored: {}", order, err),
        }
    }

    println!("\nPress Ctrl+C to release the handle and exit.");
    std::future::pending::<()>().await;
}
