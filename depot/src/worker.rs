//! Background fulfillment workers.
//!
//! [`WorkerFulfiller`] is a ready-made [`Fulfiller`] that resolves
//! registry requests on a small set of worker threads fed by a job
//! channel, so slow production work (loading, decoding) never runs on
//! the requesting thread.

use crate::registry::{Callback, Fulfiller};
use crate::{Handle, Resource};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::info;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static WORKER_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A single queued resolution.
struct Job<K, T> {
    key: K,
    callback: Callback<K, T>,
}

/// Produces the handle for a requested key on a worker thread.
type Produce<K, T> = dyn Fn(&K) -> Handle<T> + Send + Sync;

/// Fulfiller that resolves requests asynchronously on worker threads.
///
/// The caller supplies a `produce` function that does the actual work
/// for one key, typically ending in a
/// [`Registry::create`](crate::Registry::create). Worker threads exit
/// once the fulfiller is dropped and the job channel disconnects.
pub struct WorkerFulfiller<K, T> {
    queue: Sender<Job<K, T>>,
}

impl<K, T> WorkerFulfiller<K, T>
where
    K: Send + 'static,
    T: Resource,
{
    /// Starts `worker_count` worker threads and returns the fulfiller
    /// feeding them.
    pub fn new<P>(worker_count: usize, produce: P) -> Self
    where
        P: Fn(&K) -> Handle<T> + Send + Sync + 'static,
    {
        info!("starting {} fulfillment worker threads", worker_count);

        let (tx, rx) = unbounded();
        let produce: Arc<Produce<K, T>> = Arc::new(produce);

        for _ in 0..worker_count {
            spawn_worker_thread(rx.clone(), produce.clone());
        }

        Self { queue: tx }
    }
}

impl<K, T> Fulfiller<K, T> for WorkerFulfiller<K, T>
where
    K: Send + 'static,
    T: Resource,
{
    fn fulfill(&self, key: K, callback: Callback<K, T>) {
        // send only fails after every worker exited; there is nobody
        // left to deliver to in that case
        self.queue.send(Job { key, callback }).ok();
    }
}

/// Spawns a single worker thread bound to the job channel.
fn spawn_worker_thread<K, T>(rx: Receiver<Job<K, T>>, produce: Arc<Produce<K, T>>)
where
    K: Send + 'static,
    T: Resource,
{
    std::thread::Builder::new()
        .name(format!(
            "DepotWorker-{}",
            WORKER_COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
        .spawn(move || {
            loop {
                let job = match rx.recv() {
                    Ok(t) => t,
                    Err(_) => break,
                };

                let handle = produce(&job.key);
                job.callback.call(job.key, handle);
            }
            info!("worker thread exited");
        })
        .expect("cannot start worker thread");
}
