//! Background thread pool for frame caching.
//!
//! Work-stealing deques (crossbeam):
//! - jobs are pushed to a global injector
//! - each worker drains its own deque, then the injector, then steals from siblings
//!
//! Cache jobs block inside the external decoder while holding the geometry
//! lock, so a pool larger than one thread mostly helps decoders that are slow
//! outside the lock. There is no cancellation of queued jobs.

use crossbeam::deque::{Injector, Stealer, Worker};
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Spawn `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let pending = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = locals.iter().map(Worker::stealer).collect();

        let handles = locals
            .into_iter()
            .enumerate()
            .map(|(worker_id, local)| {
                let injector = Arc::clone(&injector);
                let pending = Arc::clone(&pending);
                let shutdown = Arc::clone(&shutdown);
                let stealers = stealers.clone();

                thread::Builder::new()
                    .name(format!("framecmp-worker-{}", worker_id))
                    .spawn(move || {
                        trace!("Worker {} started", worker_id);
                        loop {
                            let job = local
                                .pop()
                                .or_else(|| injector.steal_batch_and_pop(&local).success())
                                .or_else(|| stealers.iter().find_map(|s| s.steal().success()));

                            match job {
                                Some(job) => {
                                    job();
                                    pending.fetch_sub(1, Ordering::AcqRel);
                                }
                                None if shutdown.load(Ordering::Relaxed) => break,
                                None => thread::sleep(Duration::from_millis(1)),
                            }
                        }
                        trace!("Worker {} stopped", worker_id);
                    })
                    .expect("Failed to spawn worker thread")
            })
            .collect();

        trace!("Workers initialized: {} threads", num_threads);

        Self {
            injector,
            handles,
            pending,
            shutdown,
        }
    }

    /// Pool size used when the config asks for 0 threads: 75% of cores
    pub fn default_threads() -> usize {
        (num_cpus::get() * 3 / 4).max(1)
    }

    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.injector.push(Box::new(f));
    }

    /// Jobs queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Block until all jobs finished or `timeout` elapsed. Returns true when idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        trace!("Workers shutting down ({} threads)...", self.handles.len());
        // Queued jobs still run: workers only exit once they find no work
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in std::mem::take(&mut self.handles) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_all_jobs() {
        let workers = Workers::new(3);
        assert_eq!(workers.num_threads(), 3);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let done = Arc::clone(&done);
            workers.execute(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(workers.wait_idle(Duration::from_secs(5)));
        assert_eq!(done.load(Ordering::SeqCst), 50);
        assert_eq!(workers.pending(), 0);
    }

    #[test]
    fn test_zero_threads_means_one() {
        let workers = Workers::new(0);
        assert_eq!(workers.num_threads(), 1);
        assert!(Workers::default_threads() >= 1);
    }
}
