use std::collections::VecDeque;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, bounded};

use crate::error::{DlogcoverError, Result};

/// Maximum number of worker threads regardless of hardware concurrency.
const MAX_WORKERS: usize = 64;

/// Failed steal attempts before a worker parks on the condition variable.
const MAX_STEAL_ATTEMPTS: usize = 4;

/// How long a parked worker sleeps before rechecking the queues.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a submitted task. `join` blocks until the task completes and
/// returns `None` when the task panicked.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<Option<T>>,
}

impl<T> TaskHandle<T> {
    /// Waits for the task to finish.
    #[must_use]
    pub fn join(self) -> Option<T> {
        self.receiver.recv().ok().flatten()
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub tasks_executed: u64,
    pub steal_attempts: u64,
    pub steals_ok: u64,
    pub queued: usize,
}

impl PoolStats {
    /// Human-readable one-line summary for verbose output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "pool: {} workers, {} tasks executed, {}/{} steals succeeded, {} queued",
            self.workers, self.tasks_executed, self.steals_ok, self.steal_attempts, self.queued
        )
    }
}

struct PoolShared {
    queues: Vec<Mutex<VecDeque<Job>>>,
    next_index: AtomicUsize,
    stop: AtomicBool,
    park_lock: Mutex<()>,
    park_cond: Condvar,
    tasks_executed: AtomicU64,
    steal_attempts: AtomicU64,
    steals_ok: AtomicU64,
}

impl PoolShared {
    fn total_queued(&self) -> usize {
        self.queues
            .iter()
            .map(|q| q.lock().map_or(0, |g| g.len()))
            .sum()
    }
}

/// Work-stealing thread pool.
///
/// Each worker owns a double-ended queue: the owner pops from the back
/// (LIFO, cache-friendly), idle workers steal from a random victim's front
/// (FIFO). Submission is round-robin across queues via an atomic counter.
pub struct WorkStealingPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkStealingPool {
    /// Creates a pool with `threads` workers. Zero selects the hardware
    /// concurrency; the worker count is capped at 64.
    #[must_use]
    pub fn new(threads: usize) -> Self {
        let count = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        }
        .clamp(1, MAX_WORKERS);

        let shared = Arc::new(PoolShared {
            queues: (0..count).map(|_| Mutex::new(VecDeque::new())).collect(),
            next_index: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            park_lock: Mutex::new(()),
            park_cond: Condvar::new(),
            tasks_executed: AtomicU64::new(0),
            steal_attempts: AtomicU64::new(0),
            steals_ok: AtomicU64::new(0),
        });

        log::debug!("starting work-stealing pool with {count} workers");
        let workers = (0..count)
            .map(|id| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("dlogcover-worker-{id}"))
                    .spawn(move || worker_loop(&shared, id))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.queues.len()
    }

    /// Submits a task, returning a handle for its result.
    ///
    /// # Errors
    /// Returns `PoolStopped` after `shutdown`.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(DlogcoverError::PoolStopped);
        }

        let (sender, receiver) = bounded(1);
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task));
            match outcome {
                Ok(value) => {
                    let _ = sender.send(Some(value));
                }
                Err(_) => {
                    log::error!("pool task panicked");
                    let _ = sender.send(None);
                }
            }
        });

        let index = self.shared.next_index.fetch_add(1, Ordering::Relaxed) % self.worker_count();
        self.push_job(index, job);
        self.shared.park_cond.notify_one();
        Ok(TaskHandle { receiver })
    }

    /// Submits a batch of tasks with consecutive queue placement starting at
    /// the current round-robin index, minimizing counter contention.
    ///
    /// # Errors
    /// Returns `PoolStopped` after `shutdown`.
    pub fn submit_batch<T, F>(&self, tasks: Vec<F>) -> Result<Vec<TaskHandle<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(DlogcoverError::PoolStopped);
        }

        let count = tasks.len();
        let start = self.shared.next_index.fetch_add(count, Ordering::Relaxed);
        let mut handles = Vec::with_capacity(count);
        for (offset, task) in tasks.into_iter().enumerate() {
            let (sender, receiver) = bounded(1);
            let job: Job = Box::new(move || {
                let outcome = catch_unwind(AssertUnwindSafe(task));
                match outcome {
                    Ok(value) => {
                        let _ = sender.send(Some(value));
                    }
                    Err(_) => {
                        log::error!("pool task panicked");
                        let _ = sender.send(None);
                    }
                }
            });
            self.push_job((start + offset) % self.worker_count(), job);
            handles.push(TaskHandle { receiver });
        }
        self.shared.park_cond.notify_all();
        Ok(handles)
    }

    /// Stops the pool: sets the stop flag, wakes every worker and joins
    /// them. Queued tasks are drained before workers exit. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.park_cond.notify_all();

        let handles = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.join();
        }
        log::debug!("{}", self.stats().summary());
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.worker_count(),
            tasks_executed: self.shared.tasks_executed.load(Ordering::Relaxed),
            steal_attempts: self.shared.steal_attempts.load(Ordering::Relaxed),
            steals_ok: self.shared.steals_ok.load(Ordering::Relaxed),
            queued: self.shared.total_queued(),
        }
    }

    fn push_job(&self, index: usize, job: Job) {
        if let Ok(mut queue) = self.shared.queues[index].lock() {
            queue.push_back(job);
        }
    }
}

impl Drop for WorkStealingPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &PoolShared, id: usize) {
    let mut rng = XorShift::seeded(id);

    loop {
        if let Some(job) = pop_own(shared, id) {
            job();
            shared.tasks_executed.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        if let Some(job) = steal(shared, id, &mut rng) {
            job();
            shared.tasks_executed.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        if shared.stop.load(Ordering::Acquire) {
            // Drained own queue and found nothing to steal.
            break;
        }

        if let Ok(guard) = shared.park_lock.lock() {
            let _ = shared
                .park_cond
                .wait_timeout(guard, PARK_TIMEOUT)
                .map(|(g, _)| drop(g));
        }
    }
}

fn pop_own(shared: &PoolShared, id: usize) -> Option<Job> {
    shared.queues[id].lock().ok()?.pop_back()
}

fn steal(shared: &PoolShared, id: usize, rng: &mut XorShift) -> Option<Job> {
    let count = shared.queues.len();
    if count < 2 {
        return None;
    }

    shared.steal_attempts.fetch_add(1, Ordering::Relaxed);
    for _ in 0..MAX_STEAL_ATTEMPTS {
        #[allow(clippy::cast_possible_truncation)]
        let mut victim = rng.next() as usize % count;
        if victim == id {
            victim = (victim + 1) % count;
        }
        let stolen = shared.queues[victim].lock().ok().and_then(|mut q| q.pop_front());
        if let Some(job) = stolen {
            shared.steals_ok.fetch_add(1, Ordering::Relaxed);
            return Some(job);
        }
    }
    None
}

/// Small per-worker PRNG for victim selection. Seeded through the standard
/// library's `RandomState` so workers diverge across runs without an RNG
/// dependency.
struct XorShift(u64);

impl XorShift {
    fn seeded(id: usize) -> Self {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_usize(id);
        // The zero state is a fixed point of xorshift.
        Self(hasher.finish() | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
