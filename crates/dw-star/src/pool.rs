//! Bounded evaluator-thread pool and the in-order parallel executor.
//!
//! The pool is a free-list of reusable OS threads dedicated to expression
//! evaluation. `get` never blocks: it reuses an idle thread or spawns a
//! fresh one. `put` resets the thread and returns it to the free list,
//! discarding it when the list is full.

use crate::context::ContextSpec;
use crate::error::EvalError;
use crate::value::ScriptValue;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

/// Default bound on the free list.
pub const DEFAULT_POOL_SIZE: usize = 16;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A reusable evaluation thread.
#[derive(Debug)]
pub struct EvalThread {
    name: String,
    sender: mpsc::Sender<Job>,
}

impl EvalThread {
    fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        thread::spawn(move || {
            while let Ok(job) = receiver.recv() {
                job();
            }
        });
        Self {
            name: String::new(),
            sender,
        }
    }

    /// The caller-assigned name of the current checkout.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job; jobs run in submission order on this thread.
    pub fn submit(&self, job: Job) {
        // A send failure means the worker died; the job is dropped and the
        // caller observes a missing result.
        if self.sender.send(job).is_err() {
            log::warn!("evaluator thread '{}' is gone, job dropped", self.name);
        }
    }
}

/// Thread-safe bounded pool of [`EvalThread`]s.
#[derive(Debug)]
pub struct ThreadPool {
    free: Mutex<Vec<EvalThread>>,
    max: usize,
}

impl ThreadPool {
    /// Create a pool bounded at `max` idle threads (0 means the default).
    pub fn new(max: usize) -> Self {
        let max = if max == 0 { DEFAULT_POOL_SIZE } else { max };
        Self {
            free: Mutex::new(Vec::new()),
            max,
        }
    }

    /// Take a thread, reusing an idle one when available. Never blocks.
    pub fn get(&self, name: &str) -> EvalThread {
        let mut thread = self
            .lock()
            .pop()
            .unwrap_or_else(EvalThread::spawn);
        thread.name = name.to_string();
        thread
    }

    /// Return a thread. It is reset (its name, not its globals) and kept
    /// only while the free list is under the bound; overflow is discarded.
    pub fn put(&self, mut thread: EvalThread) {
        thread.name.clear();
        let mut free = self.lock();
        if free.len() < self.max {
            free.push(thread);
        }
        // Dropping an overflow thread closes its channel; the worker exits.
    }

    /// Number of idle threads currently pooled.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EvalThread>> {
        self.free.lock().unwrap_or_else(|poisoned| {
            log::warn!("thread pool mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

/// One expression to evaluate.
#[derive(Debug, Clone)]
pub struct EvalTask {
    /// Identifier carried through to the result (model id, test name, ...)
    pub name: String,
    /// Expression source
    pub expr: String,
}

/// The outcome of one task.
#[derive(Debug)]
pub struct EvalResult {
    pub name: String,
    pub value: Result<ScriptValue, EvalError>,
}

/// Evaluates batches of expressions across pooled threads, delivering
/// results in input order.
pub struct ParallelExecutor {
    workers: usize,
    spec: Arc<ContextSpec>,
    pool: Arc<ThreadPool>,
}

impl ParallelExecutor {
    /// Create an executor with `workers` concurrent evaluation threads.
    pub fn new(workers: usize, spec: Arc<ContextSpec>) -> Self {
        Self {
            workers: workers.max(1),
            spec,
            pool: Arc::new(ThreadPool::default()),
        }
    }

    /// Share an existing pool instead of owning one.
    pub fn with_pool(workers: usize, spec: Arc<ContextSpec>, pool: Arc<ThreadPool>) -> Self {
        Self {
            workers: workers.max(1),
            spec,
            pool,
        }
    }

    /// Evaluate all tasks; the result vector matches the input order.
    pub fn execute(&self, tasks: Vec<EvalTask>) -> Vec<EvalResult> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.workers.min(total);
        let mut chunks: Vec<Vec<(usize, EvalTask)>> = (0..workers).map(|_| Vec::new()).collect();
        for (idx, task) in tasks.into_iter().enumerate() {
            chunks[idx % workers].push((idx, task));
        }

        let (tx, rx) = mpsc::channel::<(usize, EvalResult)>();
        let mut checked_out = Vec::with_capacity(workers);

        for chunk in chunks {
            let spec = Arc::clone(&self.spec);
            let tx = tx.clone();
            let thread = self.pool.get("parallel-eval");
            thread.submit(Box::new(move || {
                let ctx = spec.build();
                for (idx, task) in chunk {
                    let value = match &ctx {
                        Ok(ctx) => ctx.eval_value(&task.expr, &task.name, 1),
                        Err(e) => Err(EvalError::new(&task.name, 1, &task.expr, &e.to_string())),
                    };
                    let _ = tx.send((idx, EvalResult { name: task.name, value }));
                }
            }));
            checked_out.push(thread);
        }
        drop(tx);

        let mut slots: Vec<Option<EvalResult>> = (0..total).map(|_| None).collect();
        while let Ok((idx, result)) = rx.recv() {
            slots[idx] = Some(result);
        }

        for thread in checked_out {
            self.pool.put(thread);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| EvalResult {
                    name: format!("task-{idx}"),
                    value: Err(EvalError::new("<executor>", 0, "", "evaluation thread died")),
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
