//! # Chunk Task Queue
//!
//! A fixed pool of worker threads that generate, load and store chunks off
//! the simulation thread.
//!
//! ## Ordering
//!
//! Each worker owns one bounded channel. A task is routed by hashing its
//! chunk position, so every task for one position lands on the same worker
//! and runs in submission order. Tasks for different positions carry no
//! ordering guarantee.
//!
//! ## Backpressure
//!
//! `submit` never waits. A full worker queue is reported as `QueueFull` and
//! the caller retries on a later tick.
//!
//! ## Loaded chunks win
//!
//! Generate and Load never replace a chunk that is already in the arena.
//! The loaded copy may hold edits that were never stored, so the task
//! reports `AlreadyLoaded` instead.
//!
//! ## Shutdown
//!
//! A `Shutdown` task is broadcast to every worker behind whatever is already
//! queued. Workers finish that work, report `ShutDown` and exit. Submits
//! after that fail with `QueueClosed`. Every submit that returned `Ok` is
//! queued ahead of the sentinel, so it runs and reports a completion.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use terastream_core::{Chunk, ChunkCoord};
use terastream_lighting::ChunkArena;
use terastream_storage::ChunkStore;

use crate::config::TaskQueueConfig;
use crate::error::{TaskError, TaskResult};
use crate::generator::ChunkGenerator;

/// What a worker should do with a chunk position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Run the generator and insert the result into the arena.
    Generate,
    /// Read from the store and insert into the arena if found.
    Load,
    /// Write the arena chunk to the store and clear its dirty flag.
    Store,
    /// Stop the pool after queued work.
    Shutdown,
}

/// Result of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Chunk generated and inserted.
    Generated,
    /// Chunk loaded and inserted.
    Loaded,
    /// A chunk was already loaded at the position and was kept.
    AlreadyLoaded,
    /// Nothing stored at the position.
    NotFound,
    /// Chunk written to the store. It stays dirty if it was edited while
    /// the write was in flight.
    Stored,
    /// The task failed. The chunk in the arena, if any, is unchanged.
    Failed(String),
    /// The worker has exited.
    ShutDown,
}

/// Completion notice sent for every task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCompletion {
    /// Position the task was submitted for.
    pub coord: ChunkCoord,
    /// Task that ran.
    pub kind: TaskKind,
    /// What happened.
    pub outcome: TaskOutcome,
}

type Job = (ChunkCoord, TaskKind);

/// Everything a worker needs, shared by all workers.
struct WorkerContext {
    store: Arc<dyn ChunkStore>,
    generator: Arc<dyn ChunkGenerator>,
    arena: Arc<ChunkArena>,
    completions: Sender<TaskCompletion>,
}

/// Sharded chunk worker pool.
pub struct ChunkTaskQueue {
    senders: Vec<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    completions: Receiver<TaskCompletion>,
    /// Read-held across the closed check and the send, write-held while closing.
    closed: RwLock<bool>,
}

impl ChunkTaskQueue {
    /// Spawns `config.workers` threads named `chunk-worker-{n}`.
    ///
    /// # Errors
    ///
    /// `Spawn` if a thread cannot be started. Workers started before the
    /// failure are shut down again.
    pub fn new(
        config: TaskQueueConfig,
        store: Arc<dyn ChunkStore>,
        generator: Arc<dyn ChunkGenerator>,
        arena: Arc<ChunkArena>,
    ) -> TaskResult<Self> {
        let (completion_tx, completion_rx) = unbounded();
        let context = Arc::new(WorkerContext {
            store,
            generator,
            arena,
            completions: completion_tx,
        });

        let count = config.effective_workers();
        let mut queue = Self {
            senders: Vec::with_capacity(count),
            workers: Vec::with_capacity(count),
            completions: completion_rx,
            closed: RwLock::new(false),
        };

        for id in 0..count {
            let (tx, rx) = bounded(config.queue_capacity.max(1));
            let context = Arc::clone(&context);
            let handle = std::thread::Builder::new()
                .name(format!("chunk-worker-{id}"))
                .spawn(move || run_worker(id, &context, &rx))
                .map_err(|source| TaskError::Spawn { worker: id, source })?;
            queue.senders.push(tx);
            queue.workers.push(handle);
        }

        tracing::info!(workers = count, capacity = config.queue_capacity, "chunk workers started");
        Ok(queue)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Returns true once `Shutdown` was submitted.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self.closed.try_read() {
            Some(closed) => *closed,
            // Only a closing thread holds the write side
            None => true,
        }
    }

    /// Queues a task without waiting.
    ///
    /// `TaskKind::Shutdown` closes the queue for every position. Unlike
    /// other tasks it waits until every worker has room for the sentinel.
    ///
    /// # Errors
    ///
    /// `QueueFull` if the target worker's queue has no room. `QueueClosed`
    /// after shutdown, or if the target worker has exited.
    pub fn submit(&self, coord: ChunkCoord, kind: TaskKind) -> TaskResult<()> {
        if kind == TaskKind::Shutdown {
            return self.close(coord);
        }
        let Some(closed) = self.closed.try_read() else {
            return Err(TaskError::QueueClosed);
        };
        if *closed {
            return Err(TaskError::QueueClosed);
        }
        let worker = shard(coord, self.senders.len());
        match self.senders[worker].try_send((coord, kind)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TaskError::QueueFull { worker }),
            Err(TrySendError::Disconnected(_)) => Err(TaskError::QueueClosed),
        }
    }

    /// Receiver for task completions. Cloning it is cheap.
    #[must_use]
    pub fn completions(&self) -> Receiver<TaskCompletion> {
        self.completions.clone()
    }

    /// Stops accepting work, waits for queued tasks, then joins every worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn close(&self, coord: ChunkCoord) -> TaskResult<()> {
        let mut closed = self.closed.write();
        if *closed {
            return Err(TaskError::QueueClosed);
        }
        *closed = true;
        for sender in &self.senders {
            // A worker that already exited needs no sentinel
            let _ = sender.send((coord, TaskKind::Shutdown));
        }
        tracing::info!("chunk task queue closed");
        Ok(())
    }

    fn stop(&mut self) {
        let _ = self.close(ChunkCoord::default());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("chunk worker panicked");
            }
        }
    }
}

impl Drop for ChunkTaskQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Maps a chunk position to a worker index.
fn shard(coord: ChunkCoord, workers: usize) -> usize {
    let hash = (coord.x as u32).wrapping_mul(73_856_093)
        ^ (coord.y as u32).wrapping_mul(19_349_663)
        ^ (coord.z as u32).wrapping_mul(83_492_791);
    hash as usize % workers.max(1)
}

fn run_worker(id: usize, context: &WorkerContext, jobs: &Receiver<Job>) {
    tracing::info!(worker = id, "chunk worker started");
    for (coord, kind) in jobs {
        let outcome = if kind == TaskKind::Shutdown {
            TaskOutcome::ShutDown
        } else {
            execute(context, coord, kind)
        };
        if let TaskOutcome::Failed(reason) = &outcome {
            tracing::warn!(worker = id, %coord, ?kind, %reason, "chunk task failed");
        }
        let done = outcome == TaskOutcome::ShutDown;
        // The owner may have dropped the receiver; results are then unwanted
        let _ = context.completions.send(TaskCompletion { coord, kind, outcome });
        if done {
            break;
        }
    }
    tracing::info!(worker = id, "chunk worker stopped");
}

fn execute(context: &WorkerContext, coord: ChunkCoord, kind: TaskKind) -> TaskOutcome {
    match kind {
        TaskKind::Generate => {
            if context.arena.contains(coord) {
                return TaskOutcome::AlreadyLoaded;
            }
            match context.generator.generate(coord) {
                Ok(chunk) => insert(context, chunk, TaskOutcome::Generated),
                Err(e) => TaskOutcome::Failed(e.to_string()),
            }
        }
        TaskKind::Load => {
            if context.arena.contains(coord) {
                return TaskOutcome::AlreadyLoaded;
            }
            match context.store.get(coord) {
                Ok(Some(chunk)) => insert(context, chunk, TaskOutcome::Loaded),
                Ok(None) => TaskOutcome::NotFound,
                Err(e) => TaskOutcome::Failed(e.to_string()),
            }
        }
        TaskKind::Store => store(context, coord),
        TaskKind::Shutdown => TaskOutcome::ShutDown,
    }
}

fn insert(context: &WorkerContext, chunk: Chunk, outcome: TaskOutcome) -> TaskOutcome {
    if context.arena.insert_if_vacant(chunk) {
        outcome
    } else {
        TaskOutcome::AlreadyLoaded
    }
}

/// Writes a snapshot so the chunk lock is never held across I/O.
fn store(context: &WorkerContext, coord: ChunkCoord) -> TaskOutcome {
    let Some(handle) = context.arena.get(coord) else {
        return TaskOutcome::Failed(format!("chunk {coord} is not loaded"));
    };
    let (snapshot, revision) = {
        let chunk = handle.lock();
        (chunk.clone(), chunk.revision())
    };
    if let Err(e) = context.store.put(&snapshot) {
        return TaskOutcome::Failed(e.to_string());
    }
    if !handle.lock().mark_clean_at(revision) {
        tracing::debug!(%coord, "chunk edited during store, left dirty");
    }
    TaskOutcome::Stored
}
