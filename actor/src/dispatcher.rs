// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Dispatchers
//!
//! An [`ExecutionQueue`] is the mailbox and executor of an actor cell: a tokio task draining an
//! unbounded channel of boxed futures, running each one to completion before taking the next.
//! A [`Dispatcher`] decides which queue a new cell gets.
//!

use futures::{FutureExt, future::BoxFuture};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, error};

use std::{
    fmt::Debug,
    panic::AssertUnwindSafe,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Unit of work submitted to a queue.
pub type Task = BoxFuture<'static, ()>;

/// Queue sender side.
type TaskSender = mpsc::UnboundedSender<Task>;

/// Single-consumer, submission-ordered task executor.
///
/// Tasks submitted to the same queue never overlap and run in the order they were submitted.
/// Cloning the handle shares the queue. The consumer task ends when every handle is dropped.
///
#[derive(Clone)]
pub struct ExecutionQueue {
    /// Queue number, for logging.
    id: usize,
    /// Sender side of the queue.
    sender: TaskSender,
}

impl ExecutionQueue {
    /// Spawns a new queue on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    ///
    pub fn spawn(id: usize) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        tokio::spawn(async move {
            debug!("Execution queue {} started.", id);
            while let Some(task) = receiver.recv().await {
                if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                    error!("Task panicked on execution queue {}.", id);
                }
            }
            debug!("Execution queue {} closed.", id);
        });
        Self { id, sender }
    }

    /// Enqueues a task. Returns `false` if the consumer is gone.
    pub fn submit(&self, task: Task) -> bool {
        self.sender.send(task).is_ok()
    }

    /// Queue number.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `true` if both handles point to the same queue.
    pub fn same_queue(&self, other: &ExecutionQueue) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionQueue").field("id", &self.id).finish()
    }
}

/// Policy assigning execution queues to new actor cells.
pub trait Dispatcher: Debug + Send + Sync + 'static {
    /// Returns the queue for a new cell.
    fn assign_queue(&self) -> ExecutionQueue;
}

/// Gives every actor a queue of its own.
#[derive(Debug, Default)]
pub struct DefaultDispatcher {
    next_id: AtomicUsize,
}

impl DefaultDispatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dispatcher for DefaultDispatcher {
    fn assign_queue(&self) -> ExecutionQueue {
        ExecutionQueue::spawn(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shares a fixed pool of queues between actors.
///
/// Queues are created on demand until the pool is full; after that every assignment picks one
/// of the pooled queues at random. Actors on the same queue never run concurrently with each
/// other, which bounds the number of tasks at the cost of isolation.
///
#[derive(Debug)]
pub struct ShareDispatcher {
    /// Maximum number of queues.
    size: usize,
    /// Queues created so far.
    queues: Mutex<Vec<ExecutionQueue>>,
}

impl ShareDispatcher {
    /// Creates a dispatcher with at most `size` queues. A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            queues: Mutex::new(Vec::new()),
        }
    }

    /// Maximum number of queues.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Dispatcher for ShareDispatcher {
    fn assign_queue(&self) -> ExecutionQueue {
        let mut queues =
            self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if queues.len() < self.size {
            let queue = ExecutionQueue::spawn(queues.len());
            queues.push(queue.clone());
            queue
        } else {
            let index = rand::thread_rng().gen_range(0..queues.len());
            queues[index].clone()
        }
    }
}
