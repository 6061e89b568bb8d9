//! Serial execution contexts
//!
//! A `WorkRunner` executes posted jobs one at a time, in post order. The
//! loop uses one runner for event processing and another for observer
//! notification.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub type Job = Box<dyn FnOnce() + Send>;

pub trait WorkRunner: Send + Sync {
    /// Schedule a job. Jobs never overlap and run in the order they were posted.
    fn post(&self, job: Job);
}

// ============================================================================
// Immediate runner
// ============================================================================

/// Runs jobs on the posting thread.
///
/// The first caller to find the queue idle drains it, including jobs posted
/// meanwhile by other threads or by the running job itself. Nested posts are
/// queued rather than run inline, so call depth stays flat.
#[derive(Default)]
pub struct ImmediateWorkRunner {
    queue: Mutex<ImmediateQueue>,
}

#[derive(Default)]
struct ImmediateQueue {
    jobs: VecDeque<Job>,
    draining: bool,
}

impl ImmediateWorkRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, ImmediateQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands the drain role back if a job panics.
struct DrainGuard<'a> {
    runner: &'a ImmediateWorkRunner,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.runner.queue().draining = false;
    }
}

impl WorkRunner for ImmediateWorkRunner {
    fn post(&self, job: Job) {
        {
            let mut queue = self.queue();
            queue.jobs.push_back(job);
            if queue.draining {
                return;
            }
            queue.draining = true;
        }

        let guard = DrainGuard { runner: self };
        loop {
            // Give up the drain role under the same lock that saw the queue empty
            let next = {
                let mut queue = self.queue();
                let next = queue.jobs.pop_front();
                if next.is_none() {
                    queue.draining = false;
                }
                next
            };
            let Some(job) = next else { break };
            job();
        }
        std::mem::forget(guard);
    }
}

// ============================================================================
// Tokio runner
// ============================================================================

/// Runs jobs on a dedicated tokio task fed by an unbounded channel.
///
/// The task exits once the runner is dropped and the queue is drained. A
/// panicking job is logged and does not stop the task.
pub struct TokioWorkRunner {
    jobs: mpsc::UnboundedSender<Job>,
}

impl TokioWorkRunner {
    pub fn new(runtime: &Handle) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("Work runner job panicked, continuing with the next job");
                }
            }
            tracing::debug!("Work runner drained");
        });
        Self { jobs }
    }

    /// Runner on the ambient tokio runtime, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(|runtime| Self::new(&runtime))
    }
}

impl WorkRunner for TokioWorkRunner {
    fn post(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            tracing::warn!("Work runner task has stopped, dropping job");
        }
    }
}
