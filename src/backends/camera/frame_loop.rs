// SPDX-License-Identifier: GPL-3.0-only

//! Background worker threads
//!
//! The analysis worker of a camera session and the replay source both run
//! one blocking step at a time on a named thread until told to stop. Steps
//! must block for a bounded time so a stop request is seen promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// What the worker does after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    /// Exit the thread; nothing more will arrive
    Stop,
}

/// Owns one worker thread
///
/// Dropping the controller stops and joins the thread.
pub struct WorkerController {
    name: String,
    handle: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
}

impl WorkerController {
    /// Spawn a thread named `name` that calls `step` until it returns
    /// [`LoopAction::Stop`] or the controller is stopped
    pub fn start<F>(name: &str, mut step: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = Arc::clone(&stopping);
        let thread_name = name.to_string();

        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let mut steps: u64 = 0;
            while !thread_stopping.load(Ordering::Acquire) {
                steps += 1;
                if step() == LoopAction::Stop {
                    debug!(worker = %thread_name, "Worker finished on its own");
                    break;
                }
            }
            debug!(worker = %thread_name, steps, "Worker thread exiting");
        });

        let handle = match spawned {
            Ok(handle) => {
                info!(worker = %name, "Worker started");
                Some(handle)
            }
            Err(e) => {
                warn!(worker = %name, error = %e, "Failed to spawn worker thread");
                None
            }
        };

        Self {
            name: name.to_string(),
            handle,
            stopping,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to exit after its current step
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    /// Ask the thread to exit and wait for it
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to exit on its own
    pub fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!(worker = %self.name, "Worker thread panicked");
        } else {
            debug!(worker = %self.name, "Worker joined");
        }
    }
}

impl Drop for WorkerController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_step_can_finish_worker() {
        let steps = Arc::new(AtomicU32::new(0));
        let worker_steps = Arc::clone(&steps);

        let mut worker = WorkerController::start("test-worker", move || {
            if worker_steps.fetch_add(1, Ordering::SeqCst) == 4 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        worker.join();
        assert_eq!(steps.load(Ordering::SeqCst), 5);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_stop_joins_running_worker() {
        let steps = Arc::new(AtomicU32::new(0));
        let worker_steps = Arc::clone(&steps);

        let mut worker = WorkerController::start("test-worker", move || {
            worker_steps.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(30));
        worker.stop();

        let after_stop = steps.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(steps.load(Ordering::SeqCst), after_stop);
    }
}
