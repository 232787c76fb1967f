// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool
//!
//! A fixed number of permits bounds how many shells run at once. Each shell
//! runs on tokio's blocking pool since jobs are synchronous.

use crate::shell::{JobRunShell, ShutdownHandle};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Bounded pool that runs job run shells
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
    running: Mutex<Vec<(JoinHandle<()>, ShutdownHandle)>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            running: Mutex::new(Vec::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until at least one worker is free; returns how many are free
    pub async fn block_for_available_threads(&self) -> usize {
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => drop(permit),
            Err(_) => return 0,
        }
        self.semaphore.available_permits().max(1)
    }

    /// Run a shell on a free worker, waiting for one if all are busy.
    ///
    /// Hands the shell back once the pool is shut down.
    pub async fn run_in_thread(&self, mut shell: JobRunShell) -> Result<(), Box<JobRunShell>> {
        let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
            return Err(Box::new(shell));
        };
        let shutdown = shell.shutdown_handle();
        let handle = tokio::task::spawn_blocking(move || {
            shell.run();
            shell.passivate();
            drop(permit);
        });
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.retain(|(h, _)| !h.is_finished());
        running.push((handle, shutdown));
        Ok(())
    }

    /// Stop accepting work, optionally waiting for running shells.
    ///
    /// Running shells are asked to stop before their next refire.
    pub async fn shutdown(&self, wait_for_jobs_to_complete: bool) {
        self.semaphore.close();
        let handles = {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *running)
        };
        for (_, shutdown) in &handles {
            shutdown.request();
        }
        tracing::info!(
            running = handles.len(),
            wait = wait_for_jobs_to_complete,
            "worker pool shutting down"
        );
        if wait_for_jobs_to_complete {
            for (handle, _) in handles {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "worker task failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
