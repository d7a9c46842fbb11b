//! Fire-and-forget timers that can be cancelled together
//!
//! Every delayed action of the story services (arrow reveal, dialogue
//! callbacks, hint reveals, music fade-outs) is spawned through a
//! [`Scheduler`], so an application reset can abort all of them at once.
//! Spawning requires a running tokio runtime.

use crate::lock;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<Vec<AbortHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked task
    pub fn spawn<F>(&self, task: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task).abort_handle();
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.clone());
        handle
    }

    /// Run `action` once after `delay`
    pub fn after<F>(&self, delay: Duration, action: F) -> AbortHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        })
    }

    /// Number of timers that have not finished yet
    pub fn pending(&self) -> usize {
        lock(&self.tasks)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Abort every pending timer
    pub fn abort_all(&self) {
        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for task in tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn after_runs_once_the_delay_elapses() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        scheduler.after(Duration::from_millis(800), move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_all_cancels_pending_timers() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for delay in [100, 200, 300] {
            let h = hits.clone();
            scheduler.after(Duration::from_millis(delay), move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.abort_all();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }
}
