//! Pending-work handles.
//!
//! Handlers hand back a [`WaitUntil`] for work that outlives their response
//! (cache writes, mostly). A host must await [`WaitUntil::settled`] before it
//! tears the worker down.

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct WaitUntil {
    tasks: Vec<JoinHandle<()>>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a spawned task.
    pub fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Merge another handle's tasks into this one.
    pub fn extend(&mut self, other: WaitUntil) {
        self.tasks.extend(other.tasks);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every tracked task. Panicked tasks are logged, not propagated.
    pub async fn settled(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "pending worker task did not complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settled_waits_for_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut wait = WaitUntil::new();
        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            wait.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(wait.len(), 3);
        wait.settled().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_settled_survives_panicking_task() {
        let mut wait = WaitUntil::new();
        wait.push(tokio::spawn(async { panic!("boom") }));
        wait.settled().await;
    }

    #[tokio::test]
    async fn test_extend() {
        let mut a = WaitUntil::new();
        let mut b = WaitUntil::new();
        b.push(tokio::spawn(async {}));
        a.extend(b);
        assert!(!a.is_empty());
        a.settled().await;
    }
}
