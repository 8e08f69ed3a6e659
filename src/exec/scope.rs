// src/exec/scope.rs

//! Cancellable execution scopes.
//!
//! A [`Scope`] pairs a hierarchical cancellation signal with a task tracker.
//! Child scopes observe their parent's cancellation but can also be
//! cancelled on their own; every background task spawned through any scope
//! of the same family is tracked, so [`Scope::shutdown`] can wait for the
//! whole tree to wind down.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope cancelled together with this one (and cancellable on its own).
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            tracker: self.tracker.clone(),
        }
    }

    /// A scope sharing this one's tracker but with an independent signal.
    ///
    /// Output buffer workers run in such a scope so they outlive the
    /// cancellation of the run that feeds them.
    pub fn detached(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: self.tracker.clone(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this scope (or an ancestor) is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.token.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }

    /// Spawn a tracked background task.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of tracked tasks still running in this scope family.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel, then wait for every tracked task to finish.
    pub async fn shutdown(&self) {
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_follows_parent_but_not_the_reverse() {
        let root = Scope::new();
        let a = root.child();
        let b = root.child();

        a.cancel();
        assert!(a.is_cancelled());
        assert!(!root.is_cancelled());
        assert!(!b.is_cancelled());

        root.cancel();
        assert!(b.is_cancelled());
    }

    #[tokio::test]
    async fn detached_scope_ignores_parent_cancellation() {
        let root = Scope::new();
        let detached = root.detached();
        root.cancel();
        assert!(!detached.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_reports_cancellation() {
        let scope = Scope::new();
        assert!(scope.sleep(Duration::from_millis(10)).await);

        let sleeper = scope.clone();
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(60)).await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        scope.cancel();
        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn shutdown_waits_for_tracked_tasks() {
        let scope = Scope::new();
        let worker = scope.child();
        let done = scope.spawn(async move {
            worker.cancelled().await;
            42
        });

        scope.shutdown().await;
        assert_eq!(scope.active_tasks(), 0);
        assert_eq!(done.await.unwrap(), 42);
    }
}
