//! Async runtime helpers shared by the data layer
//!
//! All background work (cache refetches, toast timers) goes through these
//! functions so there is a single place that knows about the executor.

use std::time::Duration;

/// Spawn an async task on the current tokio runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future)
}

/// Spawn a task that waits for `delay` and then runs `future`.
pub fn spawn_delayed<F>(delay: Duration, future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        future.await
    })
}

/// Check if we're running inside a tokio runtime context.
///
/// Synchronous callers (e.g. a store setter invoked from a plain test) use
/// this to skip scheduling background work instead of panicking.
pub fn in_runtime_context() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_not_in_runtime_outside_tokio() {
        assert!(!in_runtime_context());
    }

    #[tokio::test]
    async fn test_spawn_returns_output() {
        assert!(in_runtime_context());
        let handle = spawn(async { 21 * 2 });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_delayed_waits() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle = spawn_delayed(Duration::from_secs(4), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!fired.load(Ordering::SeqCst));

        handle.await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}
