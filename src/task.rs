//! Background work with a single-consumer completion handle
//!
//! The shell stays responsive by running slow operations (capture,
//! translation, playback) on their own tasks. Results come back through a
//! [`Pending`] that is awaited or polled by its one owner. Dropping a
//! `Pending` discards the late result; the work itself runs to completion.

use std::future::Future;

use tokio::sync::oneshot;

use crate::{Error, Result};

/// Result of background work that has not been collected yet
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
    label: &'static str,
}

impl<T> Pending<T> {
    /// What this work is, for logs and status lines
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Wait for the result
    ///
    /// # Errors
    ///
    /// Returns error if the task ended without producing a value
    pub async fn wait(self) -> Result<T> {
        let Self { rx, label } = self;
        rx.await
            .map_err(|_| Error::Task(format!("{label} ended without a result")))
    }

    /// Take the result if it is ready, without waiting
    ///
    /// Returns `Ok(None)` while the work is still running.
    ///
    /// # Errors
    ///
    /// Returns error if the task ended without producing a value
    pub fn try_take(&mut self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(Error::Task(format!("{} ended without a result", self.label)))
            }
        }
    }
}

/// Run `future` on its own task and hand back a [`Pending`] for its output
pub fn spawn_background<F>(label: &'static str, future: F) -> Pending<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let output = future.await;
        if tx.send(output).is_err() {
            tracing::debug!(task = label, "result discarded, nobody waiting");
        }
    });
    Pending { rx, label }
}

/// Run a blocking closure on the blocking pool and hand back a [`Pending`]
pub fn spawn_blocking_background<F, T>(label: &'static str, work: F) -> Pending<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        if tx.send(work()).is_err() {
            tracing::debug!(task = label, "result discarded, nobody waiting");
        }
    });
    Pending { rx, label }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_output() {
        let pending = spawn_background("sum", async { 2 + 2 });
        assert_eq!(pending.wait().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn try_take_is_none_until_ready() {
        let (release, gate) = oneshot::channel::<()>();
        let mut pending = spawn_background("gated", async move {
            let _ = gate.await;
            "done"
        });

        assert_eq!(pending.try_take().unwrap(), None);
        release.send(()).unwrap();

        for _ in 0..100 {
            if let Some(value) = pending.try_take().unwrap() {
                assert_eq!(value, "done");
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("background result never arrived");
    }

    #[tokio::test]
    async fn blocking_work_is_delivered() {
        let pending = spawn_blocking_background("blocking", || {
            std::thread::sleep(Duration::from_millis(10));
            7
        });
        assert_eq!(pending.label(), "blocking");
        assert_eq!(pending.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn panicking_work_reports_task_error() {
        let pending = spawn_blocking_background("boom", || -> u8 { panic!("boom") });
        assert!(matches!(pending.wait().await, Err(Error::Task(_))));
    }

    #[tokio::test]
    async fn dropping_pending_discards_result() {
        let pending = spawn_background("ignored", async { 1 });
        drop(pending);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
