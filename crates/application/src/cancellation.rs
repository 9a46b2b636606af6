//! Cooperative cancellation for generation runs
//!
//! A [`CancellationSignal`] is held by whoever started the run. Every
//! blocking point in the pipeline (queue pops, collaborator calls, backoff
//! sleeps) races against a [`CancelToken`] cloned from it.

use std::{future::Future, time::Duration};

use tokio::sync::watch;

use crate::error::ApplicationError;

/// Owner side of a cancellation pair
#[derive(Debug)]
pub struct CancellationSignal {
    sender: watch::Sender<bool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Token observing this signal
    pub fn token(&self) -> CancelToken {
        CancelToken {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub const fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested
    ///
    /// Pends forever if the signal is dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(mut rx) = self.receiver.clone() else {
            return std::future::pending().await;
        };
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Drive `fut` to completion unless cancellation wins the race
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Result<F::Output, ApplicationError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ApplicationError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Cancellation-aware sleep
    pub async fn sleep(&self, duration: Duration) -> Result<(), ApplicationError> {
        self.run_until_cancelled(tokio::time::sleep(duration)).await
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}
