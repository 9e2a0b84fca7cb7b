//! Inter-action delays.
//!
//! The step executor never sleeps directly; it asks a [`Pacer`] to wait and
//! scores human-likeness on the elapsed time the pacer reports.

use std::time::Duration;

use tokio::time::Instant;

/// Waits for a target delay and reports how long the wait actually took.
#[allow(async_fn_in_trait)]
pub trait Pacer: Send + Sync {
    async fn wait(&self, target: Duration) -> Duration;
}

/// Real wall-clock waiting on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn wait(&self, target: Duration) -> Duration {
        let start = Instant::now();
        tokio::time::sleep(target).await;
        start.elapsed()
    }
}

/// Returns immediately, reporting the target as if it had been hit exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantPacer;

impl Pacer for InstantPacer {
    async fn wait(&self, target: Duration) -> Duration {
        target
    }
}

/// Either pacer behind one concrete type.
#[derive(Debug, Clone, Copy)]
pub enum AnyPacer {
    Tokio(TokioPacer),
    Instant(InstantPacer),
}

impl Pacer for AnyPacer {
    async fn wait(&self, target: Duration) -> Duration {
        match self {
            Self::Tokio(p) => p.wait(target).await,
            Self::Instant(p) => p.wait(target).await,
        }
    }
}
