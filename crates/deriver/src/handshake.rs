//! Two-phase reset handshake between a derivation process and its consumer.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{DerivationProcess, DeriveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPhase {
    #[default]
    Ready,
    /// `reset` ran; waiting for the consumer to confirm its own reset.
    AwaitingConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("consumer has not confirmed pipeline reset")]
pub struct ResetNotConfirmed;

/// Wraps a process so that no step reaches it between `reset` and
/// `confirm_reset`.
///
/// Steps issued in that window are rejected with
/// [`ErrorKind::ConsumerSyncing`](crate::ErrorKind::ConsumerSyncing), which the
/// controller reports as idle. They are not queued; the orchestrator steps
/// again after confirming the reset.
pub struct ResetGate<D> {
    inner: D,
    phase: ResetPhase,
}

impl<D> ResetGate<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            phase: ResetPhase::Ready,
        }
    }

    pub fn phase(&self) -> ResetPhase {
        self.phase
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[async_trait]
impl<D> DerivationProcess for ResetGate<D>
where
    D: DerivationProcess,
{
    type Head = D::Head;
    type Payload = D::Payload;
    type Origin = D::Origin;

    fn origin(&self) -> Self::Origin {
        self.inner.origin()
    }

    fn reset(&mut self) {
        self.inner.reset();
        if self.phase == ResetPhase::AwaitingConfirm {
            debug!("pipeline reset repeated before consumer confirmation");
        }
        self.phase = ResetPhase::AwaitingConfirm;
    }

    fn confirm_reset(&mut self) {
        if self.phase == ResetPhase::Ready {
            debug!("pipeline reset confirmed without a pending reset");
        }
        self.inner.confirm_reset();
        self.phase = ResetPhase::Ready;
    }

    async fn step(
        &mut self,
        cancel: &CancellationToken,
        pending_head: Self::Head,
    ) -> Result<Option<Self::Payload>, DeriveError> {
        if self.phase == ResetPhase::AwaitingConfirm {
            return Err(DeriveError::consumer_syncing(ResetNotConfirmed));
        }
        self.inner.step(cancel, pending_head).await
    }
}

#[cfg(test)]
#[path = "tests/handshake_tests.rs"]
mod tests;
