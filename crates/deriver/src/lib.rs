//! Step controller for a derivation pipeline.
//!
//! The controller receives [`InboundEvent`]s from an orchestrator, drives a
//! [`DerivationProcess`] one step at a time and reports every step outcome as
//! exactly one [`OutboundEvent`] on an [`EventSink`]. Retry timing and backoff
//! stay with the orchestrator; the emitted event only says which kind of retry
//! is needed.

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use shared::{
    error::{DeriveError, ErrorKind},
    protocol::{InboundEvent, OutboundEvent, StepOutcome},
};

pub mod controller;
pub mod handshake;
pub mod settings;
pub mod sink;

pub use controller::StepController;
pub use handshake::{ResetGate, ResetPhase};
pub use settings::{init_tracing, load_settings, DeriverSettings, SettingsError};

/// Stateful engine that advances a derivation pipeline one step at a time.
///
/// Implementations are not reentrant. The controller owns its process, so a
/// single caller drives it at any moment.
#[async_trait]
pub trait DerivationProcess: Send {
    /// Consumer-side reference point a step advances toward.
    type Head: fmt::Debug + Send;
    type Payload: Send;
    /// Upstream progress marker, only used in log fields.
    type Origin: fmt::Display;

    fn origin(&self) -> Self::Origin;

    /// Clears internal stage state. Safe to call repeatedly.
    fn reset(&mut self);

    /// Called once the downstream consumer has finished its own reset.
    fn confirm_reset(&mut self);

    /// Runs one step. `Ok(None)` means progress was made but nothing is ready
    /// to deliver. Must return promptly once `cancel` fires.
    async fn step(
        &mut self,
        cancel: &CancellationToken,
        pending_head: Self::Head,
    ) -> Result<Option<Self::Payload>, DeriveError>;
}

/// Fire-and-forget target for outbound events.
pub trait EventSink<P>: Send + Sync {
    fn emit(&self, event: OutboundEvent<P>);
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
