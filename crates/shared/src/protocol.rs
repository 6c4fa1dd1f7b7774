use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeriveError;

/// Control events delivered to the step controller by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum InboundEvent<H> {
    Reset,
    Step { pending_head: H },
    ConfirmReset,
}

impl<H> InboundEvent<H> {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::Reset => "reset",
            InboundEvent::Step { .. } => "pipeline-step",
            InboundEvent::ConfirmReset => "confirm-pipeline-reset",
        }
    }
}

impl<H> fmt::Display for InboundEvent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events the step controller emits after handling a `Step`.
#[derive(Debug, Clone)]
pub enum OutboundEvent<P> {
    /// Stop stepping until new input arrives.
    Idle,
    /// Step again right away.
    More,
    DerivedAttributes(P),
    ResetRequested(DeriveError),
    TemporaryError(DeriveError),
    CriticalError(DeriveError),
}

impl<P> OutboundEvent<P> {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Idle => "derivation-idle",
            OutboundEvent::More => "deriver-more",
            OutboundEvent::DerivedAttributes(_) => "derived-attributes",
            OutboundEvent::ResetRequested(_) => "reset",
            OutboundEvent::TemporaryError(_) => "engine-temporary-error",
            OutboundEvent::CriticalError(_) => "critical-error",
        }
    }

    pub fn cause(&self) -> Option<&DeriveError> {
        match self {
            OutboundEvent::ResetRequested(err)
            | OutboundEvent::TemporaryError(err)
            | OutboundEvent::CriticalError(err) => Some(err),
            OutboundEvent::Idle | OutboundEvent::More | OutboundEvent::DerivedAttributes(_) => {
                None
            }
        }
    }

    pub fn into_payload(self) -> Option<P> {
        match self {
            OutboundEvent::DerivedAttributes(payload) => Some(payload),
            _ => None,
        }
    }
}

impl<P> fmt::Display for OutboundEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one derivation step, as seen by the controller.
#[derive(Debug)]
pub enum StepOutcome<P> {
    Derived(P),
    /// The step succeeded but has nothing to deliver yet.
    Progressed,
    Failed(DeriveError),
}

impl<P> From<Result<Option<P>, DeriveError>> for StepOutcome<P> {
    fn from(value: Result<Option<P>, DeriveError>) -> Self {
        match value {
            Ok(Some(payload)) => StepOutcome::Derived(payload),
            Ok(None) => StepOutcome::Progressed,
            Err(err) => StepOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
