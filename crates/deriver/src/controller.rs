use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::{
    settings::DeriverSettings, DerivationProcess, ErrorKind, EventSink, InboundEvent,
    OutboundEvent, StepOutcome,
};

/// Translates inbound control events into calls on a [`DerivationProcess`]
/// and step outcomes into outbound events.
///
/// Holds no state across calls beyond the process, the sink and its
/// configuration. `handle` takes `&mut self`; callers dispatching from
/// several tasks must serialize access to one controller.
pub struct StepController<D, S> {
    process: D,
    sink: S,
    step_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl<D, S> StepController<D, S>
where
    D: DerivationProcess,
    S: EventSink<D::Payload>,
{
    pub fn new(process: D, sink: S) -> Self {
        Self {
            process,
            sink,
            step_timeout: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_settings(process: D, sink: S, settings: &DeriverSettings) -> Self {
        Self::new(process, sink).with_step_timeout(settings.step_timeout())
    }

    pub fn with_step_timeout(mut self, step_timeout: Option<Duration>) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Every step runs under a child of `shutdown`; cancelling it interrupts
    /// an in-flight step.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn process(&self) -> &D {
        &self.process
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (D, S) {
        (self.process, self.sink)
    }

    pub async fn handle(&mut self, event: InboundEvent<D::Head>) {
        match event {
            InboundEvent::Reset => {
                debug!(event = "reset", "resetting derivation process");
                self.process.reset();
            }
            InboundEvent::Step { pending_head } => {
                trace!(
                    onto_origin = %self.process.origin(),
                    pending_head = ?pending_head,
                    "derivation pipeline step"
                );
                let outcome = self.run_step(pending_head).await;
                let event = self.classify(outcome);
                trace!(event = event.name(), "emitting deriver event");
                self.sink.emit(event);
            }
            InboundEvent::ConfirmReset => {
                debug!(
                    event = "confirm-pipeline-reset",
                    "confirming derivation process reset"
                );
                self.process.confirm_reset();
            }
        }
    }

    async fn run_step(&mut self, pending_head: D::Head) -> StepOutcome<D::Payload> {
        let cancel = self.shutdown.child_token();
        let deadline = self.step_timeout;
        let mut step = self.process.step(&cancel, pending_head);

        let result = match deadline {
            Some(limit) => {
                tokio::select! {
                    result = &mut step => result,
                    () = tokio::time::sleep(limit) => {
                        debug!(
                            timeout = ?limit,
                            "derivation step passed its deadline; cancelling"
                        );
                        cancel.cancel();
                        step.await
                    }
                }
            }
            None => step.await,
        };

        StepOutcome::from(result)
    }

    fn classify(&self, outcome: StepOutcome<D::Payload>) -> OutboundEvent<D::Payload> {
        let err = match outcome {
            StepOutcome::Derived(payload) => return OutboundEvent::DerivedAttributes(payload),
            // progress without output; ask to be stepped again
            StepOutcome::Progressed => return OutboundEvent::More,
            StepOutcome::Failed(err) => err,
        };

        match err.kind() {
            ErrorKind::Exhausted => {
                debug!(
                    progress = %self.process.origin(),
                    err = %err,
                    "derivation process went idle"
                );
                OutboundEvent::Idle
            }
            ErrorKind::ConsumerSyncing => {
                debug!(
                    progress = %self.process.origin(),
                    err = %err,
                    "derivation process went idle because the consumer is syncing"
                );
                OutboundEvent::Idle
            }
            ErrorKind::ResetRequired => OutboundEvent::ResetRequested(err),
            ErrorKind::Temporary => OutboundEvent::TemporaryError(err),
            ErrorKind::Critical => OutboundEvent::CriticalError(err),
            // no backoff: starved of data, not faulted
            ErrorKind::InsufficientData => OutboundEvent::More,
            ErrorKind::Unclassified => {
                error!(err = %err, "unexpected derivation process error");
                OutboundEvent::TemporaryError(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
