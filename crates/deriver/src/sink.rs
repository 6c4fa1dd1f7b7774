use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::{EventSink, OutboundEvent};

/// Fans events out to every live subscriber.
impl<P> EventSink<P> for broadcast::Sender<OutboundEvent<P>>
where
    P: Send,
{
    fn emit(&self, event: OutboundEvent<P>) {
        let name = event.name();
        if self.send(event).is_err() {
            warn!(event = name, "deriver event dropped: no subscribers");
        }
    }
}

impl<P> EventSink<P> for mpsc::UnboundedSender<OutboundEvent<P>>
where
    P: Send,
{
    fn emit(&self, event: OutboundEvent<P>) {
        let name = event.name();
        if self.send(event).is_err() {
            warn!(event = name, "deriver event dropped: receiver closed");
        }
    }
}

impl<P, S> EventSink<P> for Arc<S>
where
    S: EventSink<P> + ?Sized,
{
    fn emit(&self, event: OutboundEvent<P>) {
        (**self).emit(event);
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<P, F> EventSink<P> for FnSink<F>
where
    F: Fn(OutboundEvent<P>) + Send + Sync,
{
    fn emit(&self, event: OutboundEvent<P>) {
        (self.0)(event);
    }
}

#[cfg(test)]
#[path = "tests/sink_tests.rs"]
mod tests;
