//! In-memory collaborators shared by the crate's unit tests.

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use crate::{DerivationProcess, DeriveError, EventSink, OutboundEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Reset,
    ConfirmReset,
    Step(u64),
}

/// Replays a fixed list of step results; an empty script reports exhaustion.
pub(crate) struct ScriptedProcess {
    script: VecDeque<Result<Option<String>, DeriveError>>,
    calls: Vec<Call>,
    origin: u64,
}

impl ScriptedProcess {
    pub(crate) fn new(script: Vec<Result<Option<String>, DeriveError>>) -> Self {
        Self {
            script: script.into(),
            calls: Vec::new(),
            origin: 100,
        }
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }
}

#[async_trait]
impl DerivationProcess for ScriptedProcess {
    type Head = u64;
    type Payload = String;
    type Origin = u64;

    fn origin(&self) -> u64 {
        self.origin
    }

    fn reset(&mut self) {
        self.calls.push(Call::Reset);
        self.origin = 100;
    }

    fn confirm_reset(&mut self) {
        self.calls.push(Call::ConfirmReset);
    }

    async fn step(
        &mut self,
        _cancel: &CancellationToken,
        pending_head: u64,
    ) -> Result<Option<String>, DeriveError> {
        self.calls.push(Call::Step(pending_head));
        self.origin += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(DeriveError::exhausted()))
    }
}

/// Never finishes a step on its own; returns only once cancelled.
#[derive(Default)]
pub(crate) struct StalledProcess {
    pub(crate) steps: u32,
}

#[async_trait]
impl DerivationProcess for StalledProcess {
    type Head = u64;
    type Payload = String;
    type Origin = &'static str;

    fn origin(&self) -> &'static str {
        "stalled"
    }

    fn reset(&mut self) {}

    fn confirm_reset(&mut self) {}

    async fn step(
        &mut self,
        cancel: &CancellationToken,
        _pending_head: u64,
    ) -> Result<Option<String>, DeriveError> {
        self.steps += 1;
        cancel.cancelled().await;
        Err(DeriveError::cancelled())
    }
}

pub(crate) struct RecordingSink<P> {
    events: Arc<Mutex<Vec<OutboundEvent<P>>>>,
}

impl<P> Clone for RecordingSink<P> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<P> RecordingSink<P> {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn take(&self) -> Vec<OutboundEvent<P>> {
        std::mem::take(&mut *self.events.lock().expect("sink lock"))
    }
}

impl<P: Send> EventSink<P> for RecordingSink<P> {
    fn emit(&self, event: OutboundEvent<P>) {
        self.events.lock().expect("sink lock").push(event);
    }
}

#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's log records into a buffer until the guard drops.
pub(crate) fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
