use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure categories a derivation step can report.
///
/// Variants are declared in precedence order: when one failure satisfies more
/// than one condition, the smallest kind (by `Ord`) is the one that counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No more data at the current frontier.
    Exhausted,
    /// The downstream consumer cannot accept output right now.
    ConsumerSyncing,
    /// Derivation state is inconsistent and must be reset from the top.
    ResetRequired,
    Temporary,
    Critical,
    /// No forward progress, but nothing is faulted.
    InsufficientData,
    Unclassified,
}

impl ErrorKind {
    pub const PRECEDENCE: [ErrorKind; 7] = [
        ErrorKind::Exhausted,
        ErrorKind::ConsumerSyncing,
        ErrorKind::ResetRequired,
        ErrorKind::Temporary,
        ErrorKind::Critical,
        ErrorKind::InsufficientData,
        ErrorKind::Unclassified,
    ];

    /// Picks the winning kind among every condition that applies to a failure.
    pub fn resolve(kinds: impl IntoIterator<Item = ErrorKind>) -> ErrorKind {
        kinds.into_iter().min().unwrap_or(ErrorKind::Unclassified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Exhausted => "exhausted",
            ErrorKind::ConsumerSyncing => "consumer_syncing",
            ErrorKind::ResetRequired => "reset_required",
            ErrorKind::Temporary => "temporary",
            ErrorKind::Critical => "critical",
            ErrorKind::InsufficientData => "insufficient_data",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker cause for a step whose cancellation token fired before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("derivation step cancelled")]
pub struct StepCancelled;

/// A failed derivation step: one [`ErrorKind`] plus the underlying cause.
///
/// The cause is shared so outbound events holding it stay cheap to clone for
/// fan-out to several subscribers.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {cause:#}")]
pub struct DeriveError {
    kind: ErrorKind,
    cause: Arc<anyhow::Error>,
}

impl DeriveError {
    pub fn new(kind: ErrorKind, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            cause: Arc::new(cause.into()),
        }
    }

    pub fn msg<M>(kind: ErrorKind, message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::new(kind, anyhow::Error::msg(message))
    }

    /// Builds an error from every condition that holds, keeping the one with
    /// the highest precedence.
    pub fn from_conditions(
        kinds: impl IntoIterator<Item = ErrorKind>,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::resolve(kinds), cause)
    }

    pub fn exhausted() -> Self {
        Self::msg(ErrorKind::Exhausted, "no more data at current frontier")
    }

    pub fn consumer_syncing(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::ConsumerSyncing, cause)
    }

    pub fn reset_required(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::ResetRequired, cause)
    }

    pub fn temporary(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::Temporary, cause)
    }

    pub fn critical(cause: impl Into<anyhow::Error>) -> Self {
        Self::new(ErrorKind::Critical, cause)
    }

    pub fn insufficient_data() -> Self {
        Self::msg(ErrorKind::InsufficientData, "not enough data")
    }

    /// A step interrupted by its cancellation token. Reported as a temporary
    /// fault so the caller retries after backoff.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Temporary, StepCancelled)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause.is::<StepCancelled>()
    }
}

impl From<anyhow::Error> for DeriveError {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorKind::Unclassified, value)
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
