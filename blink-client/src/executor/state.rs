use blink_common::dto::ActionMetadata;
use strum_macros::Display;

/// Lifecycle of an executor.
///
/// ```text
/// idle -> loading -> ready | error
/// ready -> executing -> success | error
/// success | error -> ready (reset)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionState {
    #[default]
    Idle,
    Loading,
    Ready,
    Executing,
    Success,
    Error,
}

/// Point in time view of an executor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutorSnapshot {
    pub state: ExecutionState,
    /// Last successfully fetched and validated metadata.
    pub metadata: Option<ActionMetadata>,
    pub error: Option<String>,
    /// Hash of the most recent transaction the wallet broadcast.
    pub last_hash: Option<String>,
    /// Message attached to the last transaction response.
    pub message: Option<String>,
    pub next_action: Option<ActionMetadata>,
}
