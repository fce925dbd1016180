use ethereum_types::H256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeSetError {
    #[error("range set is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum StagedQueueError {
    #[error("duplicate staged-queue key {0}")]
    DuplicateKey(u64),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("persisted layout has wrong length: expected {expected}, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("persisted layout has unknown state tag {0}")]
    UnknownState(u8),
}

#[derive(Debug, Error)]
pub enum BeaconSyncError {
    #[error("range set error: {0}")]
    RangeSet(#[from] RangeSetError),

    #[error("staged queue error: {0}")]
    StagedQueue(#[from] StagedQueueError),

    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("storage error: {0}")]
    Storage(#[from] ethereum_storage::StorageError),

    #[error("wire error: {0}")]
    Wire(String),

    #[error("forkchoice import failed: {0}")]
    Import(String),

    #[error("fork choice update failed: {0}")]
    ForkChoice(String),

    #[error("header {0:?} not known to forkchoice")]
    UnknownHeader(H256),

    #[error("no active sync target")]
    NoTarget,
}

impl BeaconSyncError {
    /// True for errors that signal a broken engine invariant rather than a
    /// recoverable peer/storage fault — a duplicate staged-queue key can
    /// only happen if two fetch passes raced over the same range, which the
    /// single-writer commit mutex is supposed to rule out.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, BeaconSyncError::StagedQueue(StagedQueueError::DuplicateKey(_)))
    }
}

pub type Result<T> = std::result::Result<T, BeaconSyncError>;
