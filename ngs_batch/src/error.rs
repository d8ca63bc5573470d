use thiserror::Error;

use crate::job::{ReadMode, Tool};

/// A job whose inputs are inconsistent with its tool and read mode.
/// Such a job is skipped with a message to the sink; it never aborts the
/// rest of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{tool} ({mode}) requires both mate files")]
    MissingMates { tool: Tool, mode: ReadMode },
    #[error("{tool} (SE) requires a single-end read file")]
    MissingSingle { tool: Tool },
    #[error("unicycler (PE) requires R1+R2, single reads or long reads")]
    MissingUnicyclerPaired,
    #[error("unicycler (SE) requires single reads or long reads")]
    MissingUnicyclerSingle,
    #[error("threads must be at least 1")]
    NoThreads,
}

/// Rejected controller operation; the controller state is unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("batch is already running")]
    AlreadyRunning,
    #[error("batch queue is empty")]
    EmptyQueue,
}
