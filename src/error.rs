use thiserror::Error;

/// Errors related to enqueueing jobs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("the job queue is disabled")]
    Disabled,
}

/// Errors related to starting the pool's worker threads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("only {started} of {requested} worker threads could be started")]
    ThreadCreation { requested: usize, started: usize },
}
