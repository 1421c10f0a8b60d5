/// A unit of work held by the pool's queue.
///
/// `Sentinel` is an internal wake-up signal: it unblocks a worker parked in
/// the queue's blocking pop so the worker re-reads the pool state. Sentinels
/// never execute user code and are never counted as active work.
pub(crate) enum Job {
    Work(Box<dyn FnOnce() + Send + 'static>),
    Sentinel,
}

impl Job {
    pub(crate) fn work<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Job::Work(Box::new(f))
    }
}
