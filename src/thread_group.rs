//! Creation and joining of the pool's fixed set of OS threads.
//!
//! [`ThreadFactory`] is the seam between the pool and the operating system:
//! the default implementation wraps `std::thread::Builder`, and tests inject
//! factories that fail partway through to exercise the pool's rollback path.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{error, warn};

/// Attributes applied to every thread spawned for a pool.
#[derive(Debug, Clone)]
pub struct ThreadAttributes {
    /// Prefix for thread names; the worker index is appended.
    pub name_prefix: String,

    /// Stack size in bytes, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for ThreadAttributes {
    fn default() -> Self {
        Self {
            name_prefix: "priopool-worker".to_string(),
            stack_size: None,
        }
    }
}

/// Spawns a single OS thread running `entry`.
pub trait ThreadFactory: Send + Sync {
    fn spawn(
        &self,
        index: usize,
        entry: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>>;
}

/// Factory backed by `std::thread::Builder`.
#[derive(Debug, Clone, Default)]
pub struct DefaultThreadFactory {
    attributes: ThreadAttributes,
}

impl DefaultThreadFactory {
    pub fn new(attributes: ThreadAttributes) -> Self {
        Self { attributes }
    }
}

impl ThreadFactory for DefaultThreadFactory {
    fn spawn(
        &self,
        index: usize,
        entry: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new()
            .name(format!("{}-{}", self.attributes.name_prefix, index));
        if let Some(stack_size) = self.attributes.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(entry)
    }
}

/// Owns the join handles of a fixed set of worker threads.
#[derive(Debug, Default)]
pub struct ThreadGroup {
    handles: Vec<JoinHandle<()>>,
}

impl ThreadGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns up to `count` threads running `entry` and returns the number
    /// actually started. Stops at the first spawn failure.
    pub fn add_threads<F>(&mut self, factory: &dyn ThreadFactory, entry: F, count: usize) -> usize
    where
        F: Fn() + Send + Clone + 'static,
    {
        let mut started = 0;
        for index in 0..count {
            let entry = entry.clone();
            match factory.spawn(index, Box::new(move || entry())) {
                Ok(handle) => {
                    self.handles.push(handle);
                    started += 1;
                }
                Err(err) => {
                    warn!(index, error = %err, "failed to spawn worker thread");
                    break;
                }
            }
        }
        started
    }

    /// Blocks until every created thread has returned.
    pub fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked before it could be joined");
            }
        }
    }

    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }
}
