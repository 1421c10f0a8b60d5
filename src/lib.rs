//! A fixed-size worker thread pool that schedules jobs across multiple
//! priority lanes.
//!
//! [`MultipriorityThreadPool`] owns a fixed set of OS threads and a
//! [`MultipriorityQueue`](queue::MultipriorityQueue) of pending jobs. Jobs at
//! a lower-numbered (more urgent) priority are dequeued before earlier-queued
//! jobs at higher-numbered priorities. The pool supports live start/stop,
//! suspend/resume, draining, and removal of pending jobs, and guarantees that
//! an accepted job executes exactly once unless it is discarded while still
//! pending.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use priopool::MultipriorityThreadPool;
//!
//! let pool = MultipriorityThreadPool::new(4, 2);
//! pool.start_threads().unwrap();
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let c = Arc::clone(&counter);
//! pool.enqueue_job(move || { c.fetch_add(1, Ordering::SeqCst); }, 1).unwrap();
//!
//! pool.drain_jobs();
//! assert_eq!(counter.load(Ordering::SeqCst), 1);
//! pool.shutdown();
//! ```

pub mod error;
pub mod pool;
pub mod queue;
pub mod thread_group;

mod job;

// Re-export key types for easier usage
pub use error::{EnqueueError, StartError};
pub use pool::{MultipriorityThreadPool, PoolConfig};
pub use thread_group::{DefaultThreadFactory, ThreadAttributes, ThreadFactory};
