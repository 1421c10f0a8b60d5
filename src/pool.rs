//! # Multipriority thread pool
//!
//! A fixed set of OS worker threads draining a shared multi-priority job
//! queue. The pool supports live start/stop, suspend/resume, draining, and
//! removal of pending jobs.
//!
//! ## Coordination protocol
//! Two locks with a fixed acquisition order prevent deadlock:
//! - The **control lock** is taken first and held for the full duration of
//!   every transition-initiating call (start, stop, suspend), so at most one
//!   such transition is ever in flight. Its guarded data is the
//!   [`ThreadGroup`] itself: holding the control lock is what grants access
//!   to the thread handles.
//! - The **state lock** is taken second. It protects the two state enums and
//!   the started/suspended counters, and is released around every blocking
//!   wait and thread join so a worker that needs it to make progress is never
//!   blocked behind a long controller operation.
//!
//! ## Worker wake-ups
//! A worker idles inside the queue's blocking pop. Control operations that
//! must get such a worker's attention push one sentinel job per thread
//! to the front of the queue; a worker that pops a sentinel performs no work
//! and loops back to re-read the pool state. Sentinels a busy worker never
//! pops stay in the queue and are ignored when eventually popped, and are
//! cleared by [`MultipriorityThreadPool::remove_jobs`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Condvar, Mutex};
use std::thread;

use tracing::{debug, error, info, warn};

use crate::error::{EnqueueError, StartError};
use crate::job::Job;
use crate::queue::MultipriorityQueue;
use crate::thread_group::{DefaultThreadFactory, ThreadAttributes, ThreadFactory, ThreadGroup};

/// Configuration for a [`MultipriorityThreadPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the lifetime of the pool.
    pub num_threads: usize,

    /// Number of priority lanes; lane 0 is the most urgent.
    pub num_priorities: usize,

    /// Attributes applied to every spawned worker thread.
    pub thread_attributes: ThreadAttributes,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            num_priorities: 1,
            thread_attributes: ThreadAttributes::default(),
        }
    }
}

/// One-directional start/stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuspendState {
    Suspended,
    Suspending,
    Resumed,
}

#[derive(Debug)]
struct PoolState {
    start: StartState,
    suspend: SuspendState,
    num_started: usize,
    num_suspended: usize,
}

/// State shared between the controller and the worker threads.
struct PoolShared {
    num_threads: usize,
    queue: MultipriorityQueue<Job>,
    state: Mutex<PoolState>,
    /// Signaled when the start barrier completes (or start is abandoned).
    start_cond: Condvar,
    /// Signaled by the last worker to park at the suspend barrier.
    suspend_cond: Condvar,
    /// Signaled to wake workers parked while suspended.
    resume_cond: Condvar,
    /// Number of workers currently inside a job body.
    num_active: AtomicUsize,
}

impl PoolShared {
    /// Entry function of every worker thread.
    fn worker_loop(&self) {
        // Start barrier: the thread completing the set flips the pool to
        // Started; the rest wait for the flip (or for Stopping, if thread
        // creation failed elsewhere and the start is being rolled back).
        let mut st = self.state.lock().unwrap();
        st.num_started += 1;
        if st.num_started == self.num_threads {
            st.start = StartState::Started;
            self.start_cond.notify_all();
        } else {
            while st.start == StartState::Starting {
                st = self.start_cond.wait(st).unwrap();
            }
        }
        drop(st);

        loop {
            {
                let mut st = self.state.lock().unwrap();
                loop {
                    if st.start == StartState::Stopping {
                        st.num_started -= 1;
                        return;
                    }
                    if st.suspend == SuspendState::Suspending {
                        st.num_suspended += 1;
                        if st.num_suspended == st.num_started {
                            st.suspend = SuspendState::Suspended;
                            self.suspend_cond.notify_all();
                        }
                        while st.suspend != SuspendState::Resumed
                            && st.start != StartState::Stopping
                        {
                            st = self.resume_cond.wait(st).unwrap();
                        }
                        st.num_suspended -= 1;
                        continue;
                    }
                    debug_assert_eq!(st.start, StartState::Started);
                    debug_assert_eq!(st.suspend, SuspendState::Resumed);
                    break;
                }
            }

            // Idle suspension point: blocks until a job or sentinel arrives.
            let (job, _priority) = self.queue.pop_front();
            if let Job::Work(work) = job {
                self.num_active.fetch_add(1, Ordering::SeqCst);
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
                    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic payload".to_string()
                    };
                    error!(panic = %msg, "job panicked in worker thread");
                }
                self.num_active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

/// A fixed-size thread pool scheduling jobs across multiple priority lanes.
///
/// Created stopped and resumed with zero counters; must be stopped again
/// (via [`stop_threads`](Self::stop_threads) or [`shutdown`](Self::shutdown))
/// before it is dropped.
pub struct MultipriorityThreadPool {
    shared: Arc<PoolShared>,
    /// Control lock; always acquired before the state lock.
    control: Mutex<ThreadGroup>,
    factory: Arc<dyn ThreadFactory>,
}

impl MultipriorityThreadPool {
    /// Creates a stopped pool with `num_threads` workers and `num_priorities`
    /// job lanes, using the default thread attributes.
    pub fn new(num_threads: usize, num_priorities: usize) -> Self {
        Self::with_config(PoolConfig {
            num_threads,
            num_priorities,
            thread_attributes: ThreadAttributes::default(),
        })
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let factory = Arc::new(DefaultThreadFactory::new(config.thread_attributes));
        Self::with_thread_factory(config.num_threads, config.num_priorities, factory)
    }

    /// Creates a pool whose worker threads are spawned through `factory`.
    pub fn with_thread_factory(
        num_threads: usize,
        num_priorities: usize,
        factory: Arc<dyn ThreadFactory>,
    ) -> Self {
        assert!(num_threads >= 1, "a pool needs at least one worker thread");
        Self {
            shared: Arc::new(PoolShared {
                num_threads,
                queue: MultipriorityQueue::new(num_priorities),
                state: Mutex::new(PoolState {
                    start: StartState::Stopped,
                    suspend: SuspendState::Resumed,
                    num_started: 0,
                    num_suspended: 0,
                }),
                start_cond: Condvar::new(),
                suspend_cond: Condvar::new(),
                resume_cond: Condvar::new(),
                num_active: AtomicUsize::new(0),
            }),
            control: Mutex::new(ThreadGroup::new()),
            factory,
        }
    }

    /// Starts the pool's worker threads; a no-op on an already started pool.
    ///
    /// Blocks until every worker has reached its initial parking point. On
    /// partial thread-creation failure, every thread that did start is torn
    /// down again and the pool is left in a consistent stopped state, so the
    /// caller may retry.
    pub fn start_threads(&self) -> Result<(), StartError> {
        let mut group = self.control.lock().unwrap();

        let was_suspended;
        {
            let mut st = self.shared.state.lock().unwrap();
            if st.start == StartState::Started {
                return Ok(());
            }
            debug_assert_eq!(st.start, StartState::Stopped);
            was_suspended = st.suspend == SuspendState::Suspended;
            st.start = StartState::Starting;
            if was_suspended {
                // New threads must park at the suspend barrier instead of
                // racing into the queue.
                st.suspend = SuspendState::Suspending;
            }
        }

        let shared = Arc::clone(&self.shared);
        let started = group.add_threads(
            self.factory.as_ref(),
            move || shared.worker_loop(),
            self.shared.num_threads,
        );

        let mut st = self.shared.state.lock().unwrap();
        if started == self.shared.num_threads {
            if was_suspended {
                while st.suspend != SuspendState::Suspended {
                    st = self.shared.suspend_cond.wait(st).unwrap();
                }
            } else {
                while st.start != StartState::Started {
                    st = self.shared.start_cond.wait(st).unwrap();
                }
            }
            info!(threads = self.shared.num_threads, suspended = was_suspended, "pool started");
            Ok(())
        } else {
            warn!(
                requested = self.shared.num_threads,
                started, "thread creation fell short; rolling back"
            );
            st.start = StartState::Stopping;
            // Threads already parked at the start barrier must exit rather
            // than wait for a completion that will never come.
            self.shared.start_cond.notify_all();
            drop(st);

            group.join_all();

            let mut st = self.shared.state.lock().unwrap();
            st.suspend = if was_suspended {
                SuspendState::Suspended
            } else {
                SuspendState::Resumed
            };
            st.start = StartState::Stopped;
            debug_assert_eq!(st.num_started, 0);
            debug_assert_eq!(st.num_suspended, 0);
            Err(StartError::ThreadCreation {
                requested: self.shared.num_threads,
                started,
            })
        }
    }

    /// Stops and joins every worker thread; a no-op on a stopped pool.
    ///
    /// Pending jobs are left in the queue and run if the pool is started
    /// again.
    pub fn stop_threads(&self) {
        let mut group = self.control.lock().unwrap();
        {
            let mut st = self.shared.state.lock().unwrap();
            if st.start == StartState::Stopped {
                return;
            }
            debug_assert_eq!(st.start, StartState::Started);
            st.start = StartState::Stopping;
            if st.suspend == SuspendState::Suspended {
                // Parked workers wake, observe Stopping, and exit.
                self.shared.resume_cond.notify_all();
            } else {
                // Unblock workers parked in the queue's pop.
                self.shared.queue.push_front_multiple_raw(
                    (0..self.shared.num_threads).map(|_| Job::Sentinel),
                    0,
                );
            }
        }

        group.join_all();

        let mut st = self.shared.state.lock().unwrap();
        st.start = StartState::Stopped;
        debug_assert_eq!(st.num_started, 0);
        debug_assert_eq!(st.num_suspended, 0);
        debug_assert_eq!(self.shared.num_active.load(Ordering::SeqCst), 0);
        info!("pool stopped");
    }

    /// Suspends job processing; a no-op on a suspended pool.
    ///
    /// Blocks until every worker has finished its in-flight job and parked.
    /// Jobs may still be enqueued while suspended; none are dequeued until
    /// [`resume_processing`](Self::resume_processing).
    pub fn suspend_processing(&self) {
        let _group = self.control.lock().unwrap();
        let mut st = self.shared.state.lock().unwrap();
        if st.suspend == SuspendState::Suspended {
            return;
        }
        if st.start != StartState::Started {
            // No live workers to coordinate with.
            st.suspend = SuspendState::Suspended;
            return;
        }
        st.suspend = SuspendState::Suspending;
        self.shared.queue.push_front_multiple_raw(
            (0..self.shared.num_threads).map(|_| Job::Sentinel),
            0,
        );
        while st.suspend != SuspendState::Suspended {
            st = self.shared.suspend_cond.wait(st).unwrap();
        }
        debug!("processing suspended");
    }

    /// Resumes job processing; a no-op on a resumed pool.
    ///
    /// Unlike start/stop/suspend, resume never blocks, so the control lock is
    /// only held for the idempotence check and the broadcast.
    pub fn resume_processing(&self) {
        let _group = self.control.lock().unwrap();
        let mut st = self.shared.state.lock().unwrap();
        if st.suspend == SuspendState::Resumed {
            return;
        }
        st.suspend = SuspendState::Resumed;
        self.shared.resume_cond.notify_all();
        debug!("processing resumed");
    }

    /// Blocks until every job enqueued strictly before this call has
    /// completed. Gives no guarantee for jobs enqueued concurrently.
    ///
    /// # Panics
    /// The pool must be started and resumed; otherwise this call could wait
    /// forever, so the precondition is asserted.
    pub fn drain_jobs(&self) {
        let _group = self.control.lock().unwrap();
        {
            let st = self.shared.state.lock().unwrap();
            assert!(
                st.start == StartState::Started && st.suspend == SuspendState::Resumed,
                "drain_jobs requires a started, resumed pool"
            );
        }

        // One rendezvous job per worker at the least urgent priority: each
        // runs only after all previously queued work at every level, and the
        // barrier completes only once every worker and the caller arrive.
        let barrier = Arc::new(Barrier::new(self.shared.num_threads + 1));
        let lowest = self.shared.queue.num_priorities() - 1;
        self.shared.queue.push_back_multiple_raw(
            (0..self.shared.num_threads).map(|_| {
                let barrier = Arc::clone(&barrier);
                Job::work(move || {
                    barrier.wait();
                })
            }),
            lowest,
        );
        barrier.wait();
        debug!("queue drained");
    }

    /// Discards all pending (not yet dequeued) jobs, including any stale
    /// internal sentinels. In-flight jobs are unaffected.
    pub fn remove_jobs(&self) {
        let _group = self.control.lock().unwrap();
        self.shared.queue.remove_all();
    }

    /// Composite teardown: disables the queue, discards pending jobs, and
    /// stops the workers. Idempotent.
    pub fn shutdown(&self) {
        self.disable_queue();
        self.remove_jobs();
        self.stop_threads();
    }

    /// Enqueues `job` at `priority` (0 = most urgent).
    ///
    /// Fails with [`EnqueueError::Disabled`] if the queue is disabled. An
    /// accepted job executes exactly once, unless it is discarded while still
    /// pending by [`remove_jobs`](Self::remove_jobs) or
    /// [`shutdown`](Self::shutdown).
    ///
    /// # Panics
    /// `priority` must be less than [`num_priorities`](Self::num_priorities).
    pub fn enqueue_job<F>(&self, job: F, priority: usize) -> Result<(), EnqueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        assert!(
            priority < self.shared.queue.num_priorities(),
            "priority {priority} out of range"
        );
        self.shared.queue.push_back(Job::work(job), priority)
    }

    /// Allows `enqueue_job` to accept jobs again.
    pub fn enable_queue(&self) {
        self.shared.queue.enable();
    }

    /// Makes `enqueue_job` reject jobs. Already queued jobs still run.
    pub fn disable_queue(&self) {
        self.shared.queue.disable();
    }

    pub fn is_started(&self) -> bool {
        self.shared.state.lock().unwrap().start == StartState::Started
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.state.lock().unwrap().suspend == SuspendState::Suspended
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.queue.is_enabled()
    }

    /// Number of workers currently inside a job body.
    pub fn num_active_threads(&self) -> usize {
        self.shared.num_active.load(Ordering::SeqCst)
    }

    /// Number of jobs waiting in the queue. May transiently include stale
    /// internal sentinels left behind by a stop or suspend.
    pub fn num_pending_jobs(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn num_started_threads(&self) -> usize {
        self.shared.state.lock().unwrap().num_started
    }

    pub fn num_threads(&self) -> usize {
        self.shared.num_threads
    }

    pub fn num_priorities(&self) -> usize {
        self.shared.queue.num_priorities()
    }
}

impl std::fmt::Debug for MultipriorityThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.shared.state.lock().unwrap();
        f.debug_struct("MultipriorityThreadPool")
            .field("num_threads", &self.shared.num_threads)
            .field("num_priorities", &self.shared.queue.num_priorities())
            .field("start_state", &st.start)
            .field("suspend_state", &st.suspend)
            .field("num_started", &st.num_started)
            .finish()
    }
}

impl Drop for MultipriorityThreadPool {
    fn drop(&mut self) {
        if !thread::panicking() {
            let st = self.shared.state.lock().unwrap();
            assert_eq!(
                st.start,
                StartState::Stopped,
                "pool dropped while running; call stop_threads() or shutdown() first"
            );
        }
    }
}
