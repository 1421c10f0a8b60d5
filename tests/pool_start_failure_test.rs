#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread::JoinHandle;

    use priopool::{DefaultThreadFactory, MultipriorityThreadPool, StartError, ThreadFactory};

    /// Injects spawn failures: while `failing` is set, refuses to create any
    /// thread past the first `allowed`.
    struct FlakyFactory {
        failing: AtomicBool,
        allowed: usize,
        inner: DefaultThreadFactory,
    }

    impl FlakyFactory {
        fn new(allowed: usize) -> Self {
            Self {
                failing: AtomicBool::new(true),
                allowed,
                inner: DefaultThreadFactory::default(),
            }
        }
    }

    impl ThreadFactory for FlakyFactory {
        fn spawn(
            &self,
            index: usize,
            entry: Box<dyn FnOnce() + Send + 'static>,
        ) -> io::Result<JoinHandle<()>> {
            if self.failing.load(Ordering::SeqCst) && index >= self.allowed {
                return Err(io::Error::other("injected spawn failure"));
            }
            self.inner.spawn(index, entry)
        }
    }

    #[test]
    fn failed_start_rolls_back_and_can_be_retried() {
        let factory = Arc::new(FlakyFactory::new(2));
        let pool = MultipriorityThreadPool::with_thread_factory(
            4,
            1,
            Arc::clone(&factory) as Arc<dyn ThreadFactory>,
        );

        assert_eq!(
            pool.start_threads(),
            Err(StartError::ThreadCreation { requested: 4, started: 2 })
        );
        assert!(!pool.is_started());
        assert_eq!(pool.num_started_threads(), 0);
        assert_eq!(pool.num_active_threads(), 0);

        // The rollback left the pool consistent; retrying succeeds once
        // spawning works again.
        factory.failing.store(false, Ordering::SeqCst);
        pool.start_threads().unwrap();
        assert!(pool.is_started());
        assert_eq!(pool.num_started_threads(), 4);

        let counter = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&counter);
            pool.enqueue_job(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                0,
            )
            .unwrap();
        }
        pool.drain_jobs();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.stop_threads();
    }

    #[test]
    fn failed_start_restores_the_suspended_state() {
        let factory = Arc::new(FlakyFactory::new(1));
        let pool = MultipriorityThreadPool::with_thread_factory(
            3,
            2,
            Arc::clone(&factory) as Arc<dyn ThreadFactory>,
        );

        pool.suspend_processing();
        assert!(pool.is_suspended());

        assert_eq!(
            pool.start_threads(),
            Err(StartError::ThreadCreation { requested: 3, started: 1 })
        );
        assert!(!pool.is_started());
        assert!(pool.is_suspended());
        assert_eq!(pool.num_started_threads(), 0);

        factory.failing.store(false, Ordering::SeqCst);
        pool.start_threads().unwrap();
        assert!(pool.is_started());
        assert!(pool.is_suspended());

        pool.resume_processing();
        pool.stop_threads();
    }

    #[test]
    fn no_thread_at_all_still_reports_failure_cleanly() {
        let factory = Arc::new(FlakyFactory::new(0));
        let pool = MultipriorityThreadPool::with_thread_factory(
            2,
            1,
            Arc::clone(&factory) as Arc<dyn ThreadFactory>,
        );

        assert_eq!(
            pool.start_threads(),
            Err(StartError::ThreadCreation { requested: 2, started: 0 })
        );
        assert!(!pool.is_started());
        assert_eq!(pool.num_started_threads(), 0);
    }
}
