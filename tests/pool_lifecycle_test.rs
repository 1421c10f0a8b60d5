#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use priopool::{EnqueueError, MultipriorityThreadPool};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[test]
    fn construct_and_drop_without_starting() {
        for (threads, priorities) in [(1, 1), (4, 3), (16, 32)] {
            let pool = MultipriorityThreadPool::new(threads, priorities);
            assert_eq!(pool.num_threads(), threads);
            assert_eq!(pool.num_priorities(), priorities);
            assert!(!pool.is_started());
            assert!(!pool.is_suspended());
            assert!(pool.is_enabled());
            assert_eq!(pool.num_started_threads(), 0);
            assert_eq!(pool.num_active_threads(), 0);
            assert_eq!(pool.num_pending_jobs(), 0);
        }
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        init_tracing();
        let pool = MultipriorityThreadPool::new(3, 1);

        pool.start_threads().unwrap();
        pool.start_threads().unwrap();
        assert!(pool.is_started());
        assert_eq!(pool.num_started_threads(), 3);

        pool.stop_threads();
        pool.stop_threads();
        assert!(!pool.is_started());
        assert_eq!(pool.num_started_threads(), 0);

        // The start/stop cycle can be repeated.
        pool.start_threads().unwrap();
        assert!(pool.is_started());
        pool.stop_threads();
    }

    #[test]
    fn two_workers_run_every_accepted_job_exactly_once() {
        init_tracing();
        let pool = MultipriorityThreadPool::new(2, 1);
        pool.start_threads().unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let log = Arc::clone(&log);
            pool.enqueue_job(move || log.lock().unwrap().push(id), 0)
                .unwrap();
        }

        pool.drain_jobs();
        pool.stop_threads();

        let mut log = log.lock().unwrap().clone();
        log.sort_unstable();
        assert_eq!(log, vec![0, 1, 2]);
        assert!(!pool.is_started());
    }

    #[test]
    fn disabled_queue_rejects_enqueues() {
        let pool = MultipriorityThreadPool::new(1, 1);

        assert!(pool.is_enabled());
        pool.disable_queue();
        assert!(!pool.is_enabled());
        assert_eq!(pool.enqueue_job(|| {}, 0), Err(EnqueueError::Disabled));

        pool.enable_queue();
        assert!(pool.is_enabled());
        pool.enqueue_job(|| {}, 0).unwrap();
        assert_eq!(pool.num_pending_jobs(), 1);
        pool.remove_jobs();
    }

    #[test]
    fn shutdown_is_an_idempotent_composite_teardown() {
        let pool = MultipriorityThreadPool::new(2, 1);
        pool.start_threads().unwrap();

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

        pool.shutdown();
        assert!(!pool.is_started());
        assert!(!pool.is_enabled());
        assert_eq!(pool.num_pending_jobs(), 0);
        assert_eq!(pool.enqueue_job(|| {}, 0), Err(EnqueueError::Disabled));

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_while_suspended_then_restart() {
        let pool = MultipriorityThreadPool::new(2, 1);
        pool.start_threads().unwrap();
        pool.suspend_processing();
        pool.stop_threads();
        assert!(!pool.is_started());
        assert!(pool.is_suspended());

        // Restarting a suspended pool parks the new workers immediately.
        pool.start_threads().unwrap();
        assert!(pool.is_started());
        assert!(pool.is_suspended());
        assert_eq!(pool.num_active_threads(), 0);

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
        pool.resume_processing();
        pool.drain_jobs();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        pool.stop_threads();
    }
}
