//! # Free Install Flow Integration
//!
//! Drives cm-02-free-install end to end through a real
//! `shared_sched::TimeoutScheduler`:
//!
//! 1. **submit → install → resume**: a dispatched install completes and
//!    resumes exactly its own submitter
//! 2. **submit → timeout**: a silent installer is bounded by the budget;
//!    a late completion is a no-op
//! 3. **cross-device fan-out**: registered remote waiters resolve FIFO

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use cm_02_free_install::{
        result_codes, AcquisitionConfig, AcquisitionContext, AcquisitionCoordinator,
        AcquisitionError, InstallObserver, Installer, InstallerError, QueryOutcome,
        RemoteCompletionSink, RequestToken,
    };
    use shared_sched::TimeoutScheduler;
    use shared_types::{ComponentIdentity, UserContext};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Installer standing in for the service-center front end. Dispatched
    /// observers are parked until the test completes them.
    #[derive(Default)]
    struct ServiceCenter {
        dispatched: Mutex<Vec<(ComponentIdentity, RequestToken, Arc<dyn InstallObserver>)>>,
    }

    impl ServiceCenter {
        fn complete(&self, token: RequestToken, result_code: i32) {
            let observer = self
                .dispatched
                .lock()
                .iter()
                .find(|(_, t, _)| *t == token)
                .map(|(_, _, obs)| obs.clone());
            observer
                .unwrap_or_else(|| panic!("nothing dispatched for {token}"))
                .on_install_finished(result_code);
        }

        async fn wait_for_dispatches(&self, count: usize) {
            while self.dispatched.lock().len() < count {
                tokio::task::yield_now().await;
            }
        }

        fn tokens(&self) -> Vec<RequestToken> {
            self.dispatched.lock().iter().map(|(_, t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl Installer for ServiceCenter {
        async fn query(
            &self,
            identity: &ComponentIdentity,
            _user: UserContext,
            _cross_device: bool,
            token: RequestToken,
            observer: Arc<dyn InstallObserver>,
        ) -> Result<QueryOutcome, InstallerError> {
            self.dispatched
                .lock()
                .push((identity.clone(), token, observer));
            Ok(QueryOutcome::Dispatched)
        }
    }

    struct World {
        coord: Arc<AcquisitionCoordinator>,
        center: Arc<ServiceCenter>,
        sched: TimeoutScheduler,
    }

    fn world() -> World {
        crate::init_logging();
        let sched = TimeoutScheduler::spawn();
        let center = Arc::new(ServiceCenter::default());
        let coord = AcquisitionCoordinator::new(AcquisitionContext {
            installer: center.clone(),
            scheduler: sched.handle(),
            config: AcquisitionConfig::for_testing(),
        });
        World {
            coord,
            center,
            sched,
        }
    }

    fn editor() -> ComponentIdentity {
        ComponentIdentity::new("com.example.notes", "entry", "EditorAbility")
    }

    struct RemoteWaiter {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RemoteCompletionSink for RemoteWaiter {
        fn on_remote_install_finished(&self, _result_code: i32, _identity: &ComponentIdentity) {
            self.log.lock().push(self.label);
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: SUBMIT → INSTALL → RESUME
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_install_completion_resumes_the_submitter() {
        let w = world();
        let coord = w.coord.clone();

        let handle = tokio::spawn(async move {
            coord.submit(editor(), UserContext::new(100), false).await
        });
        w.center.wait_for_dispatches(1).await;

        w.center.complete(w.center.tokens()[0], result_codes::OK);

        assert_eq!(handle.await.unwrap(), Ok(()));
        assert_eq!(w.coord.pending_count(), 0);

        w.sched.shutdown().await;
    }

    /// Two concurrent submits for the same identity; completing one token
    /// leaves the other waiter untouched.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submits_resolve_by_token() {
        let w = world();

        let coord1 = w.coord.clone();
        let h1 =
            tokio::spawn(
                async move { coord1.submit(editor(), UserContext::new(100), false).await },
            );
        let coord2 = w.coord.clone();
        let h2 =
            tokio::spawn(
                async move { coord2.submit(editor(), UserContext::new(100), false).await },
            );
        w.center.wait_for_dispatches(2).await;

        let tokens = w.center.tokens();
        w.center.complete(tokens[1], result_codes::OK);

        assert_eq!(h2.await.unwrap(), Ok(()));
        assert_eq!(w.coord.pending_count(), 1);

        // The untouched waiter runs to its own budget.
        assert_eq!(
            h1.await.unwrap(),
            Err(AcquisitionError::FreeInstallTimeout(Duration::from_millis(
                200
            )))
        );
        assert_eq!(w.coord.pending_count(), 0);

        w.sched.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: TIMEOUT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_silent_installer_bounded_by_budget() {
        let w = world();

        let res = w.coord.submit(editor(), UserContext::new(100), false).await;
        assert_eq!(
            res,
            Err(AcquisitionError::FreeInstallTimeout(Duration::from_millis(
                200
            )))
        );

        // The install finishing afterwards changes nothing.
        w.center.complete(w.center.tokens()[0], result_codes::OK);
        assert_eq!(w.coord.pending_count(), 0);

        w.sched.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: CROSS-DEVICE FAN-OUT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_remote_waiters_resolve_fifo() {
        let w = world();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            w.coord.register_remote_callback(
                editor(),
                Arc::new(RemoteWaiter {
                    label,
                    log: log.clone(),
                }),
            );
        }

        w.coord.on_remote_install_finished(result_codes::OK, &editor());

        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(w.coord.remote_waiter_count(), 0);

        w.sched.shutdown().await;
    }
}
