//! # Binding Flow Integration
//!
//! Drives cm-01-remote-binding end to end through a real
//! `shared_sched::TimeoutScheduler`:
//!
//! 1. **bind → connect ack**: descriptor reaches Connected, registry sees it
//! 2. **disconnect → disconnect ack**: descriptor torn down, exactly one
//!    callback per direction
//! 3. **silent peer**: the scheduler's named timeout force-completes both
//!    handshakes

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use cm_01_remote_binding::{
        result_codes, BindingConfig, BindingContext, BindingService, ConnectCallback,
        ConnectionId, ConnectionRegistry, DeathRecipient, DeathWatch, TargetGateway,
    };
    use shared_sched::TimeoutScheduler;
    use shared_types::{CallerHandle, ComponentIdentity, RemoteEndpoint};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Registry that remembers every register/unregister call.
    #[derive(Default)]
    struct InspectableRegistry {
        active: Mutex<Vec<ConnectionId>>,
    }

    impl ConnectionRegistry for InspectableRegistry {
        fn register(&self, id: ConnectionId, _caller: CallerHandle, _target: &ComponentIdentity) {
            self.active.lock().push(id);
        }

        fn unregister(&self, id: ConnectionId) {
            self.active.lock().retain(|other| *other != id);
        }
    }

    /// Gateway standing in for the hosting process; the test decides
    /// whether to acknowledge each forwarded request or stay silent.
    #[derive(Default)]
    struct HostingProcess {
        pending_connects: Mutex<Vec<ConnectionId>>,
        pending_disconnects: Mutex<Vec<ConnectionId>>,
    }

    impl TargetGateway for HostingProcess {
        fn forward_connect(&self, _target: &ComponentIdentity, id: ConnectionId) {
            self.pending_connects.lock().push(id);
        }

        fn forward_disconnect(&self, _endpoint: RemoteEndpoint, id: ConnectionId) {
            self.pending_disconnects.lock().push(id);
        }
    }

    #[derive(Default)]
    struct NoopDeathWatch {
        watched: Mutex<HashMap<RemoteEndpoint, DeathRecipient>>,
    }

    impl DeathWatch for NoopDeathWatch {
        fn watch(&self, endpoint: RemoteEndpoint, recipient: DeathRecipient) {
            self.watched.lock().insert(endpoint, recipient);
        }

        fn unwatch(&self, endpoint: RemoteEndpoint) {
            self.watched.lock().remove(&endpoint);
        }
    }

    #[derive(Default)]
    struct ClientSink {
        connects: Mutex<Vec<(Option<RemoteEndpoint>, i32)>>,
        disconnects: Mutex<Vec<i32>>,
    }

    impl ConnectCallback for ClientSink {
        fn on_connect_done(
            &self,
            _target: &ComponentIdentity,
            endpoint: Option<RemoteEndpoint>,
            result_code: i32,
        ) {
            self.connects.lock().push((endpoint, result_code));
        }

        fn on_disconnect_done(&self, _target: &ComponentIdentity, result_code: i32) {
            self.disconnects.lock().push(result_code);
        }
    }

    struct World {
        svc: Arc<BindingService>,
        registry: Arc<InspectableRegistry>,
        host: Arc<HostingProcess>,
        sched: TimeoutScheduler,
    }

    fn world() -> World {
        crate::init_logging();
        let sched = TimeoutScheduler::spawn();
        let registry = Arc::new(InspectableRegistry::default());
        let host = Arc::new(HostingProcess::default());
        let svc = BindingService::new(BindingContext {
            registry: registry.clone(),
            gateway: host.clone(),
            death_watch: Arc::new(NoopDeathWatch::default()),
            scheduler: sched.handle(),
            config: BindingConfig::for_testing(),
        });
        World {
            svc,
            registry,
            host,
            sched,
        }
    }

    fn target() -> ComponentIdentity {
        ComponentIdentity::new("com.example.notes", "entry", "EditorAbility")
    }

    // =============================================================================
    // INTEGRATION TESTS: FULL HANDSHAKE
    // =============================================================================

    /// bind → connect ack → disconnect → disconnect ack, with a responsive
    /// hosting process acknowledging each forwarded request.
    #[tokio::test(start_paused = true)]
    async fn test_full_binding_round_trip() {
        let w = world();
        let sink = Arc::new(ClientSink::default());
        let cb: Arc<dyn ConnectCallback> = sink.clone();

        let id = w.svc.bind(CallerHandle(11), target(), &cb).unwrap();

        // The hosting process sees the connect and acknowledges it.
        assert_eq!(w.host.pending_connects.lock().pop(), Some(id));
        w.svc
            .schedule_connect_done(id, result_codes::OK, Some(RemoteEndpoint(77)));
        assert_eq!(*w.registry.active.lock(), vec![id]);
        assert!(w.svc.is_target_active(&target()));

        // Tear down, again with a responsive peer.
        w.svc.request_disconnect(CallerHandle(11)).unwrap();
        assert_eq!(w.host.pending_disconnects.lock().pop(), Some(id));
        w.svc.schedule_disconnect_done(id);

        // Exactly one callback per direction, registry drained.
        assert_eq!(
            *sink.connects.lock(),
            vec![(Some(RemoteEndpoint(77)), result_codes::OK)]
        );
        assert_eq!(*sink.disconnects.lock(), vec![result_codes::OK]);
        assert!(w.registry.active.lock().is_empty());
        assert!(!w.svc.is_target_active(&target()));

        w.sched.shutdown().await;
    }

    /// Two callers share a target; only the last disconnect reaches the
    /// hosting process.
    #[tokio::test(start_paused = true)]
    async fn test_shared_target_disconnects_in_order() {
        let w = world();
        let sink1 = Arc::new(ClientSink::default());
        let cb1: Arc<dyn ConnectCallback> = sink1.clone();
        let sink2 = Arc::new(ClientSink::default());
        let cb2: Arc<dyn ConnectCallback> = sink2.clone();

        let id1 = w.svc.bind(CallerHandle(1), target(), &cb1).unwrap();
        w.svc
            .schedule_connect_done(id1, result_codes::OK, Some(RemoteEndpoint(70)));
        let id2 = w.svc.bind(CallerHandle(2), target(), &cb2).unwrap();
        w.svc
            .schedule_connect_done(id2, result_codes::OK, Some(RemoteEndpoint(70)));

        w.svc.request_disconnect(CallerHandle(1)).unwrap();
        assert!(w.host.pending_disconnects.lock().is_empty());
        assert_eq!(*sink1.disconnects.lock(), vec![result_codes::OK]);
        assert!(w.svc.is_target_active(&target()));

        w.svc.request_disconnect(CallerHandle(2)).unwrap();
        assert_eq!(w.host.pending_disconnects.lock().pop(), Some(id2));
        w.svc.schedule_disconnect_done(id2);
        assert!(!w.svc.is_target_active(&target()));

        w.sched.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: SILENT PEER
    // =============================================================================

    /// A hosting process that never acknowledges anything; both handshakes
    /// resolve through the scheduler's named timers.
    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_resolved_by_timers() {
        let w = world();
        let sink = Arc::new(ClientSink::default());
        let cb: Arc<dyn ConnectCallback> = sink.clone();

        w.svc.bind(CallerHandle(11), target(), &cb).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Connect timed out: empty handle, descriptor gone.
        assert_eq!(sink.connects.lock().len(), 1);
        assert_eq!(sink.connects.lock()[0].0, None);
        assert_eq!(w.svc.connection_count(), 0);

        // A fresh bind that connects but whose disconnect goes unanswered.
        let id = w.svc.bind(CallerHandle(11), target(), &cb).unwrap();
        w.svc
            .schedule_connect_done(id, result_codes::OK, Some(RemoteEndpoint(77)));
        w.svc.request_disconnect(CallerHandle(11)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(
            *sink.disconnects.lock(),
            vec![result_codes::DISCONNECT_TIMEOUT]
        );
        assert_eq!(w.svc.connection_count(), 0);

        w.sched.shutdown().await;
    }
}
