//! Service layer: `BindingService` drives the descriptor state machines.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use shared_sched::SchedulerHandle;
use shared_types::{CallerHandle, ComponentIdentity, RemoteEndpoint};
use tracing::{debug, info, warn};

use crate::domain::{
    result_codes, BindingConfig, BindingError, ConnectionId, ConnectionRecord, ConnectionState,
};
use crate::ports::{ConnectCallback, ConnectionRegistry, DeathWatch, TargetGateway};


/// Everything the binding service needs from its host, injected at
/// construction by the composition root.
pub struct BindingContext {
    /// Introspection registry for active descriptors.
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Fire-and-forget dispatch toward hosting processes.
    pub gateway: Arc<dyn TargetGateway>,
    /// Remote-liveness observer.
    pub death_watch: Arc<dyn DeathWatch>,
    /// Shared named-task scheduler.
    pub scheduler: SchedulerHandle,
    /// Timer budgets.
    pub config: BindingConfig,
}

/// A descriptor together with the caller's callback sink.
///
/// The sink is non-owning: it is upgraded before every delivery and a dead
/// sink downgrades the delivery to a log line.
struct Entry {
    record: ConnectionRecord,
    callback: Weak<dyn ConnectCallback>,
}

#[derive(Default)]
struct State {
    records: HashMap<ConnectionId, Entry>,
    by_target: HashMap<ComponentIdentity, Vec<ConnectionId>>,
    by_caller: HashMap<CallerHandle, ConnectionId>,
    // Several descriptors may share one endpoint; the death watch is armed
    // once per endpoint and a death fans out to every descriptor on it.
    by_endpoint: HashMap<RemoteEndpoint, Vec<ConnectionId>>,
}

impl State {
    fn remove(&mut self, id: ConnectionId) -> Option<Entry> {
        let entry = self.records.remove(&id)?;
        self.by_caller.remove(&entry.record.caller());
        let target = entry.record.target();
        if let Some(ids) = self.by_target.get_mut(target) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_target.remove(target);
            }
        }
        if let Some(endpoint) = entry.record.endpoint() {
            if let Some(ids) = self.by_endpoint.get_mut(&endpoint) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.by_endpoint.remove(&endpoint);
                }
            }
        }
        Some(entry)
    }
}

/// Owns every connection descriptor and drives it from bind requests,
/// peer acknowledgements, scheduler timeouts, and death notifications.
///
/// All descriptor mutation happens under the single internal lock, which
/// makes the service safe to re-enter from the scheduler worker and death
/// recipients. Outbound port calls are made after the lock is released.
pub struct BindingService {
    state: Mutex<State>,
    registry: Arc<dyn ConnectionRegistry>,
    gateway: Arc<dyn TargetGateway>,
    death_watch: Arc<dyn DeathWatch>,
    scheduler: SchedulerHandle,
    config: BindingConfig,
    next_id: AtomicU64,
    weak_self: Weak<BindingService>,
}

fn connect_task(id: ConnectionId) -> String {
    format!("connect_{}", id.0)
}

fn disconnect_task(id: ConnectionId) -> String {
    format!("disconnect_{}", id.0)
}

impl BindingService {
    /// Build the service from its injected context.
    pub fn new(ctx: BindingContext) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(State::default()),
            registry: ctx.registry,
            gateway: ctx.gateway,
            death_watch: ctx.death_watch,
            scheduler: ctx.scheduler,
            config: ctx.config,
            next_id: AtomicU64::new(1),
            weak_self: weak_self.clone(),
        })
    }

    /// Handle a `BindRequest`: create a descriptor, dispatch the connect,
    /// and arm the connect timeout.
    ///
    /// One live binding per caller handle; a second bind is rejected.
    pub fn bind(
        &self,
        caller: CallerHandle,
        target: ComponentIdentity,
        callback: &Arc<dyn ConnectCallback>,
    ) -> Result<ConnectionId, BindingError> {
        if !caller.is_valid() {
            return Err(BindingError::InvalidArgument("null caller handle"));
        }
        if !target.is_valid() {
            return Err(BindingError::InvalidArgument("invalid target identity"));
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.state.lock();
            if state.by_caller.contains_key(&caller) {
                return Err(BindingError::AlreadyBound(caller));
            }
            let mut record = ConnectionRecord::new(id, caller, target.clone());
            record.start_connecting()?;
            state.records.insert(
                id,
                Entry {
                    record,
                    callback: Arc::downgrade(callback),
                },
            );
            state.by_target.entry(target.clone()).or_default().push(id);
            state.by_caller.insert(caller, id);
        }

        info!(%id, %caller, %target, "connect dispatched");
        self.gateway.forward_connect(&target, id);
        self.schedule(connect_task(id), self.config.connect_timeout, move |svc| {
            svc.connect_timeout(id)
        });
        Ok(id)
    }

    /// Handle a `DisconnectRequest` for the caller's live binding.
    pub fn request_disconnect(&self, caller: CallerHandle) -> Result<(), BindingError> {
        if !caller.is_valid() {
            return Err(BindingError::InvalidArgument("null caller handle"));
        }
        let id = self
            .state
            .lock()
            .by_caller
            .get(&caller)
            .copied()
            .ok_or(BindingError::NotBound(caller))?;
        self.request_disconnect_by_id(id)
    }

    /// Begin the disconnect handshake for one descriptor.
    ///
    /// Only the last connection on a target pays the remote round trip;
    /// any earlier one finalizes locally and the component stays bound for
    /// the remaining callers.
    pub fn request_disconnect_by_id(&self, id: ConnectionId) -> Result<(), BindingError> {
        let (last, endpoint) = {
            let mut state = self.state.lock();
            let entry = state
                .records
                .get_mut(&id)
                .ok_or(BindingError::NotFound(id))?;
            entry.record.begin_disconnect()?;
            let target = entry.record.target().clone();
            let endpoint = entry.record.endpoint();
            let others = state
                .by_target
                .get(&target)
                .map(|ids| ids.iter().filter(|other| **other != id).count())
                .unwrap_or(0);
            (others == 0, endpoint)
        };

        if last {
            debug!(%id, "last connection on target, forwarding disconnect");
            self.schedule(
                disconnect_task(id),
                self.config.disconnect_timeout,
                move |svc| svc.disconnect_timeout(id),
            );
            if let Some(endpoint) = endpoint {
                self.gateway.forward_disconnect(endpoint, id);
            }
            Ok(())
        } else {
            debug!(%id, "target still bound by other callers, finalizing locally");
            self.complete_disconnect(id, result_codes::OK, false)
        }
    }

    /// The hosting process acknowledged the connect for `id`.
    ///
    /// A mismatched state is logged and ignored; the handshake it belongs
    /// to has already been resolved another way.
    pub fn schedule_connect_done(
        &self,
        id: ConnectionId,
        result_code: i32,
        endpoint: Option<RemoteEndpoint>,
    ) {
        {
            let state = self.state.lock();
            match state.records.get(&id) {
                Some(entry) if entry.record.state() == ConnectionState::Connecting => {}
                Some(entry) => {
                    warn!(%id, state = %entry.record.state(), "connect ack in unexpected state, ignored");
                    return;
                }
                None => {
                    warn!(%id, "connect ack for unknown descriptor, ignored");
                    return;
                }
            }
        }
        self.scheduler.cancel_named(&connect_task(id));
        if let Err(e) = self.complete_connect(id, result_code, endpoint) {
            debug!(%id, error = %e, "connect ack lost the race");
        }
    }

    /// The hosting process acknowledged the disconnect for `id`.
    pub fn schedule_disconnect_done(&self, id: ConnectionId) {
        {
            let state = self.state.lock();
            match state.records.get(&id) {
                Some(entry) if entry.record.state() == ConnectionState::Disconnecting => {}
                Some(entry) => {
                    warn!(%id, state = %entry.record.state(), "disconnect ack in unexpected state, ignored");
                    return;
                }
                None => {
                    warn!(%id, "disconnect ack for unknown descriptor, ignored");
                    return;
                }
            }
        }
        self.scheduler.cancel_named(&disconnect_task(id));
        if let Err(e) = self.complete_disconnect(id, result_codes::OK, false) {
            debug!(%id, error = %e, "disconnect ack lost the race");
        }
    }

    /// Finalize the connect handshake.
    ///
    /// Success marks the target active, registers the descriptor, arms the
    /// death watch, and hands the endpoint to the caller; anything else
    /// tears the descriptor down and hands the caller the empty handle.
    pub fn complete_connect(
        &self,
        id: ConnectionId,
        result_code: i32,
        endpoint: Option<RemoteEndpoint>,
    ) -> Result<(), BindingError> {
        self.scheduler.cancel_named(&connect_task(id));
        let bound = endpoint
            .filter(|e| e.is_valid())
            .filter(|_| result_code == result_codes::OK);

        let mut state = self.state.lock();
        let entry = state
            .records
            .get_mut(&id)
            .ok_or(BindingError::NotFound(id))?;
        let target = entry.record.target().clone();
        let caller = entry.record.caller();
        let callback = entry.callback.clone();

        match bound {
            Some(ep) => {
                entry.record.complete_connect(ep)?;
                let first_on_endpoint = {
                    let ids = state.by_endpoint.entry(ep).or_default();
                    ids.push(id);
                    ids.len() == 1
                };
                drop(state);
                info!(%id, %caller, %target, endpoint = %ep, "connected");
                self.registry.register(id, caller, &target);
                if first_on_endpoint {
                    self.watch_endpoint(ep);
                }
                self.deliver_connect(&callback, &target, Some(ep), result_code);
            }
            None => {
                entry.record.fail_connect()?;
                state.remove(id);
                drop(state);
                warn!(%id, %target, result_code, "connect failed");
                self.deliver_connect(&callback, &target, None, result_code);
            }
        }
        Ok(())
    }

    /// Finalize the disconnect handshake and drop the descriptor.
    ///
    /// `is_died` marks a completion forced by peer death; the delivered
    /// code is shifted so the caller can tell a crash from a clean stop.
    pub fn complete_disconnect(
        &self,
        id: ConnectionId,
        result_code: i32,
        is_died: bool,
    ) -> Result<(), BindingError> {
        // Death and timeout can race a pending timer for the same id.
        self.scheduler.cancel_named(&disconnect_task(id));

        let (entry, last_on_endpoint) = {
            let mut state = self.state.lock();
            state
                .records
                .get_mut(&id)
                .ok_or(BindingError::NotFound(id))?
                .record
                .complete_disconnect()?;
            let entry = state.remove(id).ok_or(BindingError::NotFound(id))?;
            let last = entry
                .record
                .endpoint()
                .is_some_and(|ep| !state.by_endpoint.contains_key(&ep));
            (entry, last)
        };

        let target = entry.record.target().clone();
        let code = result_codes::disconnect_code(result_code, is_died);
        if let Some(endpoint) = entry.record.endpoint() {
            self.registry.unregister(id);
            // Other descriptors may still share this endpoint; only the
            // last one leaving drops the death watch.
            if last_on_endpoint {
                self.death_watch.unwatch(endpoint);
            }
        }
        info!(%id, %target, code, is_died, "disconnected");
        self.deliver_disconnect(&entry.callback, &target, code);
        Ok(())
    }

    /// Whether the target currently has at least one live connection.
    pub fn is_target_active(&self, target: &ComponentIdentity) -> bool {
        let state = self.state.lock();
        state.by_target.get(target).is_some_and(|ids| {
            ids.iter().any(|id| {
                state.records.get(id).is_some_and(|entry| {
                    matches!(
                        entry.record.state(),
                        ConnectionState::Connected | ConnectionState::Disconnecting
                    )
                })
            })
        })
    }

    /// The caller's live descriptor, if any.
    pub fn connection_of(&self, caller: CallerHandle) -> Option<ConnectionId> {
        self.state.lock().by_caller.get(&caller).copied()
    }

    /// Number of descriptors currently tracked.
    pub fn connection_count(&self) -> usize {
        self.state.lock().records.len()
    }

    fn connect_timeout(&self, id: ConnectionId) {
        let pending = {
            let state = self.state.lock();
            state
                .records
                .get(&id)
                .is_some_and(|e| e.record.state() == ConnectionState::Connecting)
        };
        if !pending {
            debug!(%id, "connect timeout fired after resolution, ignored");
            return;
        }
        warn!(%id, "connect ack never arrived, failing caller");
        if let Err(e) = self.complete_connect(id, result_codes::CONNECT_TIMEOUT, None) {
            debug!(%id, error = %e, "connect timeout lost the race");
        }
    }

    fn disconnect_timeout(&self, id: ConnectionId) {
        let pending = {
            let state = self.state.lock();
            state
                .records
                .get(&id)
                .is_some_and(|e| e.record.state() == ConnectionState::Disconnecting)
        };
        if !pending {
            debug!(%id, "disconnect timeout fired after resolution, ignored");
            return;
        }
        warn!(%id, "disconnect ack never arrived, forcing completion");
        if let Err(e) = self.complete_disconnect(id, result_codes::DISCONNECT_TIMEOUT, false) {
            debug!(%id, error = %e, "disconnect timeout lost the race");
        }
    }

    fn handle_peer_died(&self, endpoint: RemoteEndpoint) {
        let ids: Vec<ConnectionId> = self
            .state
            .lock()
            .by_endpoint
            .get(&endpoint)
            .cloned()
            .unwrap_or_default();
        if ids.is_empty() {
            debug!(%endpoint, "death notification for unknown endpoint");
            return;
        }
        warn!(%endpoint, descriptors = ids.len(), "peer died, forcing disconnect completion");
        for id in ids {
            if let Err(e) = self.complete_disconnect(id, result_codes::OK, true) {
                debug!(%id, error = %e, "death completion lost the race");
            }
        }
    }

    fn watch_endpoint(&self, endpoint: RemoteEndpoint) {
        let weak = self.weak_self.clone();
        self.death_watch.watch(
            endpoint,
            Box::new(move || {
                if let Some(svc) = weak.upgrade() {
                    svc.handle_peer_died(endpoint);
                }
            }),
        );
    }

    fn schedule(
        &self,
        name: String,
        delay: Duration,
        op: impl FnOnce(&BindingService) + Send + 'static,
    ) {
        let weak = self.weak_self.clone();
        self.scheduler.schedule_named(
            name,
            delay,
            Box::new(move || {
                if let Some(svc) = weak.upgrade() {
                    op(&svc);
                }
            }),
        );
    }

    fn deliver_connect(
        &self,
        callback: &Weak<dyn ConnectCallback>,
        target: &ComponentIdentity,
        endpoint: Option<RemoteEndpoint>,
        result_code: i32,
    ) {
        match callback.upgrade() {
            Some(cb) => cb.on_connect_done(target, endpoint, result_code),
            None => warn!(%target, "caller callback sink gone, connect result dropped"),
        }
    }

    fn deliver_disconnect(
        &self,
        callback: &Weak<dyn ConnectCallback>,
        target: &ComponentIdentity,
        result_code: i32,
    ) {
        match callback.upgrade() {
            Some(cb) => cb.on_disconnect_done(target, result_code),
            None => warn!(%target, "caller callback sink gone, disconnect result dropped"),
        }
    }
}
