//! Service layer: `AcquisitionCoordinator` owns the in-flight requests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use shared_sched::SchedulerHandle;
use shared_types::{ComponentIdentity, UserContext};
use tracing::{debug, info, warn};

use crate::domain::{
    result_codes, AcquisitionConfig, AcquisitionError, AcquisitionRequest, RequestToken,
};
use crate::ports::{InstallObserver, Installer, QueryOutcome, RemoteCompletionSink};


/// Backstop margin on top of the request budget. The named monitor task is
/// the intended timeout path; the backstop only matters if the scheduler
/// worker is gone.
const RESUME_GRACE: Duration = Duration::from_secs(1);

/// Everything the coordinator needs from its host, injected at
/// construction by the composition root.
pub struct AcquisitionContext {
    /// The installer front end, local or distributed.
    pub installer: Arc<dyn Installer>,
    /// Shared named-task scheduler.
    pub scheduler: SchedulerHandle,
    /// Wait budgets.
    pub config: AcquisitionConfig,
}

/// Owns the in-flight acquisition list and the cross-device waiter table,
/// dispatches submissions to the installer, and completes local and remote
/// waiters.
///
/// The two tables have independent locks, held only for list mutation;
/// the suspension in [`submit`](Self::submit) happens with no lock held so
/// completions can always make progress from other execution contexts.
pub struct AcquisitionCoordinator {
    in_flight: Mutex<Vec<AcquisitionRequest>>,
    remote_waiters: Mutex<Vec<(ComponentIdentity, Arc<dyn RemoteCompletionSink>)>>,
    installer: Arc<dyn Installer>,
    scheduler: SchedulerHandle,
    config: AcquisitionConfig,
    next_token: AtomicU64,
    weak_self: Weak<AcquisitionCoordinator>,
}

fn acquire_task(token: RequestToken) -> String {
    format!("acquire_{}", token.0)
}

impl AcquisitionCoordinator {
    /// Build the coordinator from its injected context.
    pub fn new(ctx: AcquisitionContext) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            in_flight: Mutex::new(Vec::new()),
            remote_waiters: Mutex::new(Vec::new()),
            installer: ctx.installer,
            scheduler: ctx.scheduler,
            config: ctx.config,
            next_token: AtomicU64::new(1),
            weak_self: weak_self.clone(),
        })
    }

    /// Submit a "start a not-yet-installed component" request and wait for
    /// its outcome, bounded by the configured budget.
    ///
    /// The only suspending operation in the subsystem. An installed answer
    /// resolves immediately; a dispatch arms the `acquire_<token>` monitor
    /// and parks the caller on the request's completion signal. Timeouts
    /// surface as [`AcquisitionError::FreeInstallTimeout`], dispatch
    /// failures as [`AcquisitionError::InstallerUnavailable`] before any
    /// wait begins.
    pub async fn submit(
        &self,
        identity: ComponentIdentity,
        user: UserContext,
        cross_device: bool,
    ) -> Result<(), AcquisitionError> {
        if !identity.is_valid() {
            return Err(AcquisitionError::InvalidIdentity);
        }

        let token = RequestToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (request, rx) = AcquisitionRequest::new(identity.clone(), user, token, cross_device);
        self.in_flight.lock().push(request);
        debug!(%token, %identity, user_id = user.user_id, cross_device, "acquisition submitted");

        let bridge: Arc<dyn InstallObserver> = Arc::new(CompletionBridge {
            coordinator: self.weak_self.clone(),
            identity: identity.clone(),
            user,
            token,
            fired: AtomicBool::new(false),
        });

        let outcome = self
            .installer
            .query(&identity, user, cross_device, token, bridge)
            .await;

        let budget = self.config.budget(cross_device);
        match outcome {
            Err(e) => {
                self.remove(token);
                warn!(%token, %identity, error = %e, "installer dispatch failed");
                Err(AcquisitionError::InstallerUnavailable(e.to_string()))
            }
            Ok(QueryOutcome::Installed) => {
                self.remove(token);
                debug!(%token, %identity, "already installed, resolved synchronously");
                Ok(())
            }
            Ok(QueryOutcome::Dispatched) => {
                self.arm_out_time_monitor(identity.clone(), user, token, budget);
                let waited = tokio::time::timeout(budget + RESUME_GRACE, rx).await;
                self.scheduler.cancel_named(&acquire_task(token));

                let code = match waited {
                    Ok(Ok(code)) => code,
                    Ok(Err(_)) => {
                        warn!(%token, %identity, "completion signal lost");
                        result_codes::UNDEFINED
                    }
                    Err(_) => {
                        warn!(%token, %identity, "monitor never fired, backstop elapsed");
                        self.mark_delivered(token);
                        self.remove(token);
                        return Err(AcquisitionError::FreeInstallTimeout(budget));
                    }
                };
                self.remove(token);
                match code {
                    result_codes::OK => {
                        info!(%token, %identity, "acquisition completed");
                        Ok(())
                    }
                    result_codes::FREE_INSTALL_TIMEOUT => {
                        Err(AcquisitionError::FreeInstallTimeout(budget))
                    }
                    failure => Err(AcquisitionError::InstallFailed(failure)),
                }
            }
        }
    }

    /// Route an installer completion to its waiter.
    ///
    /// Matches on identity **and** token; the token disambiguates
    /// concurrent submissions for the same identity. An undelivered match
    /// is signalled and kept (its submitter prunes it on wake); a match
    /// that already timed out is pruned here instead of re-signalled, so a
    /// completion/timeout race never delivers twice.
    pub fn on_install_finished(
        &self,
        result_code: i32,
        identity: &ComponentIdentity,
        user: UserContext,
        token: RequestToken,
    ) {
        let mut waited = Duration::ZERO;
        let mut delivered = false;
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.retain_mut(|req| {
                if req.identity() != identity || req.token() != token {
                    return true;
                }
                if req.is_delivered() {
                    debug!(%token, %identity, "completion for delivered request, pruned");
                    return false;
                }
                waited = req.submitted_at().elapsed();
                req.deliver(result_code);
                delivered = true;
                true
            });
        }

        if delivered {
            self.scheduler.cancel_named(&acquire_task(token));
            info!(%token, %identity, user_id = user.user_id, result_code, ?waited, "completion delivered");
        } else {
            debug!(%token, %identity, result_code, "no undelivered request matched");
        }
    }

    /// The installer front end died: fail every in-flight request with
    /// [`result_codes::SERVICE_CENTER_CRASH`].
    ///
    /// Goes through the same idempotent delivery path a completion takes:
    /// an undelivered request is signalled and kept for its submitter to
    /// prune, one that already timed out is pruned here.
    pub fn on_installer_died(&self) {
        let mut failed: Vec<RequestToken> = Vec::new();
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.retain_mut(|req| {
                if req.is_delivered() {
                    return false;
                }
                req.deliver(result_codes::SERVICE_CENTER_CRASH);
                failed.push(req.token());
                true
            });
        }

        warn!(failed = failed.len(), "installer front end died, failing in-flight requests");
        for token in failed {
            self.scheduler.cancel_named(&acquire_task(token));
        }
    }

    /// Register a cross-device waiter for `identity`.
    pub fn register_remote_callback(
        &self,
        identity: ComponentIdentity,
        sink: Arc<dyn RemoteCompletionSink>,
    ) {
        debug!(%identity, "remote waiter registered");
        self.remote_waiters.lock().push((identity, sink));
    }

    /// A remote completion for `identity` arrived: resolve every matching
    /// waiter in FIFO registration order and remove them. Non-matching
    /// entries persist. Sinks are invoked after the table lock is released.
    pub fn on_remote_install_finished(&self, result_code: i32, identity: &ComponentIdentity) {
        let matched: Vec<Arc<dyn RemoteCompletionSink>> = {
            let mut table = self.remote_waiters.lock();
            let mut kept = Vec::with_capacity(table.len());
            let mut matched = Vec::new();
            for (key, sink) in table.drain(..) {
                if key == *identity {
                    matched.push(sink);
                } else {
                    kept.push((key, sink));
                }
            }
            *table = kept;
            matched
        };

        info!(%identity, result_code, waiters = matched.len(), "remote completion fan-out");
        for sink in matched {
            sink.on_remote_install_finished(result_code, identity);
        }
    }

    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Number of cross-device waiters currently registered.
    pub fn remote_waiter_count(&self) -> usize {
        self.remote_waiters.lock().len()
    }

    fn arm_out_time_monitor(
        &self,
        identity: ComponentIdentity,
        user: UserContext,
        token: RequestToken,
        budget: Duration,
    ) {
        let weak = self.weak_self.clone();
        self.scheduler.schedule_named(
            acquire_task(token),
            budget,
            Box::new(move || {
                if let Some(coord) = weak.upgrade() {
                    warn!(%token, %identity, "acquisition budget exhausted");
                    coord.on_install_finished(
                        result_codes::FREE_INSTALL_TIMEOUT,
                        &identity,
                        user,
                        token,
                    );
                }
            }),
        );
    }

    fn mark_delivered(&self, token: RequestToken) {
        let mut in_flight = self.in_flight.lock();
        for req in in_flight.iter_mut() {
            if req.token() == token {
                req.deliver(result_codes::FREE_INSTALL_TIMEOUT);
            }
        }
    }

    fn remove(&self, token: RequestToken) {
        self.in_flight.lock().retain(|req| req.token() != token);
    }
}

/// Completion adapter handed to the installer for one dispatched request.
///
/// Forwards exactly one completion into the coordinator; the latch drops
/// duplicates with a warning. Holds the coordinator weakly so an installer
/// that outlives the service cannot keep it alive.
struct CompletionBridge {
    coordinator: Weak<AcquisitionCoordinator>,
    identity: ComponentIdentity,
    user: UserContext,
    token: RequestToken,
    fired: AtomicBool,
}

impl InstallObserver for CompletionBridge {
    fn on_install_finished(&self, result_code: i32) {
        if self.fired.swap(true, Ordering::SeqCst) {
            warn!(token = %self.token, "duplicate installer completion dropped");
            return;
        }
        match self.coordinator.upgrade() {
            Some(coord) => {
                coord.on_install_finished(result_code, &self.identity, self.user, self.token)
            }
            None => warn!(token = %self.token, "coordinator gone, completion dropped"),
        }
    }
}
