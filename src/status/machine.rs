//! Status State Machine
//!
//! Transition table:
//!
//! | operation             | from                        | to                              |
//! |-----------------------|-----------------------------|---------------------------------|
//! | start_main            | Waiting, TemporarilyStopped | Running (Waiting if start fails)|
//! | start_main            | Running                     | Running (no-op)                 |
//! | stop_main(None)       | Running                     | Waiting                         |
//! | stop_main(Some(msg))  | Running                     | TemporarilyStopped{msg}         |
//! | stop_main(_)          | Waiting, TemporarilyStopped | unchanged (no-op)               |
//! | set_temporary_status  | any                         | TemporarilyStopped              |
//! | expire (monitor tick) | TemporarilyStopped, expired | Waiting                         |
//! | reset                 | any                         | Waiting                         |
//!
//! Writers are serialized by a transition lock owned by the machine. The
//! engine state lock is only taken to read the starting status and to
//! commit the result, never while a handler runs, so `/status` readers see
//! the status before or after a transition and never wait on a handler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::callbacks::{HandlerRegistry, StartContext};
use crate::errors::{FailoverError, FailoverResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::state::{self, SharedState};

use super::state::{OperatingMode, Status};

/// Operator request to stop with a visible status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReason {
    pub message: String,
    /// Overrides the configured temporary status lifetime
    pub timeout: Option<Duration>,
}

impl StopReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Guarded transitions over the shared node state
#[derive(Clone)]
pub struct StatusMachine {
    state: SharedState,
    transition: Arc<Mutex<()>>,
    handlers: Arc<HandlerRegistry>,
    start_context: StartContext,
    temp_status_timeout: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl StatusMachine {
    pub fn new(
        state: SharedState,
        handlers: Arc<HandlerRegistry>,
        start_context: StartContext,
        temp_status_timeout: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            state,
            transition: Arc::new(Mutex::new(())),
            handlers,
            start_context,
            temp_status_timeout,
            metrics,
        }
    }

    /// Current status.
    pub fn status(&self) -> Status {
        state::lock(&self.state).status.clone()
    }

    /// Current operating mode.
    pub fn mode(&self) -> OperatingMode {
        state::lock(&self.state).mode
    }

    // =========================================================================
    // WORKLOAD TRANSITIONS
    // =========================================================================

    /// Waiting | TemporarilyStopped → Running.
    ///
    /// On handler failure the node ends up Waiting and the error is returned.
    pub fn start_main(&self) -> FailoverResult<Status> {
        let _transition = self.begin_transition();
        {
            let guard = state::lock(&self.state);
            if !guard.status.can_start() {
                return Ok(guard.status.clone());
            }
        }

        let outcome = self.handlers.invoke_start(&self.start_context);

        let mut guard = state::lock(&self.state);
        match outcome {
            Ok(()) => {
                guard.status = Status::Running;
                drop(guard);
                log_event_with_fields(Event::MainStarted, &[("self", self.start_context.self_addr.as_str())]);
                Ok(Status::Running)
            }
            Err(e) => {
                guard.status = Status::Waiting;
                drop(guard);
                self.callback_failed(&e);
                Err(e)
            }
        }
    }

    /// Running → Waiting, or TemporarilyStopped when a reason is given.
    ///
    /// A no-op success on any non-running state. The state leaves Running
    /// even if the stop handler fails; the failure is still returned.
    pub fn stop_main(&self, reason: Option<StopReason>) -> FailoverResult<Status> {
        self.stop_main_at(reason, Utc::now())
    }

    pub fn stop_main_at(&self, reason: Option<StopReason>, now: DateTime<Utc>) -> FailoverResult<Status> {
        let _transition = self.begin_transition();
        self.stop_in_transition(reason, now)
    }

    /// Caller holds the transition lock.
    fn stop_in_transition(&self, reason: Option<StopReason>, now: DateTime<Utc>) -> FailoverResult<Status> {
        {
            let guard = state::lock(&self.state);
            if !guard.status.is_running() {
                return Ok(guard.status.clone());
            }
        }

        let message = reason.as_ref().map(|r| r.message.as_str());
        let outcome = self.handlers.invoke_stop(message);

        let status = match &reason {
            Some(r) => Status::temporarily_stopped(
                r.message.clone(),
                now,
                r.timeout.unwrap_or(self.temp_status_timeout),
            ),
            None => Status::Waiting,
        };
        state::lock(&self.state).status = status.clone();
        log_event_with_fields(
            Event::MainStopped,
            &[("status", status.name()), ("message", message.unwrap_or(""))],
        );

        match outcome {
            Ok(()) => Ok(status),
            Err(e) => {
                self.callback_failed(&e);
                Err(e)
            }
        }
    }

    /// Any → TemporarilyStopped{message, now + timeout}.
    ///
    /// Does not stop the workload; pair with `stop_main` for that.
    pub fn set_temporary_status(&self, message: impl Into<String>, timeout: Duration) -> Status {
        self.set_temporary_status_at(message, timeout, Utc::now())
    }

    pub fn set_temporary_status_at(
        &self,
        message: impl Into<String>,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> Status {
        let _transition = self.begin_transition();
        let status = Status::temporarily_stopped(message, now, timeout);
        state::lock(&self.state).status = status.clone();
        let expires = status.expires_at().map(|t| t.to_rfc3339()).unwrap_or_default();
        log_event_with_fields(
            Event::TempStatusSet,
            &[("message", status.message().unwrap_or("")), ("expires_at", expires.as_str())],
        );
        status
    }

    /// Lazy expiry, called once per monitor tick.
    ///
    /// Takes only the state lock so a tick never waits on a handler. A start
    /// committing afterwards still wins.
    ///
    /// Returns true if a temporary status reverted to Waiting.
    pub fn expire_temporary_status(&self, now: DateTime<Utc>) -> bool {
        let mut guard = state::lock(&self.state);
        if !guard.status.is_expired(now) {
            return false;
        }
        let message = guard.status.message().unwrap_or("").to_string();
        guard.status = Status::Waiting;
        log_event_with_fields(Event::TempStatusExpired, &[("message", message.as_str())]);
        true
    }

    /// Stop if running, then drop any temporary status: always ends Waiting.
    pub fn reset(&self) -> FailoverResult<Status> {
        let _transition = self.begin_transition();
        let stopped = self.stop_in_transition(None, Utc::now());
        let mut guard = state::lock(&self.state);
        if guard.status.is_temporarily_stopped() {
            guard.status = Status::Waiting;
        }
        stopped.map(|_| guard.status.clone())
    }

    // =========================================================================
    // MODE TRANSITIONS
    // =========================================================================

    /// Standby → ActingActive. Irreversible.
    ///
    /// Compare-and-set under the lock: of two concurrent promotions only the
    /// first gets `Ok`, the other sees `AlreadyActive`.
    pub fn enter_acting_active(&self) -> FailoverResult<()> {
        let mut guard = state::lock(&self.state);
        if guard.mode.is_active() {
            return Err(FailoverError::AlreadyActive);
        }
        guard.mode = OperatingMode::ActingActive;
        Ok(())
    }

    fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callback_failed(&self, error: &FailoverError) {
        self.metrics.increment_callback_failures();
        log_event_with_fields(Event::CallbackFailed, &[("error", error.to_string().as_str())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeConfig;
    use crate::state::NodeState;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn machine_with(handlers: HandlerRegistry) -> StatusMachine {
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        StatusMachine::new(
            state::shared(NodeState::from_config(&config)),
            Arc::new(handlers),
            StartContext {
                self_addr: config.self_addr.clone(),
                port: None,
            },
            Duration::from_secs(60),
            Arc::new(MetricsRegistry::new()),
        )
    }

    fn machine() -> StatusMachine {
        machine_with(HandlerRegistry::new())
    }

    #[test]
    fn test_initial_status_is_waiting() {
        assert_eq!(machine().status(), Status::Waiting);
    }

    #[test]
    fn test_start_from_waiting() {
        let m = machine();
        assert_eq!(m.start_main().unwrap(), Status::Running);
        assert_eq!(m.status(), Status::Running);
    }

    #[test]
    fn test_start_when_running_is_noop() {
        let starts = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&starts);
        let m = machine_with(HandlerRegistry::new().on_start(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        m.start_main().unwrap();
        m.start_main().unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_readable_while_start_handler_runs() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (entered_tx, release_rx) = (Mutex::new(entered_tx), Mutex::new(release_rx));
        let m = machine_with(HandlerRegistry::new().on_start(move |_| {
            entered_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
            Ok(())
        }));

        let starting = {
            let m = m.clone();
            thread::spawn(move || m.start_main())
        };
        entered_rx.recv().unwrap();

        // The handler is blocked; readers still get the pre-transition status.
        assert_eq!(m.status(), Status::Waiting);
        assert_eq!(m.mode(), OperatingMode::Standby);

        release_tx.send(()).unwrap();
        assert_eq!(starting.join().unwrap().unwrap(), Status::Running);
        assert_eq!(m.status(), Status::Running);
    }

    #[test]
    fn test_concurrent_starts_invoke_handler_once() {
        let starts = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&starts);
        let m = machine_with(HandlerRegistry::new().on_start(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(())
        }));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let m = m.clone();
                thread::spawn(move || m.start_main())
            })
            .collect();
        for worker in workers {
            assert_eq!(worker.join().unwrap().unwrap(), Status::Running);
        }
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_start_from_temporarily_stopped() {
        let m = machine();
        m.set_temporary_status_at("maintenance", Duration::from_secs(30), at(0));
        assert_eq!(m.start_main().unwrap(), Status::Running);
    }

    #[test]
    fn test_failed_start_returns_to_waiting() {
        let m = machine_with(HandlerRegistry::new().on_start(|_| Err("no".into())));
        m.set_temporary_status_at("maintenance", Duration::from_secs(30), at(0));

        let err = m.start_main().unwrap_err();
        assert!(matches!(err, FailoverError::Callback { .. }));
        assert_eq!(m.status(), Status::Waiting);
    }

    #[test]
    fn test_stop_without_reason() {
        let m = machine();
        m.start_main().unwrap();
        assert_eq!(m.stop_main(None).unwrap(), Status::Waiting);
    }

    #[test]
    fn test_stop_with_reason_sets_temp_status() {
        let m = machine();
        m.start_main().unwrap();

        let status = m
            .stop_main_at(Some(StopReason::new("rolling upgrade")), at(1_000))
            .unwrap();
        assert_eq!(
            status,
            Status::TemporarilyStopped {
                message: "rolling upgrade".to_string(),
                expires_at: at(1_060),
            }
        );

        let status = {
            m.start_main().unwrap();
            m.stop_main_at(
                Some(StopReason::new("short").with_timeout(Duration::from_secs(5))),
                at(2_000),
            )
            .unwrap()
        };
        assert_eq!(status.expires_at(), Some(at(2_005)));
    }

    #[test]
    fn test_stop_is_idempotent_when_not_running() {
        let stops = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&stops);
        let m = machine_with(HandlerRegistry::new().on_stop(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        assert_eq!(m.stop_main(None).unwrap(), Status::Waiting);
        assert_eq!(m.stop_main(Some(StopReason::new("x"))).unwrap(), Status::Waiting);

        let temp = m.set_temporary_status_at("hold", Duration::from_secs(10), at(0));
        assert_eq!(m.stop_main(None).unwrap(), temp);
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_stop_still_leaves_running() {
        let m = machine_with(HandlerRegistry::new().on_stop(|_| Err("stuck".into())));
        m.start_main().unwrap();

        assert!(m.stop_main(None).is_err());
        assert_eq!(m.status(), Status::Waiting);
    }

    #[test]
    fn test_temp_status_from_running_does_not_stop() {
        let stops = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&stops);
        let m = machine_with(HandlerRegistry::new().on_stop(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        m.start_main().unwrap();

        let status = m.set_temporary_status_at("drain", Duration::from_secs(10), at(0));
        assert!(status.is_temporarily_stopped());
        assert_eq!(stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_expiry_only_at_or_after_deadline() {
        let m = machine();
        m.set_temporary_status_at("drain", Duration::from_secs(10), at(100));

        assert!(!m.expire_temporary_status(at(109)));
        assert!(m.status().is_temporarily_stopped());

        assert!(m.expire_temporary_status(at(110)));
        assert_eq!(m.status(), Status::Waiting);

        assert!(!m.expire_temporary_status(at(200)));
    }

    #[test]
    fn test_reset_always_ends_waiting() {
        let m = machine();
        m.start_main().unwrap();
        assert_eq!(m.reset().unwrap(), Status::Waiting);

        m.set_temporary_status_at("hold", Duration::from_secs(10), at(0));
        assert_eq!(m.reset().unwrap(), Status::Waiting);
    }

    #[test]
    fn test_enter_acting_active_once() {
        let m = machine();
        assert_eq!(m.mode(), OperatingMode::Standby);
        m.enter_acting_active().unwrap();
        assert_eq!(m.mode(), OperatingMode::ActingActive);
        assert!(matches!(m.enter_acting_active(), Err(FailoverError::AlreadyActive)));
    }
}
