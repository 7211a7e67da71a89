//! # Callback Registry
//!
//! Three named slots filled by the host application before the engine
//! runs: `start`, `stop` and `update`. The engine invokes them, never the
//! other way around.
//!
//! - An unset slot is a no-op
//! - An error or a panic inside a handler becomes `FailoverError::Callback`
//! - Handlers run on the caller's thread outside the engine state lock.
//!   Status reads stay answerable while a handler runs; other transitions
//!   queue behind it

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{FailoverError, FailoverResult};

/// Error type handlers may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type handlers return
pub type HandlerResult = Result<(), HandlerError>;

type StartHandler = Arc<dyn Fn(&StartContext) -> HandlerResult + Send + Sync>;
type StopHandler = Arc<dyn Fn(Option<&str>) -> HandlerResult + Send + Sync>;
type UpdateHandler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync>;

/// Callback slot names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSlot {
    Start,
    Stop,
    Update,
}

impl CallbackSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackSlot::Start => "start",
            CallbackSlot::Stop => "stop",
            CallbackSlot::Update => "update",
        }
    }
}

impl fmt::Display for CallbackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the start handler is told about the node it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartContext {
    /// This node's configured address
    pub self_addr: String,
    /// Listen port, only when `pass_transport` is enabled. The host then
    /// serves `Lighthouse::router()` itself on this port.
    pub port: Option<u16>,
}

/// Handler registry with start/stop/update slots
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    start: Option<StartHandler>,
    stop: Option<StopHandler>,
    update: Option<UpdateHandler>,
}

impl HandlerRegistry {
    /// Create an empty registry; every slot is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the start slot.
    pub fn on_start<F>(mut self, handler: F) -> Self
    where
        F: Fn(&StartContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(handler));
        self
    }

    /// Fill the stop slot. The argument is the operator's status message, if any.
    pub fn on_stop<F>(mut self, handler: F) -> Self
    where
        F: Fn(Option<&str>) -> HandlerResult + Send + Sync + 'static,
    {
        self.stop = Some(Arc::new(handler));
        self
    }

    /// Fill the update slot.
    pub fn on_update<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(handler));
        self
    }

    /// Check whether a slot is filled.
    pub fn is_registered(&self, slot: CallbackSlot) -> bool {
        match slot {
            CallbackSlot::Start => self.start.is_some(),
            CallbackSlot::Stop => self.stop.is_some(),
            CallbackSlot::Update => self.update.is_some(),
        }
    }

    pub(crate) fn invoke_start(&self, ctx: &StartContext) -> FailoverResult<()> {
        match &self.start {
            Some(handler) => guarded(CallbackSlot::Start, || handler(ctx)),
            None => Ok(()),
        }
    }

    pub(crate) fn invoke_stop(&self, reason: Option<&str>) -> FailoverResult<()> {
        match &self.stop {
            Some(handler) => guarded(CallbackSlot::Stop, || handler(reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn invoke_update(&self, payload: &Value) -> FailoverResult<()> {
        match &self.update {
            Some(handler) => guarded(CallbackSlot::Update, || handler(payload)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

/// Run a handler, turning both `Err` and panics into a callback error.
fn guarded<F>(slot: CallbackSlot, handler: F) -> FailoverResult<()>
where
    F: FnOnce() -> HandlerResult,
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FailoverError::Callback {
            slot,
            message: e.to_string(),
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Err(FailoverError::Callback {
                slot,
                message: format!("panic: {}", message),
            })
        }
    }
}
