//! Channel facade over an emitter.
//!
//! A [`Channel`] forwards `emit`/`on`/`once` to its emitter untouched. The one
//! behavior it adds is on the removal path: `off` consults the protected-event
//! registry first, and for a protected key it is a silent no-op — protection
//! is a policy decision, not a fault.

use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::emitter::{
    collect_results, Emitter, HandlerError, HandlerOutcome, Listener, ListenerId, LocalEmitter,
    RegisteredListener, SubscribeOptions,
};
use crate::key::EventKey;
use crate::registry::{global_registry, ProtectedRegistry};

/// A pub/sub channel whose protected keys resist listener removal.
///
/// Each channel wraps its own emitter; protection state lives in the shared
/// registry, so a key protected once is protected on every channel using that
/// registry.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wardbus::{Channel, EventMeta, Listener, SubscribeOptions};
///
/// let channel = Channel::new();
/// let key = wardbus::register_protected_event("order.created", EventMeta::new());
///
/// channel.on(key, Listener::new(|_| json!("handled")), SubscribeOptions::default());
///
/// // Removal is blocked while the key is protected...
/// assert!(!channel.off(key, None));
/// assert_eq!(channel.listeners(key).len(), 1);
///
/// // ...and works again once it is unregistered.
/// wardbus::unregister_protected_event(key);
/// assert!(channel.off(key, None));
/// assert!(channel.listeners(key).is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Channel {
    emitter: Arc<dyn Emitter>,
    registry: Arc<ProtectedRegistry>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    /// A channel over a fresh [`LocalEmitter`] and the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(global_registry())
    }

    /// A channel over a fresh [`LocalEmitter`] and an explicit registry.
    #[must_use]
    pub fn with_registry(registry: Arc<ProtectedRegistry>) -> Self {
        Self {
            emitter: Arc::new(LocalEmitter::new()),
            registry,
        }
    }

    /// A channel over an explicit emitter implementation.
    #[must_use]
    pub fn with_emitter(emitter: Arc<dyn Emitter>, registry: Arc<ProtectedRegistry>) -> Self {
        Self { emitter, registry }
    }

    /// The registry governing this channel's protection checks.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProtectedRegistry> {
        &self.registry
    }

    /// Native access to the wrapped emitter, bypassing protection checks.
    /// This is the administrative path used by the batch removal operations.
    #[must_use]
    pub fn emitter(&self) -> &Arc<dyn Emitter> {
        &self.emitter
    }

    /// Pass-through to the emitter's registration.
    pub fn on(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId {
        self.emitter.on(key, listener, options)
    }

    /// Pass-through to the emitter's single-fire registration.
    pub fn once(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId {
        self.emitter.once(key, listener, options)
    }

    /// Remove one listener by handle, or all listeners on `key` when no
    /// handle is given — unless `key` is protected, in which case nothing is
    /// detached and `false` is returned without error.
    pub fn off(&self, key: EventKey, listener: Option<ListenerId>) -> bool {
        if self.registry.is_protected(key) {
            tracing::trace!(%key, "listener removal blocked on protected key");
            return false;
        }
        self.emitter.off(key, listener)
    }

    /// Pass-through to the emitter's dispatch. Never awaits; pending handler
    /// futures come back unresolved inside the outcomes.
    pub fn emit(&self, key: EventKey, args: &[Value]) -> Vec<HandlerOutcome> {
        self.emitter.emit(key, args)
    }

    /// Emit and settle the full aggregation: all listener results in
    /// invocation order, first handler failure propagated.
    pub async fn emit_async(
        &self,
        key: EventKey,
        args: &[Value],
    ) -> Result<Vec<Value>, HandlerError> {
        collect_results(self.emitter.emit(key, args)).await
    }

    /// Snapshot of the listeners on `key`, in invocation order.
    #[must_use]
    pub fn listeners(&self, key: EventKey) -> Vec<RegisteredListener> {
        self.emitter.listeners(key)
    }
}

static DEFAULT_CHANNEL: LazyLock<Channel> = LazyLock::new(Channel::new);

/// The process-wide convenience channel used by emission-style batch
/// operations when no channel is passed explicitly.
#[must_use]
pub fn default_channel() -> &'static Channel {
    &DEFAULT_CHANNEL
}
