//! The underlying publish/subscribe primitive.
//!
//! The protected-channel layer never dispatches events itself; it talks to an
//! [`Emitter`] — a priority-ordered listener table addressed by
//! [`EventKey`](crate::key::EventKey). [`LocalEmitter`] is the in-process
//! implementation; anything that satisfies the trait (including a test
//! double) can sit behind a [`crate::channel::Channel`].
//!
//! Handlers receive their payload as a slice of [`serde_json::Value`] and
//! answer with a [`HandlerOutcome`]: either an immediately available result or
//! a future the caller may await. Emission itself never awaits — the async
//! aggregation paths ([`collect_results`], the batch emitters, the dispatch
//! strategies) decide when and how outcomes are settled.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, try_join_all};
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::key::EventKey;

/// Result of one handler invocation.
pub type HandlerResult = Result<Value, HandlerError>;

/// Failure raised by a handler's business logic.
///
/// These are never swallowed: they propagate through every aggregation path
/// to the caller of the batch or strategy function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler payload invalid: {0}")]
    InvalidPayload(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// What a handler produced: a settled result, or work still in flight.
pub enum HandlerOutcome {
    Ready(HandlerResult),
    Pending(BoxFuture<'static, HandlerResult>),
}

impl HandlerOutcome {
    /// A settled, successful outcome.
    pub fn value(value: Value) -> Self {
        Self::Ready(Ok(value))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Settle this outcome, awaiting the future when one is in flight.
    pub async fn resolve(self) -> HandlerResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(fut) => fut.await,
        }
    }

    /// View this outcome as a future regardless of readiness.
    pub fn into_future(self) -> BoxFuture<'static, HandlerResult> {
        match self {
            Self::Ready(result) => future::ready(result).boxed(),
            Self::Pending(fut) => fut,
        }
    }
}

impl fmt::Debug for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A cheaply clonable event handler.
///
/// # Examples
///
/// ```
/// use serde_json::{json, Value};
/// use wardbus::Listener;
///
/// // Infallible synchronous handler.
/// let count = Listener::new(|args| json!(args.len()));
///
/// // Async handler.
/// let echo = Listener::from_async(|args: Vec<Value>| async move {
///     Ok(Value::Array(args))
/// });
/// ```
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&[Value]) -> HandlerOutcome + Send + Sync>);

impl Listener {
    /// Wrap an infallible synchronous handler.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| HandlerOutcome::Ready(Ok(f(args)))))
    }

    /// Wrap a fallible synchronous handler.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(move |args| HandlerOutcome::Ready(f(args))))
    }

    /// Wrap an async handler. The returned future is handed to the caller of
    /// `emit` unresolved; nothing runs until it is awaited or detached.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self(Arc::new(move |args| {
            HandlerOutcome::Pending(f(args.to_vec()).boxed())
        }))
    }

    /// Wrap a handler that chooses its own readiness per call.
    pub fn from_outcome<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self, args: &[Value]) -> HandlerOutcome {
        (self.0)(args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

/// Handle identifying one registration on one emitter, used for targeted
/// removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registration options.
///
/// Higher `priority` listeners are invoked earlier on the same key; equal
/// priorities keep registration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub priority: i32,
}

impl SubscribeOptions {
    #[must_use]
    pub fn priority(priority: i32) -> Self {
        Self { priority }
    }
}

/// A listener as currently registered: its handle, priority, and whether it
/// was attached single-fire.
#[derive(Clone, Debug)]
pub struct RegisteredListener {
    pub id: ListenerId,
    pub listener: Listener,
    pub priority: i32,
    pub once: bool,
}

/// The publish/subscribe primitive the channel layer delegates to.
///
/// Implementations must be priority-aware and must expose the once marker on
/// [`listeners`](Emitter::listeners) — batch once-removal depends on it.
pub trait Emitter: Send + Sync + fmt::Debug {
    /// Attach `listener` to `key`. Returns a handle for targeted removal.
    fn on(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId;

    /// Attach a single-fire listener: removed from the table the first time
    /// `key` is emitted.
    fn once(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId;

    /// Remove one listener by handle, or every listener on `key` when no
    /// handle is given. Reports whether anything was removed.
    fn off(&self, key: EventKey, listener: Option<ListenerId>) -> bool;

    /// Remove every listener on `key`.
    fn remove_all_listeners(&self, key: EventKey);

    /// Snapshot of the listeners on `key`, in invocation order.
    fn listeners(&self, key: EventKey) -> Vec<RegisteredListener>;

    /// Invoke every listener on `key` with `args`, in priority order, and
    /// hand back their outcomes in that order. Single-fire listeners are
    /// dropped from the table before invocation. Never awaits.
    fn emit(&self, key: EventKey, args: &[Value]) -> Vec<HandlerOutcome>;
}

#[derive(Clone, Debug)]
struct ListenerEntry {
    id: ListenerId,
    listener: Listener,
    priority: i32,
    once: bool,
}

/// In-process [`Emitter`] backed by a mutex-guarded listener table.
///
/// Handlers are invoked outside the table lock, so a handler may re-register
/// or remove listeners on the emitter that is invoking it.
#[derive(Debug, Default)]
pub struct LocalEmitter {
    table: Mutex<FxHashMap<EventKey, Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl LocalEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(
        &self,
        key: EventKey,
        listener: Listener,
        options: SubscribeOptions,
        once: bool,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut table = self.table.lock().expect("listener table poisoned");
        let entries = table.entry(key).or_default();
        // Stable insert: after every entry of priority >= ours, so ties keep
        // registration order.
        let position = entries.partition_point(|entry| entry.priority >= options.priority);
        entries.insert(
            position,
            ListenerEntry {
                id,
                listener,
                priority: options.priority,
                once,
            },
        );
        id
    }
}

impl Emitter for LocalEmitter {
    fn on(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId {
        self.attach(key, listener, options, false)
    }

    fn once(&self, key: EventKey, listener: Listener, options: SubscribeOptions) -> ListenerId {
        self.attach(key, listener, options, true)
    }

    fn off(&self, key: EventKey, listener: Option<ListenerId>) -> bool {
        let mut table = self.table.lock().expect("listener table poisoned");
        let Some(entries) = table.get_mut(&key) else {
            return false;
        };
        let before = entries.len();
        match listener {
            Some(id) => entries.retain(|entry| entry.id != id),
            None => entries.clear(),
        }
        let removed = entries.len() != before;
        if entries.is_empty() {
            table.remove(&key);
        }
        removed
    }

    fn remove_all_listeners(&self, key: EventKey) {
        self.table
            .lock()
            .expect("listener table poisoned")
            .remove(&key);
    }

    fn listeners(&self, key: EventKey) -> Vec<RegisteredListener> {
        self.table
            .lock()
            .expect("listener table poisoned")
            .get(&key)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| RegisteredListener {
                        id: entry.id,
                        listener: entry.listener.clone(),
                        priority: entry.priority,
                        once: entry.once,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn emit(&self, key: EventKey, args: &[Value]) -> Vec<HandlerOutcome> {
        let snapshot = {
            let mut table = self.table.lock().expect("listener table poisoned");
            let Some(entries) = table.get_mut(&key) else {
                return Vec::new();
            };
            let snapshot = entries.clone();
            entries.retain(|entry| !entry.once);
            if entries.is_empty() {
                table.remove(&key);
            }
            snapshot
        };
        snapshot
            .iter()
            .map(|entry| entry.listener.call(args))
            .collect()
    }
}

/// Settle a full emission: sync results pass through, in-flight futures are
/// awaited concurrently. Output preserves listener order; the first handler
/// failure wins.
pub async fn collect_results(outcomes: Vec<HandlerOutcome>) -> Result<Vec<Value>, HandlerError> {
    try_join_all(outcomes.into_iter().map(HandlerOutcome::into_future)).await
}
