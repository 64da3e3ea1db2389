//! # wardbus: protected pub/sub channels with batch dispatch
//!
//! wardbus layers two things on top of a priority-aware event emitter:
//!
//! - **Protected events**: keys registered in the [`registry`] resist
//!   listener removal through [`Channel::off`] until explicitly
//!   unregistered. Protection is policy, not fault — a blocked removal is a
//!   silent no-op.
//! - **Group/namespace batch operations**: bulk subscribe, remove, and emit
//!   across every registered key whose `group` or `namespace` tag matches a
//!   glob pattern, plus a three-strategy async dispatch engine
//!   (`parallel`, `waterfall`, `series`).
//!
//! ## Quick start
//!
//! ```
//! use serde_json::json;
//! use std::sync::Arc;
//! use wardbus::{batch, Channel, EventMeta, GroupHandler, ProtectedRegistry};
//!
//! let registry = Arc::new(ProtectedRegistry::new());
//! let channel = Channel::with_registry(Arc::clone(&registry));
//!
//! let created = registry.register("order.created", EventMeta::new().with_group("orders"));
//! let shipped = registry.register("order.shipped", EventMeta::new().with_group("orders"));
//! let login = registry.register("user.login", EventMeta::new().with_group("users"));
//!
//! // One handler across the whole group.
//! batch::on_group(
//!     "orders",
//!     GroupHandler::new(|_key, args| json!(args.len())),
//!     &channel,
//!     None,
//! );
//!
//! assert_eq!(channel.listeners(created).len(), 1);
//! assert_eq!(channel.listeners(shipped).len(), 1);
//! assert!(channel.listeners(login).is_empty());
//! ```
//!
//! ## Module guide
//!
//! - [`key`] — opaque, identity-equal event keys
//! - [`pattern`] — glob matching for batch targeting
//! - [`registry`] — the protected-event registry and its process-wide default
//! - [`emitter`] — the emitter seam ([`Emitter`], [`LocalEmitter`]) and
//!   handler/outcome types
//! - [`channel`] — the facade that intercepts removal on protected keys
//! - [`batch`] — group/namespace bulk operations
//! - [`strategy`] — parallel / waterfall / series fan-out
//! - [`telemetry`] — tracing subscriber bootstrap

pub mod batch;
pub mod channel;
pub mod emitter;
pub mod key;
pub mod pattern;
pub mod registry;
pub mod strategy;
pub mod telemetry;

pub use batch::{
    emit_group, emit_group_async, emit_namespace, emit_namespace_async, off_group, off_namespace,
    off_once_group, off_once_namespace, on_group, on_namespace, once_group, once_namespace,
    GroupHandler,
};
pub use channel::{default_channel, Channel};
pub use emitter::{
    collect_results, Emitter, HandlerError, HandlerOutcome, HandlerResult, Listener, ListenerId,
    LocalEmitter, RegisteredListener, SubscribeOptions,
};
pub use key::EventKey;
pub use pattern::Pattern;
pub use registry::{
    global_registry, is_protected_event, list_protected_events, protected_event_meta,
    register_protected_event, unregister_protected_event, EventMeta, ListFilter,
    ProtectedEventRecord, ProtectedRegistry,
};
pub use strategy::{
    emit_group_with_strategy, emit_namespace_with_strategy, DispatchStrategy, UnknownStrategy,
};
