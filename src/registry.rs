//! The protected-event registry.
//!
//! The registry is the single source of truth for protection state: a key is
//! protected exactly while its record is present here. Records are immutable
//! once created; the only mutation is full removal via
//! [`ProtectedRegistry::unregister`]. Iteration order is registration order,
//! which the batch operations and dispatch strategies rely on for stable,
//! reproducible result sequences.

use std::sync::{Arc, LazyLock, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::EventKey;
use crate::pattern::Pattern;

/// Metadata attached to a protected event at registration time.
///
/// Three fields are recognized by the rest of the crate (`description`,
/// `group`, `namespace`); everything else lives in `extra` and is preserved
/// verbatim with no special semantics.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wardbus::EventMeta;
///
/// let meta = EventMeta::default()
///     .with_group("orders")
///     .with_namespace("billing")
///     .with_extra("owner", json!("payments-team"));
///
/// assert_eq!(meta.group.as_deref(), Some("orders"));
/// assert_eq!(meta.extra("owner"), Some(&json!("payments-team")));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: FxHashMap<String, Value>,
}

impl EventMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Attach an unrecognized field. Preserved and retrievable, nothing more.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Look up an unrecognized field by name.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub(crate) fn field(&self, field: MetaField) -> Option<&str> {
        match field {
            MetaField::Group => self.group.as_deref(),
            MetaField::Namespace => self.namespace.as_deref(),
        }
    }
}

/// Which classification tag a batch operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MetaField {
    Group,
    Namespace,
}

/// One registered protected event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtectedEventRecord {
    pub key: EventKey,
    pub name: String,
    pub meta: EventMeta,
    pub registered_at: DateTime<Utc>,
}

/// Exact-match filter for [`ProtectedRegistry::list`].
///
/// Distinct from the glob matching used by batch operations: filter fields
/// compare for string equality, and when both are set, both must match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub group: Option<String>,
    pub namespace: Option<String>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn accepts(&self, meta: &EventMeta) -> bool {
        let group_ok = self
            .group
            .as_deref()
            .is_none_or(|want| meta.group.as_deref() == Some(want));
        let namespace_ok = self
            .namespace
            .as_deref()
            .is_none_or(|want| meta.namespace.as_deref() == Some(want));
        group_ok && namespace_ok
    }
}

/// Registry of protected events, keyed by identity and ordered by
/// registration.
///
/// Lookup and mutation are O(1) amortized; listing walks all records. The
/// process-wide default instance is reachable through [`global_registry`],
/// but components accept an explicit `Arc<ProtectedRegistry>` so isolated
/// registries (tests, embedded subsystems) work the same way.
#[derive(Debug, Default)]
pub struct ProtectedRegistry {
    records: RwLock<IndexMap<EventKey, ProtectedEventRecord, FxBuildHasher>>,
}

impl ProtectedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh key and store a record for it. Never fails.
    pub fn register(&self, name: impl Into<String>, meta: EventMeta) -> EventKey {
        let key = EventKey::unique();
        let record = ProtectedEventRecord {
            key,
            name: name.into(),
            meta,
            registered_at: Utc::now(),
        };
        tracing::debug!(%key, name = %record.name, "protected event registered");
        self.records
            .write()
            .expect("registry lock poisoned")
            .insert(key, record);
        key
    }

    /// Remove the record for `key`, reporting whether one was present.
    /// Idempotent: unregistering a missing key returns `false`.
    pub fn unregister(&self, key: EventKey) -> bool {
        // shift_remove keeps the remaining records in registration order.
        let removed = self
            .records
            .write()
            .expect("registry lock poisoned")
            .shift_remove(&key)
            .is_some();
        if removed {
            tracing::debug!(%key, "protected event unregistered");
        }
        removed
    }

    /// Whether `key` currently has a record (and therefore resists removal).
    #[must_use]
    pub fn is_protected(&self, key: EventKey) -> bool {
        self.records
            .read()
            .expect("registry lock poisoned")
            .contains_key(&key)
    }

    /// Metadata for `key`, if registered.
    #[must_use]
    pub fn meta(&self, key: EventKey) -> Option<EventMeta> {
        self.records
            .read()
            .expect("registry lock poisoned")
            .get(&key)
            .map(|record| record.meta.clone())
    }

    /// Full record for `key`, if registered.
    #[must_use]
    pub fn record(&self, key: EventKey) -> Option<ProtectedEventRecord> {
        self.records
            .read()
            .expect("registry lock poisoned")
            .get(&key)
            .cloned()
    }

    /// All records in registration order, optionally narrowed by an
    /// exact-match [`ListFilter`].
    #[must_use]
    pub fn list(&self, filter: Option<&ListFilter>) -> Vec<ProtectedEventRecord> {
        self.records
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|record| filter.is_none_or(|f| f.accepts(&record.meta)))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().expect("registry lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys whose `field` tag satisfies `pattern`, in registration order.
    pub(crate) fn matching_keys(&self, field: MetaField, pattern: &Pattern) -> Vec<EventKey> {
        self.records
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|record| pattern.matches(record.meta.field(field)))
            .map(|record| record.key)
            .collect()
    }
}

static GLOBAL_REGISTRY: LazyLock<Arc<ProtectedRegistry>> =
    LazyLock::new(|| Arc::new(ProtectedRegistry::new()));

/// The process-wide registry shared by every default-constructed channel.
///
/// Created empty on first access and torn down never; a key protected here is
/// protected on every channel that uses this registry.
#[must_use]
pub fn global_registry() -> Arc<ProtectedRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// Register a protected event in the process-wide registry.
pub fn register_protected_event(name: impl Into<String>, meta: EventMeta) -> EventKey {
    global_registry().register(name, meta)
}

/// Unregister a key from the process-wide registry.
pub fn unregister_protected_event(key: EventKey) -> bool {
    global_registry().unregister(key)
}

/// Whether `key` is protected in the process-wide registry.
#[must_use]
pub fn is_protected_event(key: EventKey) -> bool {
    global_registry().is_protected(key)
}

/// Metadata for `key` from the process-wide registry.
#[must_use]
pub fn protected_event_meta(key: EventKey) -> Option<EventMeta> {
    global_registry().meta(key)
}

/// List records from the process-wide registry.
#[must_use]
pub fn list_protected_events(filter: Option<&ListFilter>) -> Vec<ProtectedEventRecord> {
    global_registry().list(filter)
}
