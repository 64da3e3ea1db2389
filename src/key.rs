//! Opaque event-key identities.
//!
//! Every event addressed through a [`crate::channel::Channel`] is identified by
//! an [`EventKey`]: a branded token whose equality is identity-based, never
//! structural. Two keys minted for events that share a display name are still
//! distinct, so listeners attached to one can never be confused with listeners
//! attached to the other.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, process-unique identity for a channel event.
///
/// Keys are cheap to copy and hash and are the sole addressing scheme used by
/// emitters. Mint one with [`EventKey::unique`], or let
/// [`crate::registry::ProtectedRegistry::register`] mint one for you.
///
/// # Examples
///
/// ```
/// use wardbus::EventKey;
///
/// let a = EventKey::unique();
/// let b = EventKey::unique();
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKey(Uuid);

impl EventKey {
    /// Mint a fresh key that compares unequal to every previously minted key.
    #[must_use]
    pub fn unique() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID, for logging and persistence.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKey({})", self.0)
    }
}
