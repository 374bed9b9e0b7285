//! The selected-site scope shared by every request.
//!
//! One [`SiteContext`] exists per client. It holds the current
//! [`SiteSelection`], persists it through a [`SelectionStore`], and broadcasts
//! changes to subscribers over a `tokio::sync::watch` channel. The HTTP layer
//! reads it once per request at dispatch time.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::watch;

use crate::error::SelectionError;

/// Stored value meaning "no site filter".
pub const ALL_SITES: &str = "all";

/// Scoping header value sent when no site is selected.
pub const ALL_SITES_HEADER: &str = "0";

/// A concrete site id exactly as the user selected it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either every site or one concrete site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SiteSelection {
    #[default]
    All,
    Site(SiteId),
}

impl SiteSelection {
    /// Parse a stored value: `"all"` or a site id.
    pub fn parse(value: &str) -> Result<Self, SelectionError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SelectionError::Invalid {
                value: value.to_string(),
            });
        }
        if value.eq_ignore_ascii_case(ALL_SITES) {
            return Ok(Self::All);
        }
        Ok(Self::Site(SiteId::new(value)))
    }

    pub fn site(id: impl Into<String>) -> Self {
        Self::Site(SiteId::new(id))
    }

    /// The value as persisted: `"all"` or the literal id.
    pub fn as_stored(&self) -> &str {
        match self {
            Self::All => ALL_SITES,
            Self::Site(id) => id.as_str(),
        }
    }

    /// The `site_id` header value: `"0"` for all sites, else the literal id.
    pub fn scope_header(&self) -> &str {
        match self {
            Self::All => ALL_SITES_HEADER,
            Self::Site(id) => id.as_str(),
        }
    }

    pub fn site_id(&self) -> Option<&SiteId> {
        match self {
            Self::All => None,
            Self::Site(id) => Some(id),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for SiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl Serialize for SiteSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_stored())
    }
}

impl<'de> Deserialize<'de> for SiteSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Where the selection survives restarts.
///
/// Another process sharing the same store may write to it at any time;
/// [`SiteContext::reload`] picks such writes up.
pub trait SelectionStore: Send + Sync {
    /// Load the stored selection, `None` if nothing has been stored yet.
    fn load(&self) -> Result<Option<SiteSelection>, SelectionError>;

    /// Persist the selection.
    fn save(&self, selection: &SiteSelection) -> Result<(), SelectionError>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    value: Mutex<Option<SiteSelection>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(selection: SiteSelection) -> Self {
        Self {
            value: Mutex::new(Some(selection)),
        }
    }
}

impl SelectionStore for MemorySelectionStore {
    fn load(&self) -> Result<Option<SiteSelection>, SelectionError> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, selection: &SiteSelection) -> Result<(), SelectionError> {
        *self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(selection.clone());
        Ok(())
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// Observable selected-site state.
///
/// Cloning is cheap; clones share the same value and subscribers.
#[derive(Clone)]
pub struct SiteContext {
    inner: Arc<SiteContextInner>,
}

struct SiteContextInner {
    sender: watch::Sender<SiteSelection>,
    store: Arc<dyn SelectionStore>,
}

impl SiteContext {
    /// Read the persisted selection (defaulting to all sites) and start from it.
    pub fn new(store: Arc<dyn SelectionStore>) -> Result<Self, SelectionError> {
        let initial = store.load()?.unwrap_or_default();
        tracing::debug!(selection = %initial, "Loaded site selection");
        let (sender, _) = watch::channel(initial);
        Ok(Self {
            inner: Arc::new(SiteContextInner { sender, store }),
        })
    }

    /// Context backed by an in-memory store, starting at `selection`.
    pub fn in_memory(selection: SiteSelection) -> Self {
        let (sender, _) = watch::channel(selection);
        Self {
            inner: Arc::new(SiteContextInner {
                sender,
                store: Arc::new(MemorySelectionStore::new()),
            }),
        }
    }

    pub fn current(&self) -> SiteSelection {
        self.inner.sender.borrow().clone()
    }

    /// Header value for a request dispatched right now.
    pub fn scope_header(&self) -> String {
        self.inner.sender.borrow().scope_header().to_string()
    }

    /// Persist and broadcast a new selection.
    ///
    /// Returns `true` when the value actually changed.
    pub fn select(&self, selection: SiteSelection) -> Result<bool, SelectionError> {
        self.inner.store.save(&selection)?;
        Ok(self.publish(selection))
    }

    /// Re-read the store and broadcast if another writer changed it.
    pub fn reload(&self) -> Result<bool, SelectionError> {
        match self.inner.store.load()? {
            Some(selection) => Ok(self.publish(selection)),
            None => Ok(false),
        }
    }

    pub fn subscribe(&self) -> SiteSubscription {
        SiteSubscription {
            receiver: self.inner.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    fn publish(&self, selection: SiteSelection) -> bool {
        let changed = self.inner.sender.send_if_modified(|current| {
            if *current == selection {
                false
            } else {
                *current = selection.clone();
                true
            }
        });
        if changed {
            tracing::info!(selection = %selection, "Site selection changed");
        }
        changed
    }
}

impl fmt::Debug for SiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteContext")
            .field("current", &self.current())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A live subscription to selection changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SiteSubscription {
    receiver: watch::Receiver<SiteSelection>,
}

impl SiteSubscription {
    /// Wait for the next change. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<SiteSelection> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn current(&self) -> SiteSelection {
        self.receiver.borrow().clone()
    }
}
