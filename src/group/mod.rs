//! Named cache groups.
//!
//! A [`Group`] is the unit applications talk to. It owns two cache tiers and
//! a data source, and serves `get` in this order:
//!
//! ```text
//! get(key)
//!   │
//!   ├─ hot tier hit ──────────────────────────────► value
//!   ├─ main tier hit ─────────────────────────────► value
//!   └─ single-flight load
//!        ├─ picker chooses a remote peer ─ ok ────► value (may promote to hot)
//!        │                                 └ err ─┐
//!        └─ local data source ◄───────────────────┘
//!             └─ store in main tier ──────────────► value
//! ```
//!
//! Values fetched from peers are only kept locally once the key becomes hot,
//! that is once its remote fetch rate reaches
//! [`GroupConfig::hot_key_qps`] per minute.

mod hotkeys;
mod registry;

pub use hotkeys::HotKeyTracker;
pub use registry::{get_group, new_group, Registry};

use crate::cache::{Cache, OnEvicted};
use crate::cluster::{PeerGetter, PeerPicker};
use crate::config::GroupConfig;
use crate::error::{BoxError, Error, Result};
use crate::metrics::{GroupMetrics, GroupStats};
use crate::network::rpc::GetRequest;
use crate::singleflight::Flight;
use crate::types::ByteView;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Data source consulted when no tier and no peer has a key.
#[async_trait]
pub trait Getter: Send + Sync {
    /// Produce the value of `key`. Errors are returned to the caller as
    /// [`Error::Source`] and never cached.
    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError>;
}

/// Adapts a plain closure into a [`Getter`].
///
/// ```rust
/// use macchiato::group::GetterFn;
///
/// let getter = GetterFn::new(|key: &str| Ok(key.as_bytes().to_vec()));
/// # let _ = getter;
/// ```
pub struct GetterFn<F>(F);

impl<F> GetterFn<F>
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Getter for GetterFn<F>
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync,
{
    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
        (self.0)(key)
    }
}

/// Collects the parts of a [`Group`].
pub struct GroupBuilder {
    name: String,
    config: GroupConfig,
    getter: Option<Arc<dyn Getter>>,
}

impl GroupBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: GroupConfig::default(),
            getter: None,
        }
    }

    pub fn config(mut self, config: GroupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn getter(mut self, getter: impl Getter + 'static) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Use an already shared data source.
    pub fn shared_getter(mut self, getter: Arc<dyn Getter>) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn build(self) -> Result<Group> {
        if self.name.is_empty() {
            return Err(Error::Config("group name is required".to_string()));
        }
        let getter = self
            .getter
            .ok_or_else(|| Error::Config("getter is required".to_string()))?;

        let metrics = Arc::new(GroupMetrics::new());
        let on_evicted: OnEvicted = {
            let metrics = metrics.clone();
            Arc::new(move |_: &str, _: &ByteView| metrics.evictions.inc())
        };

        let main = Cache::new(self.config.eviction, self.config.main_cache_bytes)
            .with_on_evicted(on_evicted.clone());
        let hot = Cache::new(self.config.eviction, self.config.hot_cache_bytes())
            .with_on_evicted(on_evicted);

        Ok(Group {
            name: self.name.into(),
            hot_keys: Arc::new(HotKeyTracker::new(self.config.hot_key_qps)),
            config: self.config,
            getter,
            main: Arc::new(main),
            hot: Arc::new(hot),
            picker: Arc::new(OnceCell::new()),
            flight: Flight::new(),
            metrics,
        })
    }
}

/// A named cache with its own tiers, data source and peer picker.
pub struct Group {
    name: Arc<str>,
    config: GroupConfig,
    getter: Arc<dyn Getter>,
    main: Arc<Cache>,
    hot: Arc<Cache>,
    picker: Arc<OnceCell<Arc<dyn PeerPicker>>>,
    flight: Flight<Result<ByteView>>,
    hot_keys: Arc<HotKeyTracker>,
    metrics: Arc<GroupMetrics>,
}

impl Group {
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Tier holding values loaded from the local data source.
    pub fn main_cache(&self) -> &Cache {
        &self.main
    }

    /// Tier holding promoted values owned by other peers.
    pub fn hot_cache(&self) -> &Cache {
        &self.hot
    }

    pub fn hot_keys(&self) -> &HotKeyTracker {
        &self.hot_keys
    }

    /// Snapshot of the group's counters.
    pub fn stats(&self) -> GroupStats {
        self.metrics.snapshot()
    }

    pub fn metrics(&self) -> &GroupMetrics {
        &self.metrics
    }

    /// Install the peer picker. Only one picker may ever be registered.
    pub fn register_peer_picker(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        self.picker
            .set(picker)
            .map_err(|_| Error::PeerPickerAlreadyRegistered(self.name.to_string()))?;
        info!(group = %self.name, "Peer picker registered");
        Ok(())
    }

    /// Look up `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.metrics.gets.inc();

        if let Some(value) = self.hot.get(key) {
            self.metrics.hot_hits.inc();
            debug!(group = %self.name, key, "Hot tier hit");
            return Ok(value);
        }

        if let Some(value) = self.main.get(key) {
            self.metrics.main_hits.inc();
            debug!(group = %self.name, key, "Main tier hit");
            return Ok(value);
        }

        let loader = self.loader();
        let owned = key.to_owned();
        self.flight
            .run(key, async move { loader.load(&owned).await })
            .await
    }

    fn loader(&self) -> Loader {
        Loader {
            name: self.name.clone(),
            getter: self.getter.clone(),
            main: self.main.clone(),
            hot: self.hot.clone(),
            picker: self.picker.clone(),
            hot_keys: self.hot_keys.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("main", &self.main)
            .field("hot", &self.hot)
            .field("has_picker", &self.picker.get().is_some())
            .finish()
    }
}

/// Owned handles needed by a load, so the load future does not borrow the
/// group.
struct Loader {
    name: Arc<str>,
    getter: Arc<dyn Getter>,
    main: Arc<Cache>,
    hot: Arc<Cache>,
    picker: Arc<OnceCell<Arc<dyn PeerPicker>>>,
    hot_keys: Arc<HotKeyTracker>,
    metrics: Arc<GroupMetrics>,
}

impl Loader {
    async fn load(&self, key: &str) -> Result<ByteView> {
        self.metrics.loads.inc();

        if let Some(peer) = self.picker.get().and_then(|picker| picker.pick_peer(key)) {
            match self.get_from_peer(peer.as_ref(), key).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    self.metrics.peer_errors.inc();
                    warn!(group = %self.name, key, error = %e, "Peer fetch failed, loading locally");
                }
            }
        }

        self.get_locally(key).await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let request = GetRequest::new(&*self.name, key);
        let response = peer.get(&request).await?;
        let value = ByteView::from(response.value);
        self.metrics.peer_loads.inc();

        if self.hot_keys.record_remote_hit(key) {
            self.hot.add(key, value.clone());
            self.metrics.promotions.inc();
            info!(group = %self.name, key, "Promoted hot key");
        }
        Ok(value)
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.getter.get(key).await.map_err(|e| {
            self.metrics.local_errors.inc();
            Error::from_source(e)
        })?;

        let value = ByteView::from(bytes);
        self.main.add(key, value.clone());
        self.metrics.local_loads.inc();
        debug!(group = %self.name, key, bytes = value.len(), "Loaded from data source");
        Ok(value)
    }
}
