//! Reference-counted resource cache
//!
//! This module provides a type-erased cache that can hold any type implementing
//! the [`Resource`] trait. Resources are keyed by their resolved path, loaded
//! once through a pluggable loader strategy, shared as `Arc<T>`, and evicted
//! the moment their reference count drops to zero.
//!
//! # Architecture
//!
//! - [`Resource`] trait - Implemented by cacheable types, with an optional dispose hook
//! - [`ResourceLoader`] trait - A load strategy for one resource type (closures qualify)
//! - [`ResourceCache`] - The cache, safe to share between loading threads
//!
//! Each key owns a slot with its own lock. The slot table lock is only held to
//! find or remove a slot, never while a loader runs, so slow loads of one key do
//! not block other keys. A slot that was evicted while a caller waited on it is
//! marked [`SlotState::Evicted`] and the caller retries against the table.
//!
//! # Example
//!
//! ```ignore
//! let cache = ResourceCache::new("resources/");
//! let source: Arc<String> = cache.load("shaders/basic.vert", loaders::read_text)?;
//! // ...
//! cache.release("shaders/basic.vert")?;
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::resource_error::{BoxError, ResourceError};

/// Directories created by [`ResourceCache::create_default_directories`] when no
/// list is configured
pub const DEFAULT_RESOURCE_DIRS: &[&str] = &["textures", "models", "shaders", "sounds", "materials"];

/// Trait for types that can live in the resource cache.
///
/// The type must be `Send + Sync + 'static` so a loaded value can be shared
/// by any number of holders across threads.
pub trait Resource: Send + Sync + 'static {
    /// Release anything the resource holds outside Rust's ownership
    /// (GPU handles, file locks).
    ///
    /// Called exactly once, when the cache evicts the entry. Errors are
    /// logged by the cache and never propagated.
    fn dispose(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl Resource for String {}
impl Resource for Vec<u8> {}

/// A load strategy for one resource type.
///
/// Any `Fn(&Path) -> Result<T, E>` is a loader, so plain functions such as
/// [`loaders::read_text`] can be passed directly.
pub trait ResourceLoader<T: Resource> {
    /// Produce the resource stored at the resolved `path`.
    fn load(&self, path: &Path) -> Result<T, BoxError>;
}

impl<T, F, E> ResourceLoader<T> for F
where
    T: Resource,
    F: Fn(&Path) -> Result<T, E>,
    E: Into<BoxError>,
{
    fn load(&self, path: &Path) -> Result<T, BoxError> {
        self(path).map_err(Into::into)
    }
}

/// Ready-made file loaders
pub mod loaders {
    use std::fs;
    use std::io;
    use std::path::Path;

    /// Read a UTF-8 text file (shader sources, material descriptions)
    pub fn read_text(path: &Path) -> Result<String, io::Error> {
        fs::read_to_string(path)
    }

    /// Read a file as raw bytes
    pub fn read_bytes(path: &Path) -> Result<Vec<u8>, io::Error> {
        fs::read(path)
    }
}

type DisposeFn = fn(&(dyn Any + Send + Sync)) -> Result<(), BoxError>;

fn dispose_erased<T: Resource>(value: &(dyn Any + Send + Sync)) -> Result<(), BoxError> {
    match value.downcast_ref::<T>() {
        Some(resource) => resource.dispose(),
        None => Ok(()),
    }
}

/// A loaded resource and its reference count
struct ResourceEntry {
    /// The resource, type-erased behind `Arc<dyn Any + Send + Sync>`
    value: Arc<dyn Any + Send + Sync>,
    /// Type name recorded at load time (for mismatch diagnostics)
    type_name: &'static str,
    /// Starts at 1; the entry is evicted when it reaches 0
    ref_count: AtomicUsize,
    dispose: DisposeFn,
}

impl ResourceEntry {
    fn new<T: Resource>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
            ref_count: AtomicUsize::new(1),
            dispose: dispose_erased::<T>,
        }
    }

    fn acquire(&self) -> usize {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement, returning the remaining count. Never wraps below zero.
    fn release(&self) -> usize {
        let previous = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    fn count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }
}

enum SlotState {
    /// Freshly created; the first caller to lock it runs the loader
    Vacant,
    Loaded(ResourceEntry),
    /// Removed from the table; callers holding this slot must retry
    Evicted,
}

struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn vacant() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Vacant),
        })
    }
}

/// A keyed, reference-counted store of loaded resources.
///
/// # Features
///
/// - **Deduplication**: Loading the same resolved path twice runs the loader once
/// - **Reference counting**: Every `load` must be paired with a `release`
/// - **Disposal**: Evicted resources get their [`Resource::dispose`] hook called once
/// - **Thread safety**: `load`/`release` may race from any number of threads
///
/// Lock order is always slot before table, which keeps the cache deadlock-free.
pub struct ResourceCache {
    /// Prefix for paths that are not rooted
    base_dir: PathBuf,
    slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new("resources/")
    }
}

impl ResourceCache {
    /// Create an empty cache resolving relative paths against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The directory relative resource paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a resource path to its cache key.
    ///
    /// Paths beginning with `/` are rooted at the working directory: the
    /// leading separator is dropped and the base directory is not applied,
    /// so `/shaders/basic.vert` resolves to `shaders/basic.vert`. Anything
    /// else is joined onto the base directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPath`] for empty paths, a bare `/`,
    /// a doubled leading separator, or paths containing NUL.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ResourceError> {
        if path.is_empty() || path.contains('\0') {
            return Err(ResourceError::InvalidPath(path.to_string()));
        }
        if let Some(rest) = path.strip_prefix('/') {
            if rest.is_empty() || rest.starts_with('/') {
                return Err(ResourceError::InvalidPath(path.to_string()));
            }
            return Ok(PathBuf::from(rest));
        }
        Ok(self.base_dir.join(path))
    }

    /// Load a resource, or take another reference to the cached one.
    ///
    /// On a cache hit the reference count is incremented and the shared value
    /// returned; `loader` is not called. On a miss `loader` runs with the
    /// resolved path while other callers for the same key wait, and the
    /// result is stored with a count of 1.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::InvalidPath`] if the path cannot be resolved
    /// - [`ResourceError::Load`] if the loader fails (nothing is cached)
    /// - [`ResourceError::TypeMismatch`] if the key holds a different type
    pub fn load<T, F, E>(&self, path: &str, loader: F) -> Result<Arc<T>, ResourceError>
    where
        T: Resource,
        F: FnOnce(&Path) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let key = self.resolve(path)?;
        let mut loader = Some(loader);

        loop {
            let slot = self.slot_for(&key);
            let mut state = slot.state.lock();

            if let SlotState::Loaded(entry) = &*state {
                let value = entry.value.clone().downcast::<T>().map_err(|_| {
                    log::warn!(
                        "Resource {} requested as {} but cached as {}",
                        key.display(),
                        type_name::<T>(),
                        entry.type_name
                    );
                    ResourceError::TypeMismatch {
                        path: key.clone(),
                        expected: type_name::<T>(),
                    }
                })?;
                let count = entry.acquire();
                log::trace!("Cache hit for {} (refs: {})", key.display(), count);
                return Ok(value);
            }

            if matches!(*state, SlotState::Evicted) {
                // Evicted between the table lookup and the slot lock
                continue;
            }

            // Vacant: this caller loads. Other callers for the key block on the slot lock.
            let Some(loader) = loader.take() else {
                // Unreachable: a vacant slot is only ever seen once per call,
                // because a failed load returns below.
                return Err(ResourceError::NotLoaded(key));
            };
            log::debug!("Loading resource {}", key.display());
            return match loader(&key) {
                Ok(resource) => {
                    let value = Arc::new(resource);
                    *state = SlotState::Loaded(ResourceEntry::new(value.clone()));
                    Ok(value)
                }
                Err(source) => {
                    *state = SlotState::Evicted;
                    self.remove_slot(&key, &slot);
                    Err(ResourceError::Load {
                        path: key,
                        source: source.into(),
                    })
                }
            };
        }
    }

    /// Load through a named [`ResourceLoader`] strategy
    pub fn load_with<T, L>(&self, path: &str, loader: &L) -> Result<Arc<T>, ResourceError>
    where
        T: Resource,
        L: ResourceLoader<T> + ?Sized,
    {
        self.load(path, |resolved| loader.load(resolved))
    }

    /// Release one reference to a resource.
    ///
    /// When the count reaches zero the entry is removed and the resource's
    /// dispose hook runs. Dispose failures are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotLoaded`] when the key has no live entry,
    /// including every release beyond the number of loads. The cache is not
    /// modified in that case.
    pub fn release(&self, path: &str) -> Result<(), ResourceError> {
        let key = self.resolve(path)?;
        let Some(slot) = self.slots.lock().get(&key).cloned() else {
            log::warn!("Release of resource that is not loaded: {}", key.display());
            return Err(ResourceError::NotLoaded(key));
        };

        let mut state = slot.state.lock();
        let remaining = match &*state {
            SlotState::Loaded(entry) => entry.release(),
            SlotState::Vacant | SlotState::Evicted => {
                log::warn!("Release of resource that is not loaded: {}", key.display());
                return Err(ResourceError::NotLoaded(key));
            }
        };
        log::trace!("Released {} (refs: {})", key.display(), remaining);

        if remaining == 0 {
            let evicted = std::mem::replace(&mut *state, SlotState::Evicted);
            self.remove_slot(&key, &slot);
            drop(state);
            if let SlotState::Loaded(entry) = evicted {
                log::debug!("Evicting resource {}", key.display());
                Self::dispose_entry(&key, entry);
            }
        }
        Ok(())
    }

    /// Force-unload every entry regardless of reference count.
    ///
    /// This is the engine shutdown path. Returns the number of entries unloaded.
    pub fn cleanup(&self) -> usize {
        let drained: Vec<(PathBuf, Arc<Slot>)> = self.slots.lock().drain().collect();
        let mut unloaded = 0;

        for (key, slot) in drained {
            let evicted = std::mem::replace(&mut *slot.state.lock(), SlotState::Evicted);
            if let SlotState::Loaded(entry) = evicted {
                let refs = entry.count();
                if refs > 0 {
                    log::debug!("Force-unloading {} ({} refs outstanding)", key.display(), refs);
                }
                Self::dispose_entry(&key, entry);
                unloaded += 1;
            }
        }

        if unloaded > 0 {
            log::info!("Resource cache cleaned up ({} resources unloaded)", unloaded);
        }
        unloaded
    }

    /// Current reference count for a path, or `None` if it is not loaded
    pub fn ref_count(&self, path: &str) -> Option<usize> {
        let key = self.resolve(path).ok()?;
        let slot = self.slots.lock().get(&key).cloned()?;
        let state = slot.state.lock();
        match &*state {
            SlotState::Loaded(entry) => Some(entry.count()),
            _ => None,
        }
    }

    /// Check whether a path currently has a live entry
    pub fn contains(&self, path: &str) -> bool {
        self.ref_count(path).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.lock().values().cloned().collect();
        slots
            .iter()
            .filter(|slot| matches!(*slot.state.lock(), SlotState::Loaded(_)))
            .count()
    }

    /// Check if the cache holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create the resource directory layout under the base directory
    pub fn create_default_directories<S: AsRef<str>>(&self, dirs: &[S]) -> Result<(), ResourceError> {
        for dir in dirs {
            let path = self.base_dir.join(dir.as_ref());
            if !path.exists() {
                fs::create_dir_all(&path)?;
                log::debug!("Created resource directory {}", path.display());
            }
        }
        Ok(())
    }

    /// Read a resource file's bytes without caching them
    pub fn read_bytes(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
        let resolved = self.resolve(path)?;
        Ok(fs::read(resolved)?)
    }

    fn slot_for(&self, key: &Path) -> Arc<Slot> {
        self.slots
            .lock()
            .entry(key.to_path_buf())
            .or_insert_with(Slot::vacant)
            .clone()
    }

    /// Remove `slot` from the table if it is still the one registered for `key`.
    /// Callers hold the slot lock (slot-before-table order).
    fn remove_slot(&self, key: &Path, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    fn dispose_entry(key: &Path, entry: ResourceEntry) {
        if let Err(source) = (entry.dispose)(entry.value.as_ref()) {
            let err = ResourceError::Dispose {
                path: key.to_path_buf(),
                source,
            };
            log::error!("{}", err);
        }
    }
}

impl Drop for ResourceCache {
    fn drop(&mut self) {
        self.cleanup();
    }
}
