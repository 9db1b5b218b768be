// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An explicit, shareable cache of built or loaded indexes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parcel_index::{BuildFlags, DataFileRegistry, IndexConfig, SpatialBitmapIndex};

/// Identity of a cached index: its file location, the build settings that shape its
/// contents, and the size of the dataset it covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexKey {
    /// Index file path.
    pub path: PathBuf,
    /// Coarse order.
    pub order1: u8,
    /// Refinement order.
    pub order2: u8,
    /// Build flags that change what gets built. [`BuildFlags::DONT_CACHE`] does not.
    pub flags: BuildFlags,
    /// Number of data files.
    pub files: usize,
    /// Number of particles over all files.
    pub particles: u64,
}

impl IndexKey {
    /// Key of the index `config` describes for the dataset at `dataset_path` holding the
    /// files of `registry`.
    pub fn new(dataset_path: &Path, registry: &DataFileRegistry, config: &IndexConfig) -> Self {
        Self {
            path: config.index_filename(dataset_path),
            order1: config.order1,
            order2: config.order2,
            flags: config.flags.intersection(BuildFlags::NO_REFINE),
            files: registry.len(),
            particles: registry.total_particles(),
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<SpatialBitmapIndex>>>>;

fn recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Indexes shared between every [`ParticleIndex`](crate::ParticleIndex) given the same
/// cache.
///
/// Clones share storage. Each key has its own slot, so building one index never blocks
/// lookups of another. A poisoned lock is recovered: slots only ever hold a whole index
/// or nothing, so they are consistent even if a holder panicked.
#[derive(Clone, Debug, Default)]
pub struct IndexCache {
    slots: Arc<Mutex<HashMap<IndexKey, Slot>>>,
}

impl IndexCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &IndexKey) -> Slot {
        recover(&self.slots).entry(key.clone()).or_default().clone()
    }

    /// Cached index for `key`.
    ///
    /// Waits if that index is being built.
    pub fn get(&self, key: &IndexKey) -> Option<Arc<SpatialBitmapIndex>> {
        let slot = recover(&self.slots).get(key).cloned()?;
        recover(&slot).clone()
    }

    /// Store `index` under `key`, returning the index it replaces.
    pub fn insert(
        &self,
        key: IndexKey,
        index: Arc<SpatialBitmapIndex>,
    ) -> Option<Arc<SpatialBitmapIndex>> {
        recover(&self.slot(&key)).replace(index)
    }

    /// Drop the entry for `key`.
    pub fn invalidate(&self, key: &IndexKey) -> Option<Arc<SpatialBitmapIndex>> {
        let slot = recover(&self.slots).remove(key)?;
        recover(&slot).take()
    }

    /// Number of keys cached or being built.
    pub fn len(&self) -> usize {
        recover(&self.slots).len()
    }

    /// True if nothing is cached or being built.
    pub fn is_empty(&self) -> bool {
        recover(&self.slots).is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        recover(&self.slots).clear();
    }

    /// Cached index for `key`, or the result of `init`, which is cached on success.
    ///
    /// Only the slot of `key` is locked while `init` runs: concurrent callers for the same
    /// key build at most once, callers for other keys go ahead.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: IndexKey,
        init: impl FnOnce() -> Result<SpatialBitmapIndex, E>,
    ) -> Result<Arc<SpatialBitmapIndex>, E> {
        let slot = self.slot(&key);
        let mut entry = recover(&slot);
        if let Some(index) = entry.as_ref() {
            return Ok(index.clone());
        }
        match init() {
            Ok(index) => {
                let index = Arc::new(index);
                *entry = Some(index.clone());
                Ok(index)
            }
            Err(err) => {
                drop(entry);
                self.forget_empty(&key, &slot);
                Err(err)
            }
        }
    }

    /// Remove `slot` if it is still the one stored under `key` and holds nothing.
    fn forget_empty(&self, key: &IndexKey, slot: &Slot) {
        let mut slots = recover(&self.slots);
        let unused = slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot))
            // A busy slot belongs to a caller that is building right now.
            && slot.try_lock().is_ok_and(|entry| entry.is_none());
        if unused {
            slots.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;

    use glam::DVec3;
    use parcel_index::{MemorySource, Particle};
    use parcel_select::Aabb3;

    use super::*;

    fn small_index() -> SpatialBitmapIndex {
        let mut src = MemorySource::new();
        src.push_file("gas", vec![Particle::new(DVec3::ZERO, 0.1)]);
        let domain = Aabb3::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let cfg = IndexConfig::default().with_orders(2, 1);
        SpatialBitmapIndex::build(domain, src.registry(), &src, &cfg).unwrap()
    }

    fn empty_registry() -> DataFileRegistry {
        DataFileRegistry::new()
    }

    #[test]
    fn keys_follow_the_index_filename_and_the_dataset() {
        let mut src = MemorySource::new();
        src.push_file("gas", vec![Particle::new(DVec3::ZERO, 0.1)]);
        let registry = src.registry().clone();
        let path = Path::new("/data/snap");
        let cfg = IndexConfig::default().with_orders(3, 2);
        let key = IndexKey::new(path, &registry, &cfg);
        assert_eq!(key.path, PathBuf::from("/data/snap.index3_2.pbmi"));
        assert_eq!((key.files, key.particles), (1, 1));

        assert_ne!(key, IndexKey::new(path, &registry, &cfg.clone().with_orders(3, 3)));
        let coarse_only = cfg.clone().with_flags(BuildFlags::NO_REFINE);
        assert_ne!(key, IndexKey::new(path, &registry, &coarse_only));
        let uncached = cfg.clone().with_flags(BuildFlags::DONT_CACHE);
        assert_eq!(key, IndexKey::new(path, &registry, &uncached));

        src.push_file("gas", vec![Particle::new(DVec3::splat(0.5), 0.1)]);
        assert_ne!(key, IndexKey::new(path, src.registry(), &cfg));
    }

    #[test]
    fn init_runs_once_per_key() {
        let cache = IndexCache::new();
        let shared = cache.clone();
        let key = IndexKey::new(Path::new("a"), &empty_registry(), &IndexConfig::default());
        let mut calls = 0;
        let first = cache
            .get_or_try_insert_with::<()>(key.clone(), || {
                calls += 1;
                Ok(small_index())
            })
            .unwrap();
        let second = shared
            .get_or_try_insert_with::<()>(key.clone(), || {
                calls += 1;
                Ok(small_index())
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(shared.len(), 1);

        assert!(cache.invalidate(&key).is_some());
        assert!(shared.is_empty());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn failed_init_caches_nothing() {
        let cache = IndexCache::new();
        let key = IndexKey::new(Path::new("b"), &empty_registry(), &IndexConfig::default());
        let err = cache.get_or_try_insert_with(key.clone(), || Err("unreadable"));
        assert_eq!(err.unwrap_err(), "unreadable");
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
        cache.insert(key, Arc::new(small_index()));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn building_one_key_does_not_block_another() {
        let cache = IndexCache::new();
        let registry = empty_registry();
        let slow = IndexKey::new(Path::new("slow"), &registry, &IndexConfig::default());
        let quick = IndexKey::new(Path::new("quick"), &registry, &IndexConfig::default());
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        thread::scope(|s| {
            let builder = {
                let cache = cache.clone();
                let slow = slow.clone();
                s.spawn(move || {
                    cache.get_or_try_insert_with::<()>(slow, || {
                        started_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(small_index())
                    })
                })
            };
            started_rx.recv().unwrap();

            // The slow build is still holding its slot.
            let quick_index = cache
                .get_or_try_insert_with::<()>(quick.clone(), || Ok(small_index()))
                .unwrap();
            assert!(Arc::ptr_eq(&quick_index, &cache.get(&quick).unwrap()));
            assert_eq!(cache.len(), 2);

            release_tx.send(()).unwrap();
            let slow_index = builder.join().unwrap().unwrap();
            assert!(Arc::ptr_eq(&slow_index, &cache.get(&slow).unwrap()));
        });
    }
}
