// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The orchestrator tying a dataset to its bitmap index and chunked queries.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use glam::DVec3;
use parcel_index::{
    BuildFlags, CoordinateSource, DataFileRegistry, IndexConfig, SpatialBitmapIndex,
};
use parcel_select::{Aabb3, Axis, Selector};
use tracing::{debug, info, warn};

use crate::cache::{IndexCache, IndexKey};
use crate::chunk::{Chunk, ChunkIter, ChunkStyle};
use crate::error::{ChunkError, Result};
use crate::query::{Query, Subsets};
use crate::selection::{ParticleRef, Selection};

/// A particle dataset: its files, their coordinate source, and the bitmap index over them.
///
/// The index is initialised on first use, from the [`IndexCache`] if another
/// `ParticleIndex` already holds it, otherwise by loading the persisted file or
/// building it. After that it is read-only and shared by every query.
#[derive(Debug)]
pub struct ParticleIndex<S> {
    dataset_path: PathBuf,
    domain: Aabb3,
    registry: DataFileRegistry,
    source: S,
    config: IndexConfig,
    cache: IndexCache,
    index: OnceLock<Arc<SpatialBitmapIndex>>,
}

impl<S: CoordinateSource> ParticleIndex<S> {
    /// Dataset rooted at `dataset_path` with a private index cache.
    ///
    /// `dataset_path` names the dataset; the index file lives next to it unless
    /// `config` sets an explicit path.
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        domain: Aabb3,
        registry: DataFileRegistry,
        source: S,
        config: IndexConfig,
    ) -> Result<Self> {
        Self::with_cache(
            dataset_path,
            domain,
            registry,
            source,
            config,
            IndexCache::new(),
        )
    }

    /// Dataset sharing `cache` with other datasets.
    pub fn with_cache(
        dataset_path: impl Into<PathBuf>,
        domain: Aabb3,
        registry: DataFileRegistry,
        source: S,
        config: IndexConfig,
        cache: IndexCache,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dataset_path: dataset_path.into(),
            domain,
            registry,
            source,
            config,
            cache,
            index: OnceLock::new(),
        })
    }

    /// Dataset path.
    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Domain bounds.
    pub fn domain(&self) -> &Aabb3 {
        &self.domain
    }

    /// Data files.
    pub fn registry(&self) -> &DataFileRegistry {
        &self.registry
    }

    /// Coordinate source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Index cache.
    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    fn cache_key(&self) -> IndexKey {
        IndexKey::new(&self.dataset_path, &self.registry, &self.config)
    }

    /// The bitmap index, initialising it on first call.
    pub fn index(&self) -> Result<Arc<SpatialBitmapIndex>> {
        if let Some(index) = self.index.get() {
            return Ok(index.clone());
        }
        let index = self.cache.get_or_try_insert_with(self.cache_key(), || {
            SpatialBitmapIndex::load_or_build(
                self.domain,
                &self.registry,
                &self.source,
                &self.config,
                &self.dataset_path,
            )
        })?;
        Ok(self.index.get_or_init(|| index).clone())
    }

    /// Discard any cached or persisted index and build a fresh one.
    ///
    /// Queries resolved against the old index reset themselves on next use.
    pub fn rebuild(&mut self) -> Result<Arc<SpatialBitmapIndex>> {
        let key = self.cache_key();
        self.cache.invalidate(&key);
        self.index = OnceLock::new();
        info!(dataset = %self.dataset_path.display(), "rebuilding bitmap index");
        let index = SpatialBitmapIndex::build(
            self.domain,
            &self.registry,
            &self.source,
            &self.config,
        )?;
        if self.config.flags.contains(BuildFlags::DONT_CACHE) {
            debug!("bitmap index caching disabled");
        } else if let Err(err) = index.save(&key.path) {
            warn!(path = %key.path.display(), %err, "could not persist bitmap index");
        }
        let index = Arc::new(index);
        self.cache.insert(key, index.clone());
        Ok(self.index.get_or_init(|| index).clone())
    }

    /// Width of the smallest refined cell.
    pub fn smallest_dx(&self) -> Result<f64> {
        Ok(self.index()?.smallest_dx())
    }

    /// Query over the whole domain.
    pub fn all_data(&self) -> Result<Query> {
        Ok(Query::new(Selector::region(self.domain.min, self.domain.max)?))
    }

    /// Query over the box `[left_edge, right_edge]`.
    pub fn region(&self, left_edge: DVec3, right_edge: DVec3) -> Result<Query> {
        Ok(Query::new(Selector::region(left_edge, right_edge)?))
    }

    /// Query over a sphere.
    pub fn sphere(&self, center: DVec3, radius: f64) -> Result<Query> {
        Ok(Query::new(Selector::sphere(center, radius)?))
    }

    /// Query over a disk; `height` is the half-thickness along `normal`.
    pub fn disk(&self, center: DVec3, normal: DVec3, radius: f64, height: f64) -> Result<Query> {
        Ok(Query::new(Selector::disk(center, normal, radius, height)?))
    }

    /// Query along the segment from `start` to `end`.
    pub fn ray(&self, start: DVec3, end: DVec3) -> Result<Query> {
        Ok(Query::new(Selector::ray(start, end)?))
    }

    /// Query on the plane through `point` with normal `normal`.
    pub fn cutting_plane(&self, normal: DVec3, point: DVec3) -> Result<Query> {
        Ok(Query::new(Selector::cutting_plane(normal, point)?))
    }

    /// Query on the axis-aligned plane `axis = coordinate`.
    pub fn slice(&self, axis: Axis, coordinate: f64) -> Result<Query> {
        Ok(Query::new(Selector::slice(axis, coordinate)?))
    }

    /// Query selecting what every one of `queries` selects. `None` for no queries.
    pub fn intersection<'q>(
        &self,
        queries: impl IntoIterator<Item = &'q Query>,
    ) -> Option<Query> {
        Selector::intersection(queries.into_iter().map(|q| q.selector().clone())).map(Query::new)
    }

    /// Query selecting what any of `queries` selects. `None` for no queries.
    pub fn union<'q>(&self, queries: impl IntoIterator<Item = &'q Query>) -> Option<Query> {
        Selector::union(queries.into_iter().map(|q| q.selector().clone())).map(Query::new)
    }

    /// `selector` restricted to what `base` already selects.
    pub fn chained(&self, base: &Query, selector: Selector) -> Query {
        Query::new(selector.within(base.selector().clone()))
    }

    /// Resolve `query` and cache its subsets: selector-only for `ghost_width == 0`,
    /// buffer-bearing otherwise. Repeated calls reuse the cached subsets.
    ///
    /// The query's current chunk becomes a single chunk holding the resolved subsets.
    pub fn identify_base_chunk(&self, query: &mut Query, ghost_width: u32) -> Result<()> {
        let subsets = self.subsets(query, ghost_width)?;
        query.set_current_chunk(Chunk::new(ChunkStyle::All, subsets.to_vec()));
        Ok(())
    }

    fn subsets(&self, query: &mut Query, ghost_width: u32) -> Result<Subsets> {
        let index = self.index()?;
        if ghost_width == 0 {
            query.resolve_selector(&index, &self.registry)
        } else {
            query.resolve_buffer(&index, &self.registry, ghost_width)
        }
    }

    /// Chunks of `query` in `style`.
    ///
    /// Ghost zones (`ghost_width > 0`) are only available with [`ChunkStyle::Spatial`];
    /// asking for them with another style is a usage error.
    pub fn chunks(
        &self,
        query: &mut Query,
        style: ChunkStyle,
        ghost_width: u32,
    ) -> Result<ChunkIter> {
        if ghost_width > 0 && !style.supports_ghost_zones() {
            return Err(ChunkError::UnsupportedGhostZones { style, ghost_width });
        }
        match style {
            ChunkStyle::All => self.chunk_all(query),
            ChunkStyle::Spatial => self.chunk_spatial(query, ghost_width, false),
            ChunkStyle::Io => self.chunk_io(query),
        }
    }

    /// One chunk holding every selector-only subset.
    pub fn chunk_all(&self, query: &mut Query) -> Result<ChunkIter> {
        self.identify_base_chunk(query, 0)?;
        let subsets = self.subsets(query, 0)?;
        Ok(ChunkIter::new(ChunkStyle::All, subsets))
    }

    /// One chunk per subset, carrying a ghost-zone buffer `ghost_width` coarse cells wide.
    ///
    /// `ghost_particles` asks for at least one cell of ghost zones.
    pub fn chunk_spatial(
        &self,
        query: &mut Query,
        ghost_width: u32,
        ghost_particles: bool,
    ) -> Result<ChunkIter> {
        let ghost_width = if ghost_width == 0 && ghost_particles {
            1
        } else {
            ghost_width
        };
        let subsets = self.subsets(query, ghost_width)?;
        debug!(ghost_width, chunks = subsets.len(), "spatial chunking");
        Ok(ChunkIter::new(ChunkStyle::Spatial, subsets))
    }

    /// One chunk per selector-only subset.
    pub fn chunk_io(&self, query: &mut Query) -> Result<ChunkIter> {
        let subsets = self.subsets(query, 0)?;
        Ok(ChunkIter::new(ChunkStyle::Io, subsets))
    }

    /// Every particle `query` selects, by the exact smoothing-aware test.
    pub fn select(&self, query: &mut Query) -> Result<Selection> {
        let mut particles = Vec::new();
        for chunk in self.chunk_io(query)? {
            for subset in &chunk {
                let selector = subset.selector();
                let file = subset.file_id();
                particles.extend(
                    subset
                        .candidates(&self.source)?
                        .filter(|c| {
                            !c.ghost && selector.select_particle(c.position, c.support_radius)
                        })
                        .map(|c| ParticleRef {
                            file,
                            index: c.index,
                        }),
                );
            }
        }
        debug!(selected = particles.len(), "exact selection");
        Ok(Selection::from_sorted(particles))
    }

    /// Number of particles `query` selects.
    pub fn count(&self, query: &mut Query) -> Result<usize> {
        Ok(self.select(query)?.len())
    }
}
