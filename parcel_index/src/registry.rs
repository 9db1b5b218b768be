// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data file descriptors and the coordinate source seam.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Stable identifier of a data file: its position in the [`DataFileRegistry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Position in the registry.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Id of the file at registry position `index`.
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "More than u32::MAX files is not a supported configuration."
        )]
        let id = Self(index as u32);
        id
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One on-disk particle file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFile {
    id: FileId,
    filename: String,
    counts: BTreeMap<String, u64>,
}

impl DataFile {
    /// Identifier.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Path or name of the file as the reader knows it.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared particle count per particle type.
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Declared particle count over all types.
    pub fn total_particles(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Ordered collection of data files. Registration order fixes [`FileId`]s and ownership
/// tie-breaks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataFileRegistry {
    files: Vec<DataFile>,
}

impl DataFileRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn push<K: Into<String>>(
        &mut self,
        filename: impl Into<String>,
        counts: impl IntoIterator<Item = (K, u64)>,
    ) -> FileId {
        let id = FileId::from_index(self.files.len());
        self.files.push(DataFile {
            id,
            filename: filename.into(),
            counts: counts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        });
        id
    }

    /// Look up a file.
    pub fn get(&self, id: FileId) -> Option<&DataFile> {
        self.files.get(id.index())
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if no file is registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in registration order.
    pub fn files(&self) -> &[DataFile] {
        &self.files
    }

    /// Declared particles over all files.
    pub fn total_particles(&self) -> u64 {
        self.files.iter().map(DataFile::total_particles).sum()
    }
}

/// A particle as seen by the index: a position and a support (smoothing) radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Particle {
    /// Position.
    pub position: DVec3,
    /// Support radius. Zero for point particles.
    pub support_radius: f64,
}

impl Particle {
    /// Particle at `position` with support radius `support_radius`.
    pub const fn new(position: DVec3, support_radius: f64) -> Self {
        Self {
            position,
            support_radius,
        }
    }
}

/// Error type returned by coordinate sources.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Reader capability that streams particle coordinates out of data files.
///
/// Implementations are supplied by dataset frontends. Every call restarts the file from
/// its first particle; the index reads each file once per build pass.
pub trait CoordinateSource: Sync {
    /// Stream every particle of `file`, in file order, across all particle types.
    fn particles<'a>(
        &'a self,
        file: &DataFile,
    ) -> Result<Box<dyn Iterator<Item = Particle> + 'a>, SourceError>;
}

/// In-memory coordinate source, one particle list per file.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: Vec<Vec<Particle>>,
    registry: DataFileRegistry,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file holding `particles` of type `particle_type`.
    pub fn push_file(&mut self, particle_type: &str, particles: Vec<Particle>) -> FileId {
        let id = self.registry.push(
            format!("memory:{}", self.files.len()),
            [(particle_type, particles.len() as u64)],
        );
        self.files.push(particles);
        id
    }

    /// Descriptors of the files added so far.
    pub fn registry(&self) -> &DataFileRegistry {
        &self.registry
    }

    /// Particles of one file.
    pub fn file(&self, id: FileId) -> Option<&[Particle]> {
        self.files.get(id.index()).map(Vec::as_slice)
    }
}

impl CoordinateSource for MemorySource {
    fn particles<'a>(
        &'a self,
        file: &DataFile,
    ) -> Result<Box<dyn Iterator<Item = Particle> + 'a>, SourceError> {
        let particles = self
            .file(file.id())
            .ok_or_else(|| format!("no particles stored for file {}", file.id()))?;
        Ok(Box::new(particles.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_assigns_ids_in_order() {
        let mut reg = DataFileRegistry::new();
        let a = reg.push("a.h5", [("gas", 10), ("stars", 2)]);
        let b = reg.push("b.h5", [("gas", 5)]);
        assert_eq!((a, b), (FileId(0), FileId(1)));
        assert_eq!(reg.get(a).map(DataFile::total_particles), Some(12));
        assert_eq!(reg.total_particles(), 17);
        assert!(reg.get(FileId(2)).is_none());
        assert_eq!(b.to_string(), "#1");
    }

    #[test]
    fn memory_source_streams_each_file() {
        let mut src = MemorySource::new();
        let id = src.push_file(
            "gas",
            vec![
                Particle::new(DVec3::ZERO, 0.1),
                Particle::new(DVec3::ONE, 0.2),
            ],
        );
        let file = src.registry().get(id).cloned().unwrap();
        assert_eq!(file.counts().get("gas"), Some(&2));
        let read: Vec<Particle> = src.particles(&file).unwrap().collect();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].position, DVec3::ONE);
        // A second call starts over.
        assert_eq!(src.particles(&file).unwrap().count(), 2);
    }
}
