// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact selection results.

use parcel_index::FileId;

/// A particle, addressed by its file and its position within that file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleRef {
    /// Data file holding the particle.
    pub file: FileId,
    /// Position of the particle within the file.
    pub index: u64,
}

/// Particles passing a query's exact test, sorted by file then index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    particles: Vec<ParticleRef>,
}

impl Selection {
    pub(crate) fn from_sorted(particles: Vec<ParticleRef>) -> Self {
        debug_assert!(
            particles.windows(2).all(|w| w[0] < w[1]),
            "selection must be sorted and unique"
        );
        Self { particles }
    }

    /// Number of selected particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Selected particles.
    pub fn particles(&self) -> &[ParticleRef] {
        &self.particles
    }

    /// Iterate over the selected particles.
    pub fn iter(&self) -> impl Iterator<Item = &ParticleRef> + '_ {
        self.particles.iter()
    }

    /// Whether `particle` is selected.
    pub fn contains(&self, particle: ParticleRef) -> bool {
        self.particles.binary_search(&particle).is_ok()
    }

    /// Selected particles of one file.
    pub fn in_file(&self, file: FileId) -> &[ParticleRef] {
        let lo = self.particles.partition_point(|p| p.file < file);
        let hi = self.particles.partition_point(|p| p.file <= file);
        &self.particles[lo..hi]
    }

    /// Files holding at least one selected particle.
    pub fn files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.particles.iter().map(|p| p.file).collect();
        files.dedup();
        files
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a ParticleRef;
    type IntoIter = std::slice::Iter<'a, ParticleRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(file: u32, index: u64) -> ParticleRef {
        ParticleRef {
            file: FileId(file),
            index,
        }
    }

    #[test]
    fn per_file_views() {
        let s = Selection::from_sorted(vec![r(0, 1), r(0, 4), r(2, 0)]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.in_file(FileId(0)), &[r(0, 1), r(0, 4)]);
        assert!(s.in_file(FileId(1)).is_empty());
        assert_eq!(s.files(), vec![FileId(0), FileId(2)]);
        assert!(s.contains(r(2, 0)));
        assert!(!s.contains(r(2, 1)));
        assert!(Selection::default().is_empty());
    }
}
