// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::fmt;

use glam::DVec3;

use crate::error::SelectorError;

/// Axis-aligned bounding box in 3D.
///
/// Both corners are inclusive. A box whose `max` is below its `min` on any axis is
/// considered empty; see [`Aabb3::is_empty`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb3 {
    /// A box covering all of space. Used as the bound of unbounded selectors.
    pub const EVERYWHERE: Self = Self {
        min: DVec3::NEG_INFINITY,
        max: DVec3::INFINITY,
    };

    /// Create a new AABB from min/max corners.
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center and half-extents.
    pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Whether this AABB contains the point (inclusive on every face).
    #[inline]
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Whether two AABBs share any interior or boundary point.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// The intersection of two AABBs. May be empty.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// The smallest AABB containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box by `by` on every face.
    pub fn expand(&self, by: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(by),
            max: self.max + DVec3::splat(by),
        }
    }

    /// Return true if the AABB is inverted on any axis. Assumes no NaN.
    pub fn is_empty(&self) -> bool {
        self.max.cmplt(self.min).any()
    }

    /// `max - min`.
    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Midpoint of the box.
    #[inline]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Squared distance from `p` to the closest point of the box (zero inside).
    #[inline]
    pub fn distance_squared_to_point(&self, p: DVec3) -> f64 {
        let closest = p.max(self.min).min(self.max);
        (p - closest).length_squared()
    }
}

/// A coordinate axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    /// All three axes in order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Component index of this axis in a `DVec3`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl TryFrom<char> for Axis {
    type Error = SelectorError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'x' | 'X' => Ok(Self::X),
            'y' | 'Y' => Ok(Self::Y),
            'z' | 'Z' => Ok(Self::Z),
            other => Err(SelectorError::UnknownAxis(other)),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_box_is_zero_inside() {
        let b = Aabb3::new(DVec3::ZERO, DVec3::ONE);
        assert_eq!(b.distance_squared_to_point(DVec3::splat(0.5)), 0.0);
        assert_eq!(b.distance_squared_to_point(DVec3::new(2.0, 0.5, 0.5)), 1.0);
        assert_eq!(b.distance_squared_to_point(DVec3::new(2.0, 2.0, 0.5)), 2.0);
    }

    #[test]
    fn intersect_of_disjoint_boxes_is_empty() {
        let a = Aabb3::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb3::new(DVec3::splat(2.0), DVec3::splat(3.0));
        assert!(!a.overlaps(&b));
        assert!(a.intersect(&b).is_empty());
        assert!(!a.union(&b).is_empty());
    }

    #[test]
    fn touching_faces_overlap() {
        let a = Aabb3::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb3::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn axis_parses_case_insensitively() {
        assert_eq!(Axis::try_from('Z'), Ok(Axis::Z));
        assert_eq!(Axis::try_from('y'), Ok(Axis::Y));
        assert_eq!(Axis::try_from('w'), Err(SelectorError::UnknownAxis('w')));
    }
}
