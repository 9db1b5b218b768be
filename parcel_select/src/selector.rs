// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Selector`] expression tree.

use alloc::boxed::Box;
use core::ops::{BitAnd, BitOr, BitXor, Not, Sub};

use glam::DVec3;

use crate::error::Result;
use crate::shapes::{CuttingPlane, Disk, Ray, Region, Sphere, Slice};
use crate::types::{Aabb3, Axis};

/// A geometric predicate over particles, or a boolean combination of predicates.
///
/// Boolean nodes combine the *selection results* of their children: a particle is in
/// `And(a, b)` exactly when it is in both `a` and `b`, and so on. They never look at
/// geometry directly, so every identity of set algebra (associativity, commutativity,
/// De Morgan) holds for the selected particle sets.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// Axis-aligned box.
    Region(Region),
    /// Ball.
    Sphere(Sphere),
    /// Thick disk (cylinder).
    Disk(Disk),
    /// Line segment.
    Ray(Ray),
    /// Arbitrary plane.
    CuttingPlane(CuttingPlane),
    /// Axis-aligned plane.
    Slice(Slice),
    /// Set intersection.
    And(Box<Selector>, Box<Selector>),
    /// Set union.
    Or(Box<Selector>, Box<Selector>),
    /// Symmetric difference.
    Xor(Box<Selector>, Box<Selector>),
    /// Complement within the domain.
    Not(Box<Selector>),
}

impl Selector {
    /// Box between `left_edge` and `right_edge`.
    pub fn region(left_edge: DVec3, right_edge: DVec3) -> Result<Self> {
        Region::new(left_edge, right_edge).map(Self::Region)
    }

    /// Ball of `radius` around `center`.
    pub fn sphere(center: DVec3, radius: f64) -> Result<Self> {
        Sphere::new(center, radius).map(Self::Sphere)
    }

    /// Disk of `radius` around `center`, `height` above and below its plane.
    pub fn disk(center: DVec3, normal: DVec3, radius: f64, height: f64) -> Result<Self> {
        Disk::new(center, normal, radius, height).map(Self::Disk)
    }

    /// Segment from `start` to `end`.
    pub fn ray(start: DVec3, end: DVec3) -> Result<Self> {
        Ray::new(start, end).map(Self::Ray)
    }

    /// Plane through `point` with `normal`.
    pub fn cutting_plane(normal: DVec3, point: DVec3) -> Result<Self> {
        CuttingPlane::new(normal, point).map(Self::CuttingPlane)
    }

    /// Plane `p[axis] == coordinate`.
    pub fn slice(axis: Axis, coordinate: f64) -> Result<Self> {
        Slice::new(axis, coordinate).map(Self::Slice)
    }

    /// `self ∩ other`.
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self ∪ other`.
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `self ⊕ other`.
    pub fn xor(self, other: Self) -> Self {
        Self::Xor(Box::new(self), Box::new(other))
    }

    /// Everything in the domain not selected by `self`.
    pub fn complement(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `self ∩ ¬other`.
    pub fn difference(self, other: Self) -> Self {
        self.and(other.complement())
    }

    /// Restrict `self` to particles already selected by `base`.
    ///
    /// This is chained selection: the result never contains anything outside `base`.
    pub fn within(self, base: Self) -> Self {
        base.and(self)
    }

    /// Fold a list of selectors with `∩`. Returns `None` for an empty list.
    pub fn intersection(selectors: impl IntoIterator<Item = Self>) -> Option<Self> {
        selectors.into_iter().reduce(Self::and)
    }

    /// Fold a list of selectors with `∪`. Returns `None` for an empty list.
    pub fn union(selectors: impl IntoIterator<Item = Self>) -> Option<Self> {
        selectors.into_iter().reduce(Self::or)
    }

    /// Whether this node is a boolean combinator.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::And(..) | Self::Or(..) | Self::Xor(..) | Self::Not(..)
        )
    }

    /// Exact inclusion test for a particle at `p` with support radius `h`.
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        match self {
            Self::Region(r) => r.select_particle(p, h),
            Self::Sphere(s) => s.select_particle(p, h),
            Self::Disk(d) => d.select_particle(p, h),
            Self::Ray(r) => r.select_particle(p, h),
            Self::CuttingPlane(c) => c.select_particle(p, h),
            Self::Slice(s) => s.select_particle(p, h),
            Self::And(a, b) => a.select_particle(p, h) && b.select_particle(p, h),
            Self::Or(a, b) => a.select_particle(p, h) || b.select_particle(p, h),
            Self::Xor(a, b) => a.select_particle(p, h) != b.select_particle(p, h),
            Self::Not(a) => !a.select_particle(p, h),
        }
    }

    /// Inclusion test for a bare point (zero support radius).
    pub fn select_point(&self, p: DVec3) -> bool {
        self.select_particle(p, 0.0)
    }

    /// Conservative test: can anything selected by `self` lie inside `cell`?
    ///
    /// `cell` must be finite. A `false` answer is a proof that the selection misses the
    /// box; `true` only means it might not.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        match self {
            Self::Region(r) => r.may_intersect(cell),
            Self::Sphere(s) => s.may_intersect(cell),
            Self::Disk(d) => d.may_intersect(cell),
            Self::Ray(r) => r.may_intersect(cell),
            Self::CuttingPlane(c) => c.may_intersect(cell),
            Self::Slice(s) => s.may_intersect(cell),
            Self::And(a, b) => a.may_intersect(cell) && b.may_intersect(cell),
            Self::Or(a, b) | Self::Xor(a, b) => a.may_intersect(cell) || b.may_intersect(cell),
            // The complement of anything but the whole cell reaches into the cell.
            Self::Not(_) => true,
        }
    }

    /// Bounding box of the geometric region. Unbounded selectors return
    /// [`Aabb3::EVERYWHERE`] on their free axes; callers clip to the domain.
    pub fn bounds(&self) -> Aabb3 {
        match self {
            Self::Region(r) => r.aabb(),
            Self::Sphere(s) => s.bounds(),
            Self::Disk(d) => d.bounds(),
            Self::Ray(r) => r.bounds(),
            Self::CuttingPlane(_) | Self::Not(_) => Aabb3::EVERYWHERE,
            Self::Slice(s) => s.bounds(),
            Self::And(a, b) => a.bounds().intersect(&b.bounds()),
            Self::Or(a, b) | Self::Xor(a, b) => a.bounds().union(&b.bounds()),
        }
    }

    /// Box holding the centre of every particle with support radius at most `h` that
    /// `self` selects.
    ///
    /// Unlike `bounds().expand(h)`, children of `And` are grown before they are
    /// intersected: two regions that never overlap can still both reach one support
    /// sphere.
    pub fn reach(&self, h: f64) -> Aabb3 {
        match self {
            Self::CuttingPlane(_) | Self::Not(_) => Aabb3::EVERYWHERE,
            Self::And(a, b) => a.reach(h).intersect(&b.reach(h)),
            Self::Or(a, b) | Self::Xor(a, b) => a.reach(h).union(&b.reach(h)),
            leaf => leaf.bounds().expand(h),
        }
    }
}

impl BitAnd for Selector {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.and(rhs)
    }
}

impl BitOr for Selector {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.or(rhs)
    }
}

impl BitXor for Selector {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self.xor(rhs)
    }
}

impl Sub for Selector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl Not for Selector {
    type Output = Self;

    fn not(self) -> Self {
        self.complement()
    }
}
