// Copyright 2026 the Parcel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf selector primitives.
//!
//! Every primitive answers two questions:
//!
//! - `select_particle(p, h)`: does the support sphere of radius `h` around `p` touch the
//!   region? This is the exact, per-particle test.
//! - `may_intersect(cell)`: could the region touch this (finite) box at all? This is the
//!   conservative test used for file and cell filtering. It may answer `true` for a box
//!   the region misses, never `false` for a box it touches.

use glam::DVec3;

use crate::error::{Result, SelectorError};
use crate::types::{Aabb3, Axis};

fn finite(v: DVec3) -> Result<DVec3> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SelectorError::NonFinite)
    }
}

fn unit_normal(normal: DVec3) -> Result<DVec3> {
    finite(normal)?
        .try_normalize()
        .ok_or(SelectorError::DegenerateNormal)
}

fn non_negative(v: f64, err: fn(f64) -> SelectorError) -> Result<f64> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(err(v))
    }
}

/// `|n|` projected half-extent of a box onto a unit direction.
#[inline]
fn projected_radius(half: DVec3, n: DVec3) -> f64 {
    half.dot(n.abs())
}

/// Axis-aligned box between two corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    left_edge: DVec3,
    right_edge: DVec3,
}

impl Region {
    /// Create a region. Fails when the left edge exceeds the right edge on any axis.
    pub fn new(left_edge: DVec3, right_edge: DVec3) -> Result<Self> {
        let left_edge = finite(left_edge)?;
        let right_edge = finite(right_edge)?;
        if right_edge.cmplt(left_edge).any() {
            return Err(SelectorError::InvertedRegion);
        }
        Ok(Self {
            left_edge,
            right_edge,
        })
    }

    /// Lower corner.
    pub fn left_edge(&self) -> DVec3 {
        self.left_edge
    }

    /// Upper corner.
    pub fn right_edge(&self) -> DVec3 {
        self.right_edge
    }

    /// The region as an AABB.
    pub fn aabb(&self) -> Aabb3 {
        Aabb3::new(self.left_edge, self.right_edge)
    }

    /// Exact smoothing-aware test.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        self.aabb().distance_squared_to_point(p) <= h * h
    }

    /// Conservative box test.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        self.aabb().overlaps(cell)
    }
}

/// Ball of `radius` around `center`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Sphere {
    /// Create a sphere.
    pub fn new(center: DVec3, radius: f64) -> Result<Self> {
        Ok(Self {
            center: finite(center)?,
            radius: non_negative(radius, SelectorError::InvalidRadius)?,
        })
    }

    /// Sphere center.
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Sphere radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Exact smoothing-aware test.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        let reach = self.radius + h;
        (p - self.center).length_squared() <= reach * reach
    }

    /// Conservative box test.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        cell.distance_squared_to_point(self.center) <= self.radius * self.radius
    }

    /// Bounding box.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_center_half_extents(self.center, DVec3::splat(self.radius))
    }
}

/// Cylinder of `radius` whose axis runs along `normal`; `height` is the half-thickness.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Disk {
    center: DVec3,
    normal: DVec3,
    radius: f64,
    height: f64,
}

impl Disk {
    /// Create a disk. The normal is normalized here.
    pub fn new(center: DVec3, normal: DVec3, radius: f64, height: f64) -> Result<Self> {
        Ok(Self {
            center: finite(center)?,
            normal: unit_normal(normal)?,
            radius: non_negative(radius, SelectorError::InvalidRadius)?,
            height: non_negative(height, SelectorError::InvalidHeight)?,
        })
    }

    /// Disk center.
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Unit normal.
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Exact smoothing-aware test.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        let d = p - self.center;
        let along = d.dot(self.normal);
        let across = (d - self.normal * along).length();
        let over_height = (along.max(-along) - self.height).max(0.0);
        let over_radius = (across - self.radius).max(0.0);
        over_height * over_height + over_radius * over_radius <= h * h
    }

    /// Conservative box test: bounding box overlap plus the slab around the disk plane.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        if !self.bounds().overlaps(cell) {
            return false;
        }
        let offset = (cell.center() - self.center).dot(self.normal);
        let reach = self.height + projected_radius(cell.size() * 0.5, self.normal);
        offset * offset <= reach * reach
    }

    /// Bounding box (loose by up to `radius` on tilted axes).
    pub fn bounds(&self) -> Aabb3 {
        let half = self.normal.abs() * self.height + DVec3::splat(self.radius);
        Aabb3::from_center_half_extents(self.center, half)
    }
}

/// Finite line segment from `start` to `end`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    start: DVec3,
    end: DVec3,
}

impl Ray {
    /// Create a ray segment.
    pub fn new(start: DVec3, end: DVec3) -> Result<Self> {
        let start = finite(start)?;
        let end = finite(end)?;
        if start == end {
            return Err(SelectorError::DegenerateRay);
        }
        Ok(Self { start, end })
    }

    /// Segment start.
    pub fn start(&self) -> DVec3 {
        self.start
    }

    /// Segment end.
    pub fn end(&self) -> DVec3 {
        self.end
    }

    /// Exact smoothing-aware test: distance from `p` to the segment.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        let d = self.end - self.start;
        let t = ((p - self.start).dot(d) / d.length_squared()).clamp(0.0, 1.0);
        let closest = self.start + d * t;
        (p - closest).length_squared() <= h * h
    }

    /// Slab test of the segment against the box.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        let d = self.end - self.start;
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;
        for i in 0..3 {
            if d[i] == 0.0 {
                if self.start[i] < cell.min[i] || self.start[i] > cell.max[i] {
                    return false;
                }
                continue;
            }
            let t1 = (cell.min[i] - self.start[i]) / d[i];
            let t2 = (cell.max[i] - self.start[i]) / d[i];
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }

    /// Bounding box.
    pub fn bounds(&self) -> Aabb3 {
        Aabb3::new(self.start.min(self.end), self.start.max(self.end))
    }
}

/// Infinite plane through `point` with the given normal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CuttingPlane {
    normal: DVec3,
    point: DVec3,
}

impl CuttingPlane {
    /// Create a cutting plane. The normal is normalized here.
    pub fn new(normal: DVec3, point: DVec3) -> Result<Self> {
        Ok(Self {
            normal: unit_normal(normal)?,
            point: finite(point)?,
        })
    }

    /// Unit normal.
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// A point on the plane.
    pub fn point(&self) -> DVec3 {
        self.point
    }

    /// Exact smoothing-aware test: signed distance to the plane.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        let s = (p - self.point).dot(self.normal);
        s * s <= h * h
    }

    /// The plane passes through the box when the box straddles it.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        let s = (cell.center() - self.point).dot(self.normal);
        let r = projected_radius(cell.size() * 0.5, self.normal);
        s * s <= r * r
    }
}

/// Axis-aligned plane `p[axis] == coordinate`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Slice {
    axis: Axis,
    coordinate: f64,
}

impl Slice {
    /// Create a slice.
    pub fn new(axis: Axis, coordinate: f64) -> Result<Self> {
        if !coordinate.is_finite() {
            return Err(SelectorError::NonFinite);
        }
        Ok(Self { axis, coordinate })
    }

    /// Slice axis.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Slice coordinate along the axis.
    pub fn coordinate(&self) -> f64 {
        self.coordinate
    }

    /// Exact smoothing-aware test.
    #[inline]
    pub fn select_particle(&self, p: DVec3, h: f64) -> bool {
        let s = p[self.axis.index()] - self.coordinate;
        s * s <= h * h
    }

    /// Conservative box test.
    pub fn may_intersect(&self, cell: &Aabb3) -> bool {
        let i = self.axis.index();
        cell.min[i] <= self.coordinate && self.coordinate <= cell.max[i]
    }

    /// Bounding box: unbounded except along the slice axis.
    pub fn bounds(&self) -> Aabb3 {
        let mut b = Aabb3::EVERYWHERE;
        b.min[self.axis.index()] = self.coordinate;
        b.max[self.axis.index()] = self.coordinate;
        b
    }
}
