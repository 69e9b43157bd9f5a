//! World geometry.
//!
//! Block positions come from the persisted configuration, live positions
//! come from the host. Both meet in the axis-aligned containment test used
//! for wait-area detection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A live position reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance to `other` ignoring the vertical axis.
    pub fn planar_distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// An integer block position as stored in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Truncate a live position to the block it stands in.
    pub fn from_location(location: Vec3) -> Self {
        Self {
            x: location.x as i32,
            y: location.y as i32,
            z: location.z as i32,
        }
    }

    /// Where a player lands when teleported on top of this block.
    pub fn standing_point(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) - 0.5,
            f64::from(self.y) + 1.0,
            f64::from(self.z) + 0.5,
        )
    }
}

impl From<BlockPos> for Vec3 {
    fn from(pos: BlockPos) -> Self {
        Vec3::new(f64::from(pos.x), f64::from(pos.y), f64::from(pos.z))
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// True iff every axis of `point` lies within the inclusive range spanned
/// by the two corners. Corner order does not matter.
pub fn contains(point: Vec3, corner1: Vec3, corner2: Vec3) -> bool {
    let within = |v: f64, a: f64, b: f64| a.min(b) <= v && v <= a.max(b);
    within(point.x, corner1.x, corner2.x)
        && within(point.y, corner1.y, corner2.y)
        && within(point.z, corner1.z, corner2.z)
}

/// Axis-aligned box defined by two block corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub pos1: BlockPos,
    pub pos2: BlockPos,
}

impl Region {
    pub fn new(pos1: BlockPos, pos2: BlockPos) -> Self {
        Self { pos1, pos2 }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        contains(point, self.pos1.into(), self.pos2.into())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.pos1, self.pos2)
    }
}
