#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure footprint sampling that converts placeable shapes into grid cells.
//!
//! Shapes are authored for an `Up`-facing object in local space centered on
//! the object's pivot. The sampler walks the shape's world-space bounding
//! box on a sub-cell lattice, keeps the samples that fall inside the shape,
//! and reports the de-duplicated set of cells those samples land in. This
//! works for convex and concave outlines alike.
//!
//! Shapes must be thinner than one cell along the axis they snap on and must
//! not straddle a cell boundary there; otherwise the reported footprint
//! depends on sub-cell placement. This is an authoring rule and is not
//! checked at runtime.

use std::collections::BTreeSet;

use glam::Vec2;
use party_grid_core::{CellCoord, Facing, GridLayout};
use serde::{Deserialize, Serialize};

/// Number of samples taken along each cell edge by default.
pub const DEFAULT_SUBDIVISIONS: u32 = 4;

/// Largest number of samples taken along either axis of a bounding box.
/// Outlines needing more produce an empty footprint.
pub const MAX_SAMPLES_PER_AXIS: u32 = 4096;

/// Physical outline of a placeable authored in local space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outline {
    /// Axis-aligned rectangle centered on the pivot.
    Rect {
        /// Half of the rectangle's width and height.
        half_extents: Vec2,
    },
    /// Circle centered on the pivot.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
    /// Closed polygon; may be concave.
    Polygon {
        /// Vertices in order; the last connects back to the first.
        points: Vec<Vec2>,
    },
    /// Union of several outlines.
    Compound {
        /// Outlines whose union forms the shape.
        parts: Vec<Outline>,
    },
}

impl Outline {
    /// Reports whether the local-space point lies inside the outline.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match self {
            Self::Rect { half_extents } => {
                point.x.abs() <= half_extents.x && point.y.abs() <= half_extents.y
            }
            Self::Circle { radius } => point.length_squared() <= radius * radius,
            Self::Polygon { points } => polygon_contains(points, point),
            Self::Compound { parts } => parts.iter().any(|part| part.contains(point)),
        }
    }

    /// Local-space bounding box, or `None` for degenerate outlines.
    #[must_use]
    pub fn local_bounds(&self) -> Option<Bounds> {
        match self {
            Self::Rect { half_extents } => Some(Bounds::new(-*half_extents, *half_extents)),
            Self::Circle { radius } => Some(Bounds::new(Vec2::splat(-*radius), Vec2::splat(*radius))),
            Self::Polygon { points } => {
                if points.len() < 3 {
                    return None;
                }
                Bounds::enclosing(points.iter().copied())
            }
            Self::Compound { parts } => parts
                .iter()
                .filter_map(Self::local_bounds)
                .reduce(Bounds::union),
        }
    }
}

/// Axis-aligned bounding box in world or local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Corner with the smallest coordinates.
    pub min: Vec2,
    /// Corner with the largest coordinates.
    pub max: Vec2,
}

impl Bounds {
    /// Creates a box from its corners.
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point, or `None` when there are none.
    #[must_use]
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        }))
    }

    /// Smallest box enclosing both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

/// World transform applied to an outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeTransform {
    /// World-space position of the outline's pivot.
    pub translation: Vec2,
    /// Facing the outline is rotated into.
    pub facing: Facing,
    /// Mirrors the outline across its local vertical axis before rotating.
    pub mirrored: bool,
}

impl ShapeTransform {
    /// Creates an unmirrored transform.
    #[must_use]
    pub fn new(translation: Vec2, facing: Facing) -> Self {
        Self {
            translation,
            facing,
            mirrored: false,
        }
    }

    /// Maps a local-space point into world space.
    #[must_use]
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.translation + self.facing.orient(self.mirror(local))
    }

    /// Maps a world-space point into local space.
    #[must_use]
    pub fn to_local(&self, world: Vec2) -> Vec2 {
        self.mirror(self.facing.unorient(world - self.translation))
    }

    /// World-space box enclosing the transformed local box.
    #[must_use]
    pub fn world_bounds(&self, local: Bounds) -> Bounds {
        let corners = [
            local.min,
            Vec2::new(local.max.x, local.min.y),
            local.max,
            Vec2::new(local.min.x, local.max.y),
        ];
        Bounds::enclosing(corners.map(|corner| self.to_world(corner)))
            .unwrap_or(Bounds::new(self.translation, self.translation))
    }

    fn mirror(&self, point: Vec2) -> Vec2 {
        if self.mirrored {
            Vec2::new(-point.x, point.y)
        } else {
            point
        }
    }
}

/// Converts outlines and transforms into the set of grid cells they cover.
#[derive(Clone, Copy, Debug)]
pub struct FootprintSampler {
    layout: GridLayout,
    subdivisions: u32,
}

impl FootprintSampler {
    /// Creates a sampler taking [`DEFAULT_SUBDIVISIONS`] samples per cell edge.
    #[must_use]
    pub fn new(layout: GridLayout) -> Self {
        Self::with_subdivisions(layout, DEFAULT_SUBDIVISIONS)
    }

    /// Creates a sampler with a custom number of samples per cell edge.
    ///
    /// Zero is treated as one.
    #[must_use]
    pub fn with_subdivisions(layout: GridLayout, subdivisions: u32) -> Self {
        Self {
            layout,
            subdivisions: subdivisions.max(1),
        }
    }

    /// Layout used to convert sample positions into cells.
    #[must_use]
    pub const fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Distance between neighbouring samples in world units.
    #[must_use]
    pub fn step(&self) -> f32 {
        self.layout.cell_size() / self.subdivisions as f32
    }

    /// Computes the cells covered by `outline` under `transform`.
    ///
    /// Samples sit at half-step offsets from the bounding box corner so
    /// they never land exactly on an aligned cell edge.
    #[must_use]
    pub fn sample(&self, outline: &Outline, transform: &ShapeTransform) -> BTreeSet<CellCoord> {
        let mut cells = BTreeSet::new();
        let Some(local) = outline.local_bounds() else {
            return cells;
        };

        let bounds = transform.world_bounds(local);
        let step = self.step();
        let size = bounds.size();
        let (Some(columns), Some(rows)) = (sample_count(size.x, step), sample_count(size.y, step))
        else {
            log::warn!("outline bounds {size} exceed the sampling limit");
            return cells;
        };

        for row in 0..rows {
            let y = bounds.min.y + step * (row as f32 + 0.5);
            for column in 0..columns {
                let point = Vec2::new(bounds.min.x + step * (column as f32 + 0.5), y);
                if outline.contains(transform.to_local(point)) {
                    let _ = cells.insert(self.layout.world_to_cell(point));
                }
            }
        }

        cells
    }
}

fn sample_count(extent: f32, step: f32) -> Option<u32> {
    if extent.is_nan() || extent <= 0.0 {
        return Some(1);
    }
    let count = (extent / step).ceil();
    if !count.is_finite() || count > MAX_SAMPLES_PER_AXIS as f32 {
        return None;
    }
    Some((count as u32).max(1))
}

fn polygon_contains(points: &[Vec2], point: Vec2) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut previous = points[points.len() - 1];
    for &current in points {
        let crosses = (current.y > point.y) != (previous.y > point.y);
        if crosses {
            let t = (point.y - current.y) / (previous.y - current.y);
            let x = current.x + t * (previous.x - current.x);
            if point.x < x {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_contains_handles_concave_notch() {
        let l_shape = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!(polygon_contains(&l_shape, Vec2::new(0.5, 1.5)));
        assert!(polygon_contains(&l_shape, Vec2::new(1.5, 0.5)));
        assert!(!polygon_contains(&l_shape, Vec2::new(1.5, 1.5)));
        assert!(!polygon_contains(&l_shape[..2], Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn sample_count_never_drops_to_zero() {
        assert_eq!(sample_count(0.0, 0.25), Some(1));
        assert_eq!(sample_count(f32::NAN, 0.25), Some(1));
        assert_eq!(sample_count(1.0, 0.25), Some(4));
    }

    #[test]
    fn sample_count_refuses_huge_extents() {
        assert_eq!(sample_count(1024.0, 0.25), Some(MAX_SAMPLES_PER_AXIS));
        assert_eq!(sample_count(1025.0, 0.25), None);
        assert_eq!(sample_count(f32::INFINITY, 0.25), None);
    }

    #[test]
    fn transform_round_trips_points() {
        let transform = ShapeTransform {
            translation: Vec2::new(3.0, -1.0),
            facing: Facing::Left,
            mirrored: true,
        };
        let local = Vec2::new(0.75, 0.25);
        assert_eq!(transform.to_local(transform.to_world(local)), local);
    }
}
