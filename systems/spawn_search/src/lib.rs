#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural search for well-spaced spawn cells inside a level region.
//!
//! Candidates are validated against the static platform mask only, never
//! against the occupancy grid. A search always produces exactly the
//! requested number of points: when the region cannot satisfy the spacing
//! or clearance rules the search walks down a fallback ladder that ends at
//! a fixed sentinel cell.

mod clearance;

use party_grid_core::{CellCoord, CellRect, SpawnCategory, SpawnPoint, SpawnResolution};
use party_grid_world::PlatformMask;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub use clearance::{
    circle_is_clear, triangle_has_reference, CircleParams, TriangleParams, MAX_CLEARANCE_REACH,
};

/// Upper bound on `attempts_per_spawn`; larger configured values are clamped.
pub const MAX_ATTEMPTS_PER_SPAWN: u32 = 4096;

/// Tuning knobs of the spawn search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSearchConfig {
    /// Random draws per point in each of the spaced and relaxed passes.
    /// The fallback pass uses twice as many.
    pub attempts_per_spawn: u32,
    /// Minimum distance in cells between points of one batch.
    pub min_spacing: f32,
    /// Circular clearance parameters.
    pub circle: CircleParams,
    /// Triangular clearance parameters.
    pub triangle: TriangleParams,
    /// Cell returned when every other rung of the ladder fails.
    pub sentinel: CellCoord,
    /// Seed of the search's random stream.
    pub seed: u64,
}

impl Default for SpawnSearchConfig {
    fn default() -> Self {
        Self {
            attempts_per_spawn: 64,
            min_spacing: 3.0,
            circle: CircleParams::default(),
            triangle: TriangleParams::default(),
            sentinel: CellCoord::new(0, 0),
            seed: 0,
        }
    }
}

/// Batch of spawn points requested from a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Region candidates are drawn from.
    pub region: CellRect,
    /// Number of triangle-validated points.
    pub triangle_count: usize,
    /// Number of circle-validated points.
    pub circle_count: usize,
}

impl SpawnRequest {
    /// Creates a request for the provided counts.
    #[must_use]
    pub const fn new(region: CellRect, triangle_count: usize, circle_count: usize) -> Self {
        Self {
            region,
            triangle_count,
            circle_count,
        }
    }

    /// Total number of points the request asks for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.triangle_count + self.circle_count
    }
}

/// Ordered result of a spawn search.
///
/// Triangle points precede circle points; each group keeps the order in
/// which it was discovered. The list index is the draw order used for timed
/// sequential spawning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPlan {
    points: Vec<SpawnPoint>,
}

impl SpawnPlan {
    /// Creates a plan from already ordered points.
    #[must_use]
    pub fn from_points(points: Vec<SpawnPoint>) -> Self {
        Self { points }
    }

    /// Points in draw order.
    #[must_use]
    pub fn points(&self) -> &[SpawnPoint] {
        &self.points
    }

    /// Consumes the plan and returns its points in draw order.
    #[must_use]
    pub fn into_points(self) -> Vec<SpawnPoint> {
        self.points
    }

    /// Number of points in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the plan holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cells of the plan in draw order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.points.iter().map(|point| point.cell)
    }

    /// Number of points resolved with the given rung of the ladder.
    #[must_use]
    pub fn count_resolved(&self, resolution: SpawnResolution) -> usize {
        self.points
            .iter()
            .filter(|point| point.resolution == resolution)
            .count()
    }

    /// Number of points found only after spacing was relaxed.
    #[must_use]
    pub fn relaxed_count(&self) -> usize {
        self.count_resolved(SpawnResolution::Relaxed)
    }

    /// Number of points taken from the unconstrained fallback pass.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.count_resolved(SpawnResolution::Fallback)
    }

    /// Number of points that fell back to the sentinel cell.
    #[must_use]
    pub fn sentinel_count(&self) -> usize {
        self.count_resolved(SpawnResolution::Sentinel)
    }

    /// Number of point pairs closer to each other than `min_spacing`.
    #[must_use]
    pub fn spacing_violations(&self, min_spacing: f32) -> usize {
        let mut violations = 0;
        for (index, first) in self.points.iter().enumerate() {
            for second in &self.points[index + 1..] {
                if too_close(first.cell, second.cell, min_spacing) {
                    violations += 1;
                }
            }
        }
        violations
    }
}

/// Seeded spawn search over a platform mask.
#[derive(Clone, Debug)]
pub struct SpawnSearch {
    config: SpawnSearchConfig,
    rng: ChaCha8Rng,
}

impl SpawnSearch {
    /// Creates a search whose random stream starts at `config.seed`.
    ///
    /// `attempts_per_spawn` is clamped to [`MAX_ATTEMPTS_PER_SPAWN`].
    #[must_use]
    pub fn new(mut config: SpawnSearchConfig) -> Self {
        if config.attempts_per_spawn > MAX_ATTEMPTS_PER_SPAWN {
            log::warn!(
                "clamping attempts_per_spawn from {} to {MAX_ATTEMPTS_PER_SPAWN}",
                config.attempts_per_spawn
            );
            config.attempts_per_spawn = MAX_ATTEMPTS_PER_SPAWN;
        }
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Configuration the search runs with.
    #[must_use]
    pub const fn config(&self) -> &SpawnSearchConfig {
        &self.config
    }

    /// Restarts the random stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Finds exactly `request.total()` spawn points.
    ///
    /// Circle points are searched first and triangle points second; the
    /// returned plan lists triangle points first. Never fails: points that
    /// cannot be placed legally resolve through the relaxed, fallback and
    /// sentinel rungs in that order.
    pub fn find_spawn_positions(&mut self, mask: &PlatformMask, request: &SpawnRequest) -> SpawnPlan {
        let mut points: Vec<SpawnPoint> = Vec::with_capacity(request.total());

        let batches = [
            (SpawnCategory::CircleClearance, request.circle_count),
            (SpawnCategory::TriangleClearance, request.triangle_count),
        ];
        for (category, count) in batches {
            for _ in 0..count {
                let point = self.find_point(mask, request.region, category, &points);
                points.push(point);
            }
        }

        points.sort_by_key(|point| draw_rank(point.category));

        let plan = SpawnPlan::from_points(points);
        log::debug!(
            "spawn search placed {} points ({} relaxed, {} fallback, {} sentinel)",
            plan.len(),
            plan.relaxed_count(),
            plan.fallback_count(),
            plan.sentinel_count()
        );
        plan
    }

    fn find_point(
        &mut self,
        mask: &PlatformMask,
        region: CellRect,
        category: SpawnCategory,
        chosen: &[SpawnPoint],
    ) -> SpawnPoint {
        let passes = [
            (SpawnResolution::Spaced, true),
            (SpawnResolution::Relaxed, false),
        ];
        for (resolution, enforce_spacing) in passes {
            if let Some(cell) = self.draw_legal(mask, region, category, chosen, enforce_spacing) {
                return SpawnPoint {
                    cell,
                    category,
                    resolution,
                };
            }
            log::debug!("{category:?} pass {resolution:?} found no candidate");
        }

        if let Some(cell) = self.draw_open(mask, region, chosen) {
            log::warn!("{category:?} point fell back to unvalidated cell {cell:?}");
            return SpawnPoint {
                cell,
                category,
                resolution: SpawnResolution::Fallback,
            };
        }

        log::warn!(
            "{category:?} point fell back to sentinel cell {:?}",
            self.config.sentinel
        );
        SpawnPoint {
            cell: self.config.sentinel,
            category,
            resolution: SpawnResolution::Sentinel,
        }
    }

    fn draw_legal(
        &mut self,
        mask: &PlatformMask,
        region: CellRect,
        category: SpawnCategory,
        chosen: &[SpawnPoint],
        enforce_spacing: bool,
    ) -> Option<CellCoord> {
        for _ in 0..self.config.attempts_per_spawn {
            let cell = self.draw_cell(region)?;
            if mask.is_solid(cell) || is_chosen(cell, chosen) {
                continue;
            }
            if enforce_spacing
                && chosen
                    .iter()
                    .any(|point| too_close(point.cell, cell, self.config.min_spacing))
            {
                continue;
            }
            if self.passes(mask, cell, category) {
                return Some(cell);
            }
        }
        None
    }

    fn draw_open(
        &mut self,
        mask: &PlatformMask,
        region: CellRect,
        chosen: &[SpawnPoint],
    ) -> Option<CellCoord> {
        let attempts = self.config.attempts_per_spawn.saturating_mul(2);
        for _ in 0..attempts {
            let cell = self.draw_cell(region)?;
            if !mask.is_solid(cell) && !is_chosen(cell, chosen) {
                return Some(cell);
            }
        }
        None
    }

    fn passes(&self, mask: &PlatformMask, cell: CellCoord, category: SpawnCategory) -> bool {
        match category {
            SpawnCategory::CircleClearance => circle_is_clear(mask, cell, &self.config.circle),
            SpawnCategory::TriangleClearance => {
                triangle_has_reference(mask, cell, &self.config.triangle)
            }
        }
    }

    /// Uniform cell inside the region, or `None` for an empty region.
    fn draw_cell(&mut self, region: CellRect) -> Option<CellCoord> {
        if region.is_empty() {
            return None;
        }
        let size = region.size();
        let dx = self.rng.gen_range(0..size.width());
        let dy = self.rng.gen_range(0..size.height());
        let dx = i32::try_from(dx).unwrap_or(i32::MAX);
        let dy = i32::try_from(dy).unwrap_or(i32::MAX);
        Some(region.origin().offset(dx, dy))
    }
}

fn draw_rank(category: SpawnCategory) -> u8 {
    match category {
        SpawnCategory::TriangleClearance => 0,
        SpawnCategory::CircleClearance => 1,
    }
}

fn is_chosen(cell: CellCoord, chosen: &[SpawnPoint]) -> bool {
    chosen.iter().any(|point| point.cell == cell)
}

fn too_close(first: CellCoord, second: CellCoord, min_spacing: f32) -> bool {
    let spacing = f64::from(min_spacing.max(0.0));
    (first.distance_squared(second) as f64) < spacing * spacing
}

#[cfg(test)]
mod tests {
    use super::*;
    use party_grid_core::CellRectSize;

    fn point(x: i32, category: SpawnCategory) -> SpawnPoint {
        SpawnPoint {
            cell: CellCoord::new(x, 0),
            category,
            resolution: SpawnResolution::Spaced,
        }
    }

    #[test]
    fn spacing_is_strictly_less_than() {
        assert!(too_close(CellCoord::new(0, 0), CellCoord::new(2, 2), 3.0));
        assert!(!too_close(CellCoord::new(0, 0), CellCoord::new(3, 0), 3.0));
        assert!(!too_close(CellCoord::new(0, 0), CellCoord::new(0, 0), 0.0));
    }

    #[test]
    fn violations_count_each_close_pair_once() {
        let plan = SpawnPlan::from_points(vec![
            point(0, SpawnCategory::CircleClearance),
            point(1, SpawnCategory::CircleClearance),
            point(2, SpawnCategory::CircleClearance),
            point(10, SpawnCategory::CircleClearance),
        ]);
        assert_eq!(plan.spacing_violations(3.0), 3);
        assert_eq!(plan.spacing_violations(1.0), 0);
    }

    #[test]
    fn draw_order_is_stable_within_categories() {
        let mut points = vec![
            point(0, SpawnCategory::CircleClearance),
            point(1, SpawnCategory::CircleClearance),
            point(2, SpawnCategory::TriangleClearance),
            point(3, SpawnCategory::TriangleClearance),
        ];
        points.sort_by_key(|point| draw_rank(point.category));
        let xs: Vec<i32> = points.iter().map(|point| point.cell.x()).collect();
        assert_eq!(xs, vec![2, 3, 0, 1]);
    }

    #[test]
    fn empty_region_never_draws() {
        let mut search = SpawnSearch::new(SpawnSearchConfig::default());
        let region = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(0, 4));
        assert_eq!(search.draw_cell(region), None);
    }

    #[test]
    fn oversized_attempt_budget_is_clamped() {
        let search = SpawnSearch::new(SpawnSearchConfig {
            attempts_per_spawn: u32::MAX,
            ..SpawnSearchConfig::default()
        });
        assert_eq!(search.config().attempts_per_spawn, MAX_ATTEMPTS_PER_SPAWN);
    }
}
