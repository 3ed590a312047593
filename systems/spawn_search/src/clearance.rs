//! Geometric clearance predicates evaluated against the platform mask.

use party_grid_core::CellCoord;
use party_grid_world::PlatformMask;
use serde::{Deserialize, Serialize};

/// Largest distance in cells any clearance check reaches from its cell.
/// Larger configured radii, heights and lengths are clamped to it.
pub const MAX_CLEARANCE_REACH: u32 = 64;

/// Parameters of the circular clearance zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    /// Radius in cells; every cell with `dx² + dy² <= radius²` must be clear.
    pub radius: u32,
}

impl Default for CircleParams {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

/// Parameters of the three triangular probes cast from a candidate cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleParams {
    /// Rows covered by the downward triangle.
    pub down_height: u32,
    /// Width of the downward triangle's last row. Even widths are rounded
    /// down to the next odd width so rows stay centered on the cell.
    pub down_base_width: u32,
    /// Columns covered by each side triangle.
    pub side_length: u32,
    /// Height of each side triangle's last column, rounded down to an odd
    /// height like `down_base_width`.
    pub side_base_width: u32,
    /// Consecutive solid cells along the direct side line that count as a
    /// wall. Zero disables the streak rule.
    pub wall_streak: u32,
}

impl Default for TriangleParams {
    fn default() -> Self {
        Self {
            down_height: 3,
            down_base_width: 3,
            side_length: 3,
            side_base_width: 3,
            wall_streak: 3,
        }
    }
}

/// Reports whether the circular zone around `cell` holds no solid cell.
#[must_use]
pub fn circle_is_clear(mask: &PlatformMask, cell: CellCoord, params: &CircleParams) -> bool {
    let clamped = clamp_reach(params.radius);
    let radius = i64::from(clamped);
    let reach = as_offset(clamped);
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let (ldx, ldy) = (i64::from(dx), i64::from(dy));
            if ldx * ldx + ldy * ldy > radius * radius {
                continue;
            }
            if mask.is_solid(cell.offset(dx, dy)) {
                return false;
            }
        }
    }
    true
}

/// Reports whether `cell` has a reference surface below or beside it.
///
/// The downward triangle passes when any of its cells is solid. A side
/// triangle passes when its last column is fully solid or when a wall streak
/// runs along the row through `cell`. One passing triangle is enough.
#[must_use]
pub fn triangle_has_reference(mask: &PlatformMask, cell: CellCoord, params: &TriangleParams) -> bool {
    down_reaches_floor(mask, cell, params)
        || side_touches_wall(mask, cell, params, -1)
        || side_touches_wall(mask, cell, params, 1)
}

fn down_reaches_floor(mask: &PlatformMask, cell: CellCoord, params: &TriangleParams) -> bool {
    let height = clamp_reach(params.down_height);
    (1..=height).any(|depth| {
        let half = half_width(depth, params.down_base_width, height);
        (-half..=half).any(|dx| mask.is_solid(cell.offset(dx, -as_offset(depth))))
    })
}

fn side_touches_wall(mask: &PlatformMask, cell: CellCoord, params: &TriangleParams, sign: i32) -> bool {
    let length = clamp_reach(params.side_length);
    if length == 0 {
        return false;
    }

    let far = as_offset(length).saturating_mul(sign);
    let half = half_width(length, params.side_base_width, length);
    let last_column_solid = (-half..=half).all(|dy| mask.is_solid(cell.offset(far, dy)));
    if last_column_solid {
        return true;
    }

    if params.wall_streak == 0 {
        return false;
    }
    let mut streak = 0;
    for step in 1..=length {
        if mask.is_solid(cell.offset(as_offset(step).saturating_mul(sign), 0)) {
            streak += 1;
            if streak >= params.wall_streak {
                return true;
            }
        } else {
            streak = 0;
        }
    }
    false
}

/// Half width of a triangle row growing linearly from the apex to
/// `base_width` at `height`. A row never spans more than `base_width` cells.
fn half_width(depth: u32, base_width: u32, height: u32) -> i32 {
    if height == 0 {
        return 0;
    }
    let widest = u64::from(base_width.saturating_sub(1) / 2).min(u64::from(MAX_CLEARANCE_REACH));
    let half = (u64::from(depth) * u64::from(base_width) / (2 * u64::from(height))).min(widest);
    i32::try_from(half).unwrap_or(i32::MAX)
}

fn clamp_reach(value: u32) -> u32 {
    value.min(MAX_CLEARANCE_REACH)
}

fn as_offset(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_rows_widen_toward_the_base() {
        assert_eq!(half_width(1, 3, 3), 0);
        assert_eq!(half_width(2, 3, 3), 1);
        assert_eq!(half_width(3, 3, 3), 1);
        assert_eq!(half_width(4, 5, 4), 2);
        assert_eq!(half_width(2, 5, 0), 0);
    }

    #[test]
    fn even_base_width_never_widens_the_last_row() {
        assert_eq!(half_width(4, 4, 4), 1);
        assert_eq!(half_width(4, 0, 4), 0);

        let params = TriangleParams {
            down_height: 4,
            down_base_width: 4,
            side_length: 0,
            wall_streak: 0,
            ..TriangleParams::default()
        };
        let outside = PlatformMask::from_cells([CellCoord::new(7, 1)]);
        assert!(!triangle_has_reference(&outside, CellCoord::new(5, 5), &params));
        let inside = PlatformMask::from_cells([CellCoord::new(6, 1)]);
        assert!(triangle_has_reference(&inside, CellCoord::new(5, 5), &params));
    }

    #[test]
    fn oversized_parameters_are_clamped() {
        let far = i32::try_from(MAX_CLEARANCE_REACH).expect("small reach") + 1;
        let mask = PlatformMask::from_cells([CellCoord::new(far, 0), CellCoord::new(0, -far)]);
        let circle = CircleParams { radius: u32::MAX };
        assert!(circle_is_clear(&mask, CellCoord::new(0, 0), &circle));
        assert!(!circle_is_clear(&mask, CellCoord::new(2, 0), &circle));

        let triangle = TriangleParams {
            down_height: u32::MAX,
            down_base_width: u32::MAX,
            side_length: u32::MAX,
            side_base_width: u32::MAX,
            wall_streak: u32::MAX,
        };
        assert!(!triangle_has_reference(&mask, CellCoord::new(0, 0), &triangle));
        assert!(triangle_has_reference(&mask, CellCoord::new(0, -1), &triangle));
    }

    #[test]
    fn circle_respects_euclidean_radius() {
        let mask = PlatformMask::from_cells([CellCoord::new(2, 2)]);
        let params = CircleParams { radius: 2 };
        assert!(circle_is_clear(&mask, CellCoord::new(0, 0), &params));
        assert!(!circle_is_clear(&mask, CellCoord::new(0, 2), &params));
        assert!(circle_is_clear(&mask, CellCoord::new(2, 5), &params));
    }

    #[test]
    fn zero_radius_checks_only_the_center() {
        let mask = PlatformMask::from_cells([CellCoord::new(1, 0)]);
        let params = CircleParams { radius: 0 };
        assert!(circle_is_clear(&mask, CellCoord::new(0, 0), &params));
        assert!(!circle_is_clear(&mask, CellCoord::new(1, 0), &params));
    }

    #[test]
    fn down_triangle_needs_a_single_solid_cell() {
        let params = TriangleParams::default();
        let mask = PlatformMask::from_cells([CellCoord::new(6, 2)]);
        assert!(triangle_has_reference(&mask, CellCoord::new(5, 5), &params));
        assert!(!triangle_has_reference(&mask, CellCoord::new(5, 6), &params));
        assert!(!triangle_has_reference(&mask, CellCoord::new(8, 5), &params));
    }

    #[test]
    fn side_triangle_accepts_full_last_column() {
        let params = TriangleParams::default();
        let column = PlatformMask::from_cells([
            CellCoord::new(2, 4),
            CellCoord::new(2, 5),
            CellCoord::new(2, 6),
        ]);
        assert!(triangle_has_reference(&column, CellCoord::new(5, 5), &params));

        let broken = PlatformMask::from_cells([CellCoord::new(2, 4), CellCoord::new(2, 6)]);
        assert!(!triangle_has_reference(&broken, CellCoord::new(5, 5), &params));
    }

    #[test]
    fn side_triangle_accepts_wall_streak() {
        let params = TriangleParams::default();
        let streak = PlatformMask::from_cells([
            CellCoord::new(6, 5),
            CellCoord::new(7, 5),
            CellCoord::new(8, 5),
        ]);
        assert!(triangle_has_reference(&streak, CellCoord::new(5, 5), &params));

        let short = PlatformMask::from_cells([CellCoord::new(6, 5), CellCoord::new(7, 5)]);
        assert!(!triangle_has_reference(&short, CellCoord::new(5, 5), &params));

        let disabled = TriangleParams {
            wall_streak: 0,
            ..params
        };
        assert!(!triangle_has_reference(&short, CellCoord::new(5, 5), &disabled));
    }
}
