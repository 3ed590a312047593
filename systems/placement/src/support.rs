//! Directional support probes used by objects that must attach to a surface.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;
use party_grid_core::{CellCoord, Facing, GridLayout, SurfaceId};

const MAX_PROBE_STEPS: u32 = 4_096;

/// Capability that casts a short directional probe and reports the surface
/// it hits first.
///
/// The engine depends only on this narrow query, never on a physics world.
pub trait SupportProbe {
    /// Casts from `origin` toward `direction` for at most `max_distance`
    /// world units.
    fn probe(&self, origin: Vec2, direction: Facing, max_distance: f32) -> Option<SurfaceId>;
}

impl<F> SupportProbe for F
where
    F: Fn(Vec2, Facing, f32) -> Option<SurfaceId>,
{
    fn probe(&self, origin: Vec2, direction: Facing, max_distance: f32) -> Option<SurfaceId> {
        self(origin, direction, max_distance)
    }
}

/// Grid-backed probe that marches cells of a labelled surface map.
#[derive(Clone, Debug, Default)]
pub struct SurfaceGrid {
    layout: GridLayout,
    surfaces: BTreeMap<CellCoord, SurfaceId>,
}

impl SurfaceGrid {
    /// Builds a probe from explicitly labelled cells.
    #[must_use]
    pub fn from_labels<I>(layout: GridLayout, labels: I) -> Self
    where
        I: IntoIterator<Item = (CellCoord, SurfaceId)>,
    {
        Self {
            layout,
            surfaces: labels.into_iter().collect(),
        }
    }

    /// Builds a probe treating every 4-connected group of solid cells as one
    /// surface.
    ///
    /// Surfaces are numbered from zero in ascending order of their smallest
    /// cell.
    #[must_use]
    pub fn from_connected<I>(layout: GridLayout, solid: I) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let solid: BTreeSet<CellCoord> = solid.into_iter().collect();
        let mut surfaces = BTreeMap::new();
        let mut queue = VecDeque::new();
        let mut next_id = 0;

        for &seed in &solid {
            if surfaces.contains_key(&seed) {
                continue;
            }

            let id = SurfaceId::new(next_id);
            next_id += 1;
            let _ = surfaces.insert(seed, id);
            queue.push_back(seed);

            while let Some(cell) = queue.pop_front() {
                for neighbor in neighbors(cell) {
                    if !solid.contains(&neighbor) || surfaces.contains_key(&neighbor) {
                        continue;
                    }
                    let _ = surfaces.insert(neighbor, id);
                    queue.push_back(neighbor);
                }
            }
        }

        Self { layout, surfaces }
    }

    /// Surface covering the cell, if any.
    #[must_use]
    pub fn surface_at(&self, cell: CellCoord) -> Option<SurfaceId> {
        self.surfaces.get(&cell).copied()
    }

    /// Number of distinct surfaces.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.values().collect::<BTreeSet<_>>().len()
    }
}

impl SupportProbe for SurfaceGrid {
    fn probe(&self, origin: Vec2, direction: Facing, max_distance: f32) -> Option<SurfaceId> {
        if !(max_distance >= 0.0) {
            return None;
        }

        let start = self.layout.world_to_cell(origin);
        let mut cell = start;
        for _ in 0..MAX_PROBE_STEPS {
            cell = cell.step(direction);
            if self.entry_distance(origin, cell, direction) > max_distance {
                return None;
            }
            if let Some(surface) = self.surface_at(cell) {
                return Some(surface);
            }
        }
        None
    }
}

impl SurfaceGrid {
    fn entry_distance(&self, origin: Vec2, cell: CellCoord, direction: Facing) -> f32 {
        let min = self.layout.cell_min(cell);
        let size = self.layout.cell_size();
        match direction {
            Facing::Up => min.y - origin.y,
            Facing::Down => origin.y - (min.y + size),
            Facing::Right => min.x - origin.x,
            Facing::Left => origin.x - (min.x + size),
        }
    }
}

fn neighbors(cell: CellCoord) -> [CellCoord; 4] {
    [
        cell.step(Facing::Up),
        cell.step(Facing::Right),
        cell.step(Facing::Down),
        cell.step(Facing::Left),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_and_wall() -> SurfaceGrid {
        let floor = (0..4).map(|x| CellCoord::new(x, 0));
        let wall = (2..5).map(|y| CellCoord::new(6, y));
        SurfaceGrid::from_connected(GridLayout::default(), floor.chain(wall))
    }

    #[test]
    fn connected_cells_share_a_surface() {
        let grid = floor_and_wall();
        assert_eq!(grid.surface_count(), 2);
        assert_eq!(grid.surface_at(CellCoord::new(0, 0)), Some(SurfaceId::new(0)));
        assert_eq!(grid.surface_at(CellCoord::new(3, 0)), Some(SurfaceId::new(0)));
        assert_eq!(grid.surface_at(CellCoord::new(6, 4)), Some(SurfaceId::new(1)));
        assert_eq!(grid.surface_at(CellCoord::new(5, 4)), None);
    }

    #[test]
    fn probe_hits_adjacent_surface_within_range() {
        let grid = floor_and_wall();
        let above_floor = GridLayout::default().cell_center(CellCoord::new(1, 1));
        assert_eq!(grid.probe(above_floor, Facing::Down, 1.0), Some(SurfaceId::new(0)));

        let two_above = GridLayout::default().cell_center(CellCoord::new(1, 2));
        assert_eq!(grid.probe(two_above, Facing::Down, 1.0), None);
        assert_eq!(grid.probe(two_above, Facing::Down, 1.5), Some(SurfaceId::new(0)));

        let beside_wall = GridLayout::default().cell_center(CellCoord::new(5, 3));
        assert_eq!(grid.probe(beside_wall, Facing::Right, 1.0), Some(SurfaceId::new(1)));
        assert_eq!(grid.probe(beside_wall, Facing::Left, 1.0), None);
    }

    #[test]
    fn closures_act_as_probes() {
        let probe = |_: Vec2, direction: Facing, _: f32| {
            (direction == Facing::Down).then_some(SurfaceId::new(9))
        };
        assert_eq!(probe.probe(Vec2::ZERO, Facing::Down, 1.0), Some(SurfaceId::new(9)));
        assert_eq!(probe.probe(Vec2::ZERO, Facing::Up, 1.0), None);
    }
}
