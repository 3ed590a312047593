//! Authoritative occupancy state for committed placeables.

use std::collections::{BTreeMap, BTreeSet};

use party_grid_core::{CellCoord, CellRect, CellState, GridError, PlaceableId};
use serde::{Deserialize, Serialize};

/// Dense occupancy grid covering a fixed rectangle of cells.
///
/// Each cell records the placeable that claimed it. Claims are monotonic:
/// nothing but [`CellGrid::reset`] returns an occupied cell to empty. Preview
/// highlights live in a separate overlay, one layer per previewing
/// placeable, so they can never influence legality or each other.
#[derive(Clone, Debug)]
pub struct CellGrid {
    bounds: CellRect,
    cells: Vec<Option<PlaceableId>>,
    highlights: BTreeMap<PlaceableId, BTreeSet<CellCoord>>,
}

impl CellGrid {
    /// Creates an empty grid covering `bounds`.
    #[must_use]
    pub fn new(bounds: CellRect) -> Self {
        let capacity = usize::try_from(bounds.area()).unwrap_or(0);
        Self {
            bounds,
            cells: vec![None; capacity],
            highlights: BTreeMap::new(),
        }
    }

    /// Rectangle of cells tracked by the grid.
    #[must_use]
    pub const fn bounds(&self) -> CellRect {
        self.bounds
    }

    /// Current state of the cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> Option<CellState> {
        let index = self.bounds.index_of(cell)?;
        let state = match self.cells.get(index)? {
            Some(_) => CellState::Occupied,
            None if self.is_highlighted(cell) => CellState::Highlighted,
            None => CellState::Empty,
        };
        Some(state)
    }

    /// Placeable occupying the cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<PlaceableId> {
        self.bounds
            .index_of(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Reports whether the cell lies inside the grid and is not occupied.
    #[must_use]
    pub fn can_take(&self, cell: CellCoord) -> bool {
        self.bounds
            .index_of(cell)
            .and_then(|index| self.cells.get(index))
            .map_or(false, Option::is_none)
    }

    /// Claims a single cell for `owner`.
    ///
    /// Taking a cell the same owner already holds is a no-op.
    pub fn take(&mut self, cell: CellCoord, owner: PlaceableId) -> Result<(), GridError> {
        let index = self.checked_index(cell, owner)?;
        self.cells[index] = Some(owner);
        Ok(())
    }

    /// Claims every cell for `owner`, or none of them.
    ///
    /// All cells are validated before the first write, so an error leaves
    /// the grid untouched.
    pub fn take_all(&mut self, cells: &[CellCoord], owner: PlaceableId) -> Result<(), GridError> {
        let mut indices = Vec::with_capacity(cells.len());
        for &cell in cells {
            indices.push(self.checked_index(cell, owner)?);
        }
        for index in indices {
            self.cells[index] = Some(owner);
        }
        Ok(())
    }

    /// Returns the provided cells to empty. Only grid resets use this.
    pub fn release<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        for cell in cells {
            if let Some(slot) = self
                .bounds
                .index_of(cell)
                .and_then(|index| self.cells.get_mut(index))
            {
                *slot = None;
            }
        }
    }

    /// Replaces the owner's preview overlay with the provided cells.
    ///
    /// Cells outside the grid are ignored. Other owners' previews are left
    /// as they are.
    pub fn highlight<I>(&mut self, owner: PlaceableId, cells: I)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let bounds = self.bounds;
        let cells: BTreeSet<CellCoord> = cells
            .into_iter()
            .filter(|cell| bounds.contains(*cell))
            .collect();
        if cells.is_empty() {
            let _ = self.highlights.remove(&owner);
        } else {
            let _ = self.highlights.insert(owner, cells);
        }
    }

    /// Removes the owner's preview overlay.
    pub fn clear_highlights(&mut self, owner: PlaceableId) {
        let _ = self.highlights.remove(&owner);
    }

    /// Removes every preview overlay.
    pub fn clear_all_highlights(&mut self) {
        self.highlights.clear();
    }

    /// Cells previewed by `owner`, in coordinate order.
    #[must_use]
    pub fn highlights_of(&self, owner: PlaceableId) -> Vec<CellCoord> {
        self.highlights
            .get(&owner)
            .map(|cells| cells.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Cells currently occupied, in row-major order.
    #[must_use]
    pub fn occupied_cells(&self) -> Vec<CellCoord> {
        self.bounds
            .cells()
            .zip(self.cells.iter())
            .filter_map(|(cell, slot)| slot.map(|_| cell))
            .collect()
    }

    /// Cells covered by any preview overlay, in row-major order.
    #[must_use]
    pub fn highlighted_cells(&self) -> Vec<CellCoord> {
        self.bounds
            .cells()
            .filter(|cell| self.is_highlighted(*cell))
            .collect()
    }

    /// Captures the current occupancy as an immutable baseline.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            bounds: self.bounds,
            cells: self.cells.clone(),
        }
    }

    /// Restores the grid to the provided baseline.
    ///
    /// Cells whose occupant differs from the baseline are released, then the
    /// baseline occupants are written back into empty cells. Every preview
    /// overlay is cleared. Returns the number of released cells.
    pub fn reset(&mut self, snapshot: &GridSnapshot) -> usize {
        self.clear_all_highlights();
        if self.bounds != snapshot.bounds || self.cells.len() != snapshot.cells.len() {
            log::warn!("grid bounds changed since the baseline was captured");
            self.bounds = snapshot.bounds;
            self.cells = vec![None; snapshot.cells.len()];
        }

        let stale: Vec<CellCoord> = self
            .bounds
            .cells()
            .zip(self.cells.iter().zip(&snapshot.cells))
            .filter_map(|(cell, (current, baseline))| {
                (current.is_some() && current != baseline).then_some(cell)
            })
            .collect();
        let released = stale.len();
        self.release(stale);

        for (slot, baseline) in self.cells.iter_mut().zip(&snapshot.cells) {
            if slot.is_none() {
                *slot = *baseline;
            }
        }
        released
    }

    fn is_highlighted(&self, cell: CellCoord) -> bool {
        self.highlights.values().any(|cells| cells.contains(&cell))
    }

    fn checked_index(&self, cell: CellCoord, owner: PlaceableId) -> Result<usize, GridError> {
        let index = self
            .bounds
            .index_of(cell)
            .ok_or(GridError::OutOfBounds { cell })?;
        match self.cells.get(index).copied().flatten() {
            Some(current) if current != owner => Err(GridError::CellNotEmpty { cell }),
            _ => Ok(index),
        }
    }
}

/// Immutable occupancy baseline restored between rounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    bounds: CellRect,
    cells: Vec<Option<PlaceableId>>,
}

impl GridSnapshot {
    /// Rectangle of cells covered by the snapshot.
    #[must_use]
    pub const fn bounds(&self) -> CellRect {
        self.bounds
    }

    /// Placeable recorded for the cell in the snapshot, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<PlaceableId> {
        self.bounds
            .index_of(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use party_grid_core::CellRectSize;

    fn grid() -> CellGrid {
        CellGrid::new(CellRect::from_origin_and_size(
            CellCoord::new(-2, -2),
            CellRectSize::new(5, 5),
        ))
    }

    #[test]
    fn take_is_monotonic_until_reset() {
        let mut grid = grid();
        let baseline = grid.snapshot();
        let owner = PlaceableId::new(1);
        let cell = CellCoord::new(0, 0);

        assert!(grid.can_take(cell));
        grid.take(cell, owner).expect("empty cell");
        assert!(!grid.can_take(cell));
        assert_eq!(grid.state(cell), Some(CellState::Occupied));

        grid.highlight(owner, [cell]);
        grid.clear_highlights(owner);
        assert!(!grid.can_take(cell), "overlay changes never free a cell");

        assert_eq!(grid.reset(&baseline), 1);
        assert!(grid.can_take(cell));
    }

    #[test]
    fn take_by_same_owner_is_idempotent() {
        let mut grid = grid();
        let owner = PlaceableId::new(4);
        let cell = CellCoord::new(1, -1);
        grid.take(cell, owner).expect("first take");
        grid.take(cell, owner).expect("repeat take by same owner");
        assert_eq!(
            grid.take(cell, PlaceableId::new(5)),
            Err(GridError::CellNotEmpty { cell })
        );
    }

    #[test]
    fn take_all_is_atomic() {
        let mut grid = grid();
        let blocker = CellCoord::new(2, 2);
        grid.take(blocker, PlaceableId::new(9)).expect("blocker");

        let cells = [CellCoord::new(0, 2), CellCoord::new(1, 2), blocker];
        let result = grid.take_all(&cells, PlaceableId::new(1));

        assert_eq!(result, Err(GridError::CellNotEmpty { cell: blocker }));
        assert!(grid.can_take(CellCoord::new(0, 2)));
        assert!(grid.can_take(CellCoord::new(1, 2)));
    }

    #[test]
    fn out_of_bounds_cells_cannot_be_taken() {
        let mut grid = grid();
        let outside = CellCoord::new(3, 0);
        assert!(!grid.can_take(outside));
        assert_eq!(grid.state(outside), None);
        assert_eq!(
            grid.take(outside, PlaceableId::new(1)),
            Err(GridError::OutOfBounds { cell: outside })
        );
    }

    #[test]
    fn highlight_is_reported_but_stays_takeable() {
        let mut grid = grid();
        let cell = CellCoord::new(-1, 1);
        grid.highlight(PlaceableId::new(1), [cell, CellCoord::new(40, 40)]);

        assert_eq!(grid.state(cell), Some(CellState::Highlighted));
        assert!(grid.can_take(cell));
        assert_eq!(grid.highlighted_cells(), vec![cell]);
    }

    #[test]
    fn previews_are_kept_per_owner() {
        let mut grid = grid();
        let first = PlaceableId::new(1);
        let second = PlaceableId::new(2);
        let shared = CellCoord::new(0, 0);

        grid.highlight(first, [CellCoord::new(-1, 0), shared]);
        grid.highlight(second, [shared, CellCoord::new(1, 0)]);
        assert_eq!(grid.highlights_of(first), vec![CellCoord::new(-1, 0), shared]);
        assert_eq!(
            grid.highlighted_cells(),
            vec![CellCoord::new(-1, 0), shared, CellCoord::new(1, 0)]
        );

        grid.highlight(second, [CellCoord::new(2, 2)]);
        assert_eq!(grid.state(shared), Some(CellState::Highlighted));

        grid.clear_highlights(first);
        assert_eq!(grid.state(shared), Some(CellState::Empty));
        assert!(grid.highlights_of(first).is_empty());
        assert_eq!(grid.highlighted_cells(), vec![CellCoord::new(2, 2)]);
    }

    #[test]
    fn reset_restores_baseline_occupancy() {
        let mut grid = grid();
        let static_cell = CellCoord::new(-2, -2);
        grid.take(static_cell, PlaceableId::new(0)).expect("static");
        let baseline = grid.snapshot();

        grid.take(CellCoord::new(0, 0), PlaceableId::new(1))
            .expect("round placement");
        grid.highlight(PlaceableId::new(1), [CellCoord::new(1, 1)]);

        assert_eq!(grid.reset(&baseline), 1);
        assert_eq!(grid.occupied_cells(), vec![static_cell]);
        assert!(grid.highlighted_cells().is_empty());
        assert_eq!(grid.snapshot(), baseline);
    }

    #[test]
    fn reset_releases_only_cells_claimed_since_the_baseline() {
        let mut grid = grid();
        let level = PlaceableId::new(0);
        let floor = [CellCoord::new(-2, -2), CellCoord::new(-1, -2)];
        grid.take_all(&floor, level).expect("floor");
        let baseline = grid.snapshot();

        let placed = [CellCoord::new(0, 0), CellCoord::new(0, 1)];
        grid.take_all(&placed, PlaceableId::new(3)).expect("round placement");

        assert_eq!(grid.reset(&baseline), 2);
        assert_eq!(grid.occupant(floor[0]), Some(level));
        assert_eq!(grid.occupant(floor[1]), Some(level));
        assert!(placed.iter().all(|cell| grid.can_take(*cell)));
        assert_eq!(grid.reset(&baseline), 0);
    }
}
