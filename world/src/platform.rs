//! Static solid-ground mask built once from level geometry.

use std::collections::BTreeSet;

use party_grid_core::{CellCoord, CellRect, CellRectSize};
use thiserror::Error;

/// Character marking a solid cell in textual level rows.
pub const SOLID_TILE: char = '#';

/// Immutable set of cells flagged as solid ground.
///
/// The mask is computed once at level setup and never mutated afterwards.
/// It is independent from the occupancy grid: a solid cell can still have a
/// placeable stacked above it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformMask {
    cells: BTreeSet<CellCoord>,
}

impl PlatformMask {
    /// Builds a mask from an explicit list of solid cells.
    #[must_use]
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    /// Parses textual level rows into a mask.
    ///
    /// The first row is the top of the level and `origin` is the cell of the
    /// bottom-left character. `#` marks solid ground, `.` and spaces are
    /// open. Every row must have the same length.
    pub fn from_rows<S>(rows: &[S], origin: CellCoord) -> Result<Self, LevelError>
    where
        S: AsRef<str>,
    {
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        let mut cells = BTreeSet::new();

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let length = row.chars().count();
            if length != width {
                return Err(LevelError::RaggedRow {
                    row: row_index,
                    expected: width,
                    found: length,
                });
            }

            let dy = i32::try_from(rows.len() - 1 - row_index)
                .map_err(|_| LevelError::TooLarge)?;
            for (column, tile) in row.chars().enumerate() {
                match tile {
                    SOLID_TILE => {
                        let dx = i32::try_from(column).map_err(|_| LevelError::TooLarge)?;
                        let _ = cells.insert(origin.offset(dx, dy));
                    }
                    '.' | ' ' => {}
                    other => {
                        return Err(LevelError::UnknownTile {
                            tile: other,
                            row: row_index,
                            column,
                        })
                    }
                }
            }
        }

        Ok(Self { cells })
    }

    /// Reports whether the cell is solid ground.
    #[must_use]
    pub fn is_solid(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Number of solid cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the mask holds no solid cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates solid cells in ascending `(x, y)` order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().copied()
    }

    /// Smallest rectangle covering every solid cell, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<CellRect> {
        let mut cells = self.cells.iter();
        let first = *cells.next()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x(), first.x(), first.y(), first.y());
        for cell in cells {
            min_x = min_x.min(cell.x());
            max_x = max_x.max(cell.x());
            min_y = min_y.min(cell.y());
            max_y = max_y.max(cell.y());
        }
        let width = u32::try_from(i64::from(max_x) - i64::from(min_x) + 1).ok()?;
        let height = u32::try_from(i64::from(max_y) - i64::from(min_y) + 1).ok()?;
        Some(CellRect::from_origin_and_size(
            CellCoord::new(min_x, min_y),
            CellRectSize::new(width, height),
        ))
    }
}

/// Errors raised while parsing textual level rows.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// A row's length differs from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        /// Zero-based row index counted from the top.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A row contains a character that is neither solid nor open.
    #[error("unknown tile {tile:?} at row {row}, column {column}")]
    UnknownTile {
        /// Offending character.
        tile: char,
        /// Zero-based row index counted from the top.
        row: usize,
        /// Zero-based column index.
        column: usize,
    },
    /// The level does not fit into signed cell coordinates.
    #[error("level is too large")]
    TooLarge,
}
