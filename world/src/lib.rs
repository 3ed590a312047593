#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state management for Party Grid.

mod cell_grid;
mod platform;

pub use cell_grid::{CellGrid, GridSnapshot};
pub use platform::{LevelError, PlatformMask, SOLID_TILE};

use party_grid_core::{
    CellCoord, CellRect, Command, Event, GridError, GridLayout, PlaceableId, RoundPhase,
};

/// Owner recorded for cells claimed by static level geometry.
pub const LEVEL_OWNER: PlaceableId = PlaceableId::new(u32::MAX);

/// Represents the authoritative placement world.
///
/// The world owns the occupancy grid, the origin snapshot restored between
/// rounds, and the immutable platform mask. Callers hold it explicitly and
/// mutate it only through [`apply`].
#[derive(Debug)]
pub struct World {
    layout: GridLayout,
    grid: CellGrid,
    origin: GridSnapshot,
    platforms: PlatformMask,
    phase: RoundPhase,
}

impl World {
    /// Creates a world over `bounds` whose baseline already occupies
    /// `static_cells`.
    ///
    /// Static cells outside the bounds are ignored.
    #[must_use]
    pub fn new(
        layout: GridLayout,
        bounds: CellRect,
        platforms: PlatformMask,
        static_cells: &[CellCoord],
    ) -> Self {
        let mut grid = CellGrid::new(bounds);
        for &cell in static_cells {
            if let Err(error) = grid.take(cell, LEVEL_OWNER) {
                log::debug!("skipping static cell: {error}");
            }
        }
        let origin = grid.snapshot();
        Self {
            layout,
            grid,
            origin,
            platforms,
            phase: RoundPhase::Lobby,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Only misuse of the grid (taking a foreign-occupied or out-of-bounds cell)
/// returns an error; a failed command leaves the world untouched.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) -> Result<(), GridError> {
    match command {
        Command::TakeCells { owner, cells } => {
            world.grid.take_all(&cells, owner)?;
            out_events.push(Event::CellsTaken { owner, cells });
        }
        Command::Highlight { owner, cells } => world.grid.highlight(owner, cells),
        Command::ClearHighlights { owner } => world.grid.clear_highlights(owner),
        Command::ResetGrid => {
            reset_grid(world);
            out_events.push(Event::GridReset);
        }
        Command::Tick { dt } => out_events.push(Event::TimeAdvanced { dt }),
        Command::BeginRound => {
            if world.phase != RoundPhase::Round {
                world.phase = RoundPhase::Round;
                log::info!("round started");
                out_events.push(Event::RoundStarted);
            }
        }
        Command::EndRound => {
            if world.phase == RoundPhase::Round {
                world.phase = RoundPhase::Lobby;
                reset_grid(world);
                log::info!("round ended");
                out_events.push(Event::GridReset);
                out_events.push(Event::RoundEnded);
            }
        }
    }
    Ok(())
}

fn reset_grid(world: &mut World) {
    let released = world.grid.reset(&world.origin);
    log::debug!("grid reset released {released} cells");
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use party_grid_core::{CellCoord, GridLayout, RoundPhase};

    use super::{CellGrid, GridSnapshot, PlatformMask, World};

    /// Provides read-only access to the occupancy grid.
    #[must_use]
    pub fn cell_grid(world: &World) -> &CellGrid {
        &world.grid
    }

    /// Provides read-only access to the solid-ground mask.
    #[must_use]
    pub fn platform_mask(world: &World) -> &PlatformMask {
        &world.platforms
    }

    /// Mapping between world positions and cells.
    #[must_use]
    pub fn layout(world: &World) -> GridLayout {
        world.layout
    }

    /// Baseline restored by grid resets.
    #[must_use]
    pub fn origin_snapshot(world: &World) -> &GridSnapshot {
        &world.origin
    }

    /// Current round phase.
    #[must_use]
    pub fn phase(world: &World) -> RoundPhase {
        world.phase
    }

    /// Reports whether the cell is free to take.
    #[must_use]
    pub fn can_take(world: &World, cell: CellCoord) -> bool {
        world.grid.can_take(cell)
    }

    /// Cells currently occupied, for occupancy overlays.
    #[must_use]
    pub fn occupied_cells(world: &World) -> Vec<CellCoord> {
        world.grid.occupied_cells()
    }
}
