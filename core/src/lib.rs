#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Party Grid placement engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired grid mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems
//! to react to deterministically. Systems consume event streams, query
//! immutable views, and respond with new command batches.
//!
//! Cell coordinates are signed and the `y` axis grows upward, so "down"
//! always means decreasing `y`.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Claims every listed cell for the provided owner, atomically.
    TakeCells {
        /// Placeable that will own the cells once taken.
        owner: PlaceableId,
        /// Cells to transition from empty to occupied.
        cells: Vec<CellCoord>,
    },
    /// Replaces the owner's transient preview overlay with the provided cells.
    Highlight {
        /// Placeable previewing the cells.
        owner: PlaceableId,
        /// Cells to mark as highlighted.
        cells: Vec<CellCoord>,
    },
    /// Removes the owner's transient preview overlay.
    ClearHighlights {
        /// Placeable whose preview is discarded.
        owner: PlaceableId,
    },
    /// Restores the cell grid to the origin snapshot captured at setup.
    ResetGrid,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Starts a new round.
    BeginRound,
    /// Ends the active round and restores the grid baseline.
    EndRound,
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a batch of cells became occupied.
    CellsTaken {
        /// Owner recorded for the taken cells.
        owner: PlaceableId,
        /// Cells that transitioned to occupied.
        cells: Vec<CellCoord>,
    },
    /// Announces that the grid was restored to its origin snapshot.
    GridReset,
    /// Announces that a round started.
    RoundStarted,
    /// Announces that the active round ended.
    RoundEnded,
    /// Presentation hint emitted on every legality recheck of a placeable.
    PlacementFeedback {
        /// Placeable whose legality was recomputed.
        placeable: PlaceableId,
        /// Whether the placeable could be committed at its current position.
        looks_ok: bool,
    },
    /// Confirms that a placeable was committed onto the grid.
    PlacementCommitted {
        /// Placeable that became permanent.
        placeable: PlaceableId,
        /// Footprint cells claimed by the placeable.
        cells: Vec<CellCoord>,
        /// Surface the placeable attached to, for support-requiring objects.
        attached_to: Option<SurfaceId>,
    },
    /// Announces that a queued spawn point is due.
    SpawnReleased {
        /// Zero-based position of the point within the plan's draw order.
        order: usize,
        /// Spawn point that became due.
        point: SpawnPoint,
    },
}

/// Location of a single grid cell expressed as signed `x` and `y` indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical index of the cell; larger values are higher up.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided deltas, saturating at the
    /// integer limits.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns the neighbouring cell one step toward `facing`.
    #[must_use]
    pub const fn step(self, facing: Facing) -> Self {
        let (dx, dy) = facing.delta();
        self.offset(dx, dy)
    }

    /// Squared Euclidean distance between two cells measured in cells.
    #[must_use]
    pub fn distance_squared(self, other: CellCoord) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from its lowest-corner cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Cell with the smallest `x` and `y` inside the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Cell with the largest `x` and `y` inside the rectangle, if any.
    #[must_use]
    pub fn max_inclusive(&self) -> Option<CellCoord> {
        if self.is_empty() {
            return None;
        }
        let width = i32::try_from(self.size.width - 1).ok()?;
        let height = i32::try_from(self.size.height - 1).ok()?;
        Some(self.origin.offset(width, height))
    }

    /// Reports whether the rectangle covers no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size.width == 0 || self.size.height == 0
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.size.width) * u64::from(self.size.height)
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let dx = i64::from(cell.x) - i64::from(self.origin.x);
        let dy = i64::from(cell.y) - i64::from(self.origin.y);
        dx >= 0 && dy >= 0 && dx < i64::from(self.size.width) && dy < i64::from(self.size.height)
    }

    /// Row-major offset of the cell relative to the origin, if covered.
    #[must_use]
    pub fn index_of(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let dx = usize::try_from(i64::from(cell.x) - i64::from(self.origin.x)).ok()?;
        let dy = usize::try_from(i64::from(cell.y) - i64::from(self.origin.y)).ok()?;
        let width = usize::try_from(self.size.width).ok()?;
        dy.checked_mul(width)?.checked_add(dx)
    }

    /// Iterates every covered cell in row-major order starting at the origin.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let width = self.size.width;
        (0..self.size.height).flat_map(move |dy| {
            (0..width).map(move |dx| origin.offset(dx as i32, dy as i32))
        })
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Mapping between world-space positions and grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    origin: Vec2,
    cell_size: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            cell_size: 1.0,
        }
    }
}

impl GridLayout {
    /// Creates a layout whose cell `(0, 0)` has its lower-left corner at
    /// `origin`. Non-positive sizes collapse to one world unit.
    #[must_use]
    pub fn new(origin: Vec2, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self { origin, cell_size }
    }

    /// World-space position of the lower-left corner of cell `(0, 0)`.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Edge length of one square cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Converts a world-space position into the cell that contains it.
    #[must_use]
    pub fn world_to_cell(&self, point: Vec2) -> CellCoord {
        let local = (point - self.origin) / self.cell_size;
        CellCoord::new(local.x.floor() as i32, local.y.floor() as i32)
    }

    /// World-space position of the cell's lower-left corner.
    #[must_use]
    pub fn cell_min(&self, cell: CellCoord) -> Vec2 {
        self.origin + Vec2::new(cell.x() as f32, cell.y() as f32) * self.cell_size
    }

    /// World-space position of the cell's center.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.cell_min(cell) + Vec2::splat(self.cell_size * 0.5)
    }
}

/// Occupancy state of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Free to take.
    Empty,
    /// Claimed by a committed placement.
    Occupied,
    /// Empty, but covered by the transient preview overlay.
    Highlighted,
}

/// Cardinal facing of a placeable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Toward increasing `y`.
    Up,
    /// Toward increasing `x`.
    Right,
    /// Toward decreasing `y`.
    Down,
    /// Toward decreasing `x`.
    Left,
}

impl Facing {
    /// Returns the facing after one quarter turn in the provided direction.
    ///
    /// Clockwise order is `Up -> Right -> Down -> Left -> Up`.
    #[must_use]
    pub const fn rotated(self, rotation: Rotation) -> Self {
        match (self, rotation) {
            (Self::Up, Rotation::Clockwise) => Self::Right,
            (Self::Right, Rotation::Clockwise) => Self::Down,
            (Self::Down, Rotation::Clockwise) => Self::Left,
            (Self::Left, Rotation::Clockwise) => Self::Up,
            (Self::Up, Rotation::CounterClockwise) => Self::Left,
            (Self::Left, Rotation::CounterClockwise) => Self::Down,
            (Self::Down, Rotation::CounterClockwise) => Self::Right,
            (Self::Right, Rotation::CounterClockwise) => Self::Up,
        }
    }

    /// Facing pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit cell delta for one step toward this facing.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Right => (1, 0),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
        }
    }

    /// Rotation angle relative to `Up`, negative for clockwise turns.
    #[must_use]
    pub fn angle_radians(self) -> f32 {
        match self {
            Self::Up => 0.0,
            Self::Right => -std::f32::consts::FRAC_PI_2,
            Self::Down => std::f32::consts::PI,
            Self::Left => std::f32::consts::FRAC_PI_2,
        }
    }

    /// Unit world-space vector toward this facing.
    #[must_use]
    pub fn unit(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }

    /// Rotates a vector authored for an `Up`-facing object into this facing.
    ///
    /// Quarter turns are applied by swapping components so results stay exact.
    #[must_use]
    pub fn orient(self, local: Vec2) -> Vec2 {
        match self {
            Self::Up => local,
            Self::Right => Vec2::new(local.y, -local.x),
            Self::Down => -local,
            Self::Left => Vec2::new(-local.y, local.x),
        }
    }

    /// Inverse of [`Facing::orient`].
    #[must_use]
    pub fn unorient(self, oriented: Vec2) -> Vec2 {
        match self {
            Self::Up => oriented,
            Self::Right => Vec2::new(-oriented.y, oriented.x),
            Self::Down => -oriented,
            Self::Left => Vec2::new(oriented.y, -oriented.x),
        }
    }
}

/// Direction of a quarter turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// `Up -> Right -> Down -> Left`.
    Clockwise,
    /// `Up -> Left -> Down -> Right`.
    CounterClockwise,
}

/// How a placeable responds to a rotation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationPolicy {
    /// Steps the facing one quarter turn and re-anchors the position.
    #[default]
    QuarterTurn,
    /// Mirrors the shape horizontally and leaves the facing untouched.
    HorizontalMirror,
}

/// Unique identifier assigned to a placeable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceableId(u32);

impl PlaceableId {
    /// Creates a new placeable identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a solid level surface that support probes can hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u32);

impl SurfaceId {
    /// Creates a new surface identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Geometric predicate that validated a spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnCategory {
    /// Needs at least one nearby reference surface below or beside it.
    TriangleClearance,
    /// Needs a fully clear circular zone around it.
    CircleClearance,
}

/// Rung of the search ladder that produced a spawn point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnResolution {
    /// Passed its predicate while honouring the minimum spacing.
    Spaced,
    /// Passed its predicate only after spacing was relaxed.
    Relaxed,
    /// Any free, non-solid cell; the predicate was not satisfied.
    Fallback,
    /// The configured sentinel cell; nothing usable was found.
    Sentinel,
}

/// Cell chosen by the spawn search together with its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Cell where the spawn should happen.
    pub cell: CellCoord,
    /// Category the point was requested for.
    pub category: SpawnCategory,
    /// Ladder rung that produced the point.
    pub resolution: SpawnResolution,
}

/// Lifecycle phase of the surrounding game as seen by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// Between rounds; spawns are not released.
    #[default]
    Lobby,
    /// A round is in progress.
    Round,
}

/// Misuse of the cell grid mutation API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum GridError {
    /// The cell lies outside the configured grid bounds.
    #[error("cell ({}, {}) lies outside the grid", cell.x(), cell.y())]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// The cell is already occupied by a different placeable.
    #[error("cell ({}, {}) is already occupied", cell.x(), cell.y())]
    CellNotEmpty {
        /// Offending cell.
        cell: CellCoord,
    },
}

/// Reason a placeable cannot be committed at its current transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum Rejection {
    /// The shape covers no cells at all.
    #[error("footprint is empty")]
    EmptyFootprint,
    /// A footprint cell lies outside the grid.
    #[error("cell ({}, {}) lies outside the grid", cell.x(), cell.y())]
    OutOfBounds {
        /// First offending cell.
        cell: CellCoord,
    },
    /// A footprint cell is already occupied.
    #[error("cell ({}, {}) is occupied", cell.x(), cell.y())]
    Occupied {
        /// First offending cell.
        cell: CellCoord,
    },
    /// The support probe from a footprint cell hit nothing.
    #[error("no support behind cell ({}, {})", cell.x(), cell.y())]
    NoSupport {
        /// Footprint cell whose probe missed.
        cell: CellCoord,
    },
    /// Support probes hit more than one surface.
    #[error("support split between surfaces {} and {}", first.get(), second.get())]
    SplitSupport {
        /// Surface hit by the first probe.
        first: SurfaceId,
        /// First surface that disagreed with it.
        second: SurfaceId,
    },
}

/// Misuse of the placement API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Commit requested before the placeable was ever positioned.
    #[error("placeable {} is not being previewed", placeable.get())]
    NotPreviewing {
        /// Placeable in the wrong lifecycle state.
        placeable: PlaceableId,
    },
    /// The placeable was already placed or cancelled and can no longer change.
    #[error("placeable {} is already placed or cancelled", placeable.get())]
    Finished {
        /// Placeable in a terminal lifecycle state.
        placeable: PlaceableId,
    },
    /// The placeable failed its legality check at commit time.
    #[error("placement rejected: {0}")]
    Rejected(Rejection),
    /// The world refused to take the footprint cells.
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_clockwise_turns_return_to_start() {
        let mut facing = Facing::Left;
        for _ in 0..4 {
            facing = facing.rotated(Rotation::Clockwise);
        }
        assert_eq!(facing, Facing::Left);
        assert_eq!(Facing::Up.rotated(Rotation::Clockwise), Facing::Right);
        assert_eq!(Facing::Up.rotated(Rotation::CounterClockwise), Facing::Left);
    }

    #[test]
    fn orient_matches_facing_unit() {
        for facing in [Facing::Up, Facing::Right, Facing::Down, Facing::Left] {
            assert_eq!(facing.orient(Vec2::Y), facing.unit());
            let sample = Vec2::new(0.25, -0.75);
            assert_eq!(facing.unorient(facing.orient(sample)), sample);
        }
    }

    #[test]
    fn layout_maps_negative_positions_with_floor() {
        let layout = GridLayout::new(Vec2::new(-2.0, 0.0), 0.5);
        assert_eq!(layout.world_to_cell(Vec2::new(-2.1, 0.2)), CellCoord::new(-1, 0));
        assert_eq!(layout.world_to_cell(Vec2::new(-1.0, -0.01)), CellCoord::new(2, -1));
        assert_eq!(layout.cell_center(CellCoord::new(0, 0)), Vec2::new(-1.75, 0.25));
    }

    #[test]
    fn rect_contains_and_indexes_signed_cells() {
        let rect =
            CellRect::from_origin_and_size(CellCoord::new(-2, -1), CellRectSize::new(4, 3));
        assert!(rect.contains(CellCoord::new(-2, -1)));
        assert!(rect.contains(CellCoord::new(1, 1)));
        assert!(!rect.contains(CellCoord::new(2, 1)));
        assert_eq!(rect.index_of(CellCoord::new(-1, 0)), Some(5));
        assert_eq!(rect.cells().count(), 12);
        assert_eq!(rect.cells().last(), Some(CellCoord::new(1, 1)));
        assert_eq!(rect.max_inclusive(), Some(CellCoord::new(1, 1)));

        let empty = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(0, 3));
        assert_eq!(empty.max_inclusive(), None);
    }

    #[test]
    fn quarter_turn_angles_are_clockwise_negative() {
        assert_eq!(Facing::Up.angle_radians(), 0.0);
        assert!(Facing::Right.angle_radians() < 0.0);
        assert!(Facing::Left.angle_radians() > 0.0);
    }

    #[test]
    fn spawn_point_round_trips_through_bincode() {
        let point = SpawnPoint {
            cell: CellCoord::new(-3, 7),
            category: SpawnCategory::TriangleClearance,
            resolution: SpawnResolution::Relaxed,
        };
        let bytes = bincode::serialize(&point).expect("serialize");
        let restored: SpawnPoint = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, point);
    }
}
