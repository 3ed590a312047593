//! Player-controlled objects that are positioned and committed onto the grid.

use glam::Vec2;
use party_grid_core::{
    CellCoord, Facing, GridLayout, PlaceableId, PlacementError, Rotation, RotationPolicy,
    SurfaceId,
};
use party_grid_system_footprint::{Outline, ShapeTransform};
use serde::{Deserialize, Serialize};

/// Lifecycle of a placeable object.
///
/// `Selecting -> Previewing -> Placed` or `Selecting | Previewing -> Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementState {
    /// Picked by a player but not yet moved onto the grid.
    Selecting,
    /// Following the player's cursor; legality is rechecked every move.
    Previewing,
    /// Committed; the object is immutable from now on.
    Placed,
    /// Discarded before commit; never touched the grid.
    Cancelled,
}

/// Authoring data describing a kind of placeable object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceableSpec {
    /// Physical outline authored for an `Up`-facing object.
    pub outline: Outline,
    /// Facing when the object is first selected.
    #[serde(default = "default_facing")]
    pub facing: Facing,
    /// How the object reacts to rotation requests.
    #[serde(default)]
    pub rotation_policy: RotationPolicy,
    /// Whether the object must attach to a solid surface behind it.
    #[serde(default)]
    pub requires_support: bool,
    /// World-space bias from the anchor cell's center to the pivot, authored
    /// for an `Up`-facing object.
    #[serde(default = "default_offset")]
    pub placement_offset: Vec2,
}

fn default_facing() -> Facing {
    Facing::Up
}

fn default_offset() -> Vec2 {
    Vec2::ZERO
}

impl PlaceableSpec {
    /// Creates a free-standing, `Up`-facing spec for the outline.
    #[must_use]
    pub fn new(outline: Outline) -> Self {
        Self {
            outline,
            facing: Facing::Up,
            rotation_policy: RotationPolicy::QuarterTurn,
            requires_support: false,
            placement_offset: Vec2::ZERO,
        }
    }
}

/// A single object a player positions, rotates and commits.
#[derive(Clone, Debug)]
pub struct Placeable {
    id: PlaceableId,
    spec: PlaceableSpec,
    facing: Facing,
    mirrored: bool,
    anchor: CellCoord,
    position: Vec2,
    attach_target: Option<SurfaceId>,
    parent: Option<SurfaceId>,
    state: PlacementState,
}

impl Placeable {
    /// Creates a placeable in the `Selecting` state anchored at `anchor`.
    #[must_use]
    pub fn new(id: PlaceableId, spec: PlaceableSpec, anchor: CellCoord, layout: &GridLayout) -> Self {
        let mut placeable = Self {
            id,
            facing: spec.facing,
            spec,
            mirrored: false,
            anchor,
            position: Vec2::ZERO,
            attach_target: None,
            parent: None,
            state: PlacementState::Selecting,
        };
        placeable.reanchor(layout);
        placeable
    }

    /// Identifier of the placeable.
    #[must_use]
    pub const fn id(&self) -> PlaceableId {
        self.id
    }

    /// Authoring data the placeable was created from.
    #[must_use]
    pub const fn spec(&self) -> &PlaceableSpec {
        &self.spec
    }

    /// Current facing.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Whether the outline is currently mirrored.
    #[must_use]
    pub const fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Cell the object is snapped to.
    #[must_use]
    pub const fn anchor(&self) -> CellCoord {
        self.anchor
    }

    /// World-space pivot position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether the object needs a supporting surface.
    #[must_use]
    pub const fn requires_support(&self) -> bool {
        self.spec.requires_support
    }

    /// Surface found by the latest successful legality check.
    #[must_use]
    pub const fn attach_target(&self) -> Option<SurfaceId> {
        self.attach_target
    }

    /// Surface the committed object is parented to.
    #[must_use]
    pub const fn parent(&self) -> Option<SurfaceId> {
        self.parent
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PlacementState {
        self.state
    }

    /// Whether the object has been committed.
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.state == PlacementState::Placed
    }

    /// World transform applied to the outline.
    #[must_use]
    pub fn transform(&self) -> ShapeTransform {
        ShapeTransform {
            translation: self.position,
            facing: self.facing,
            mirrored: self.mirrored,
        }
    }

    /// Snaps the object to the cell under `world_position`.
    ///
    /// The pivot lands on the cell center plus the placement offset expressed
    /// in the current orientation. Moves a `Selecting` object to `Previewing`.
    pub fn move_to(&mut self, world_position: Vec2, layout: &GridLayout) -> Result<(), PlacementError> {
        self.ensure_mutable()?;
        self.anchor = layout.world_to_cell(world_position);
        self.reanchor(layout);
        self.state = PlacementState::Previewing;
        Ok(())
    }

    /// Discards an uncommitted object. The grid is never touched.
    pub(crate) fn cancel(&mut self) -> Result<(), PlacementError> {
        self.ensure_mutable()?;
        self.state = PlacementState::Cancelled;
        self.attach_target = None;
        Ok(())
    }

    pub(crate) fn rotate(&mut self, rotation: Rotation, layout: &GridLayout) -> Result<(), PlacementError> {
        self.ensure_mutable()?;
        match self.spec.rotation_policy {
            RotationPolicy::HorizontalMirror => self.mirrored = !self.mirrored,
            RotationPolicy::QuarterTurn => self.facing = self.facing.rotated(rotation),
        }
        self.reanchor(layout);
        Ok(())
    }

    pub(crate) fn ensure_mutable(&self) -> Result<(), PlacementError> {
        match self.state {
            PlacementState::Selecting | PlacementState::Previewing => Ok(()),
            PlacementState::Placed | PlacementState::Cancelled => {
                Err(PlacementError::Finished { placeable: self.id })
            }
        }
    }

    pub(crate) fn set_attach_target(&mut self, target: Option<SurfaceId>) {
        self.attach_target = target;
    }

    pub(crate) fn mark_placed(&mut self, support: Option<SurfaceId>) {
        self.attach_target = support;
        if self.spec.requires_support {
            self.parent = support;
        }
        self.state = PlacementState::Placed;
    }

    fn reanchor(&mut self, layout: &GridLayout) {
        let orientation = ShapeTransform {
            translation: Vec2::ZERO,
            ..self.transform()
        };
        self.position =
            layout.cell_center(self.anchor) + orientation.to_world(self.spec.placement_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PlaceableSpec {
        PlaceableSpec {
            placement_offset: Vec2::new(0.0, 0.25),
            ..PlaceableSpec::new(Outline::Rect {
                half_extents: Vec2::new(0.45, 0.2),
            })
        }
    }

    #[test]
    fn offset_follows_orientation() {
        let layout = GridLayout::default();
        let mut placeable = Placeable::new(PlaceableId::new(1), spec(), CellCoord::new(2, 2), &layout);
        assert_eq!(placeable.position(), Vec2::new(2.5, 2.75));

        placeable.rotate(Rotation::Clockwise, &layout).expect("mutable");
        assert_eq!(placeable.facing(), Facing::Right);
        assert_eq!(placeable.position(), Vec2::new(2.75, 2.5));
        assert_eq!(placeable.anchor(), CellCoord::new(2, 2));
    }

    #[test]
    fn move_snaps_to_cell_and_starts_preview() {
        let layout = GridLayout::new(Vec2::ZERO, 2.0);
        let mut placeable = Placeable::new(PlaceableId::new(1), spec(), CellCoord::new(0, 0), &layout);
        assert_eq!(placeable.state(), PlacementState::Selecting);

        placeable.move_to(Vec2::new(5.9, -0.1), &layout).expect("mutable");

        assert_eq!(placeable.anchor(), CellCoord::new(2, -1));
        assert_eq!(placeable.position(), Vec2::new(5.0, -0.75));
        assert_eq!(placeable.state(), PlacementState::Previewing);
    }

    #[test]
    fn mirror_policy_keeps_facing() {
        let layout = GridLayout::default();
        let mirrored_spec = PlaceableSpec {
            rotation_policy: RotationPolicy::HorizontalMirror,
            placement_offset: Vec2::new(0.25, 0.0),
            ..spec()
        };
        let mut placeable =
            Placeable::new(PlaceableId::new(3), mirrored_spec, CellCoord::new(0, 0), &layout);

        placeable.rotate(Rotation::Clockwise, &layout).expect("mutable");

        assert_eq!(placeable.facing(), Facing::Up);
        assert!(placeable.mirrored());
        assert_eq!(placeable.position(), Vec2::new(0.25, 0.5));
    }

    #[test]
    fn cancelled_objects_reject_changes() {
        let layout = GridLayout::default();
        let mut placeable = Placeable::new(PlaceableId::new(7), spec(), CellCoord::new(0, 0), &layout);
        placeable.cancel().expect("cancel from selecting");

        assert_eq!(
            placeable.move_to(Vec2::ZERO, &layout),
            Err(PlacementError::Finished {
                placeable: PlaceableId::new(7)
            })
        );
        assert_eq!(placeable.state(), PlacementState::Cancelled);
    }
}
