#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement validation system that positions, rotates and commits
//! placeable objects against the authoritative cell grid.
//!
//! Legality is always recomputed from scratch: nothing about a previous
//! check is cached, so a commit re-validates against whatever the grid looks
//! like at call time. Several players placing at once are serialized by call
//! order and the first commit on a shared cell wins.

mod placeable;
mod support;

use std::collections::BTreeSet;

use glam::Vec2;
use party_grid_core::{
    CellCoord, Command, Event, GridLayout, PlacementError, Rejection, Rotation, SurfaceId,
};
use party_grid_system_footprint::FootprintSampler;
use party_grid_world::{self as world, query, CellGrid, World};
use serde::{Deserialize, Serialize};

pub use placeable::{Placeable, PlaceableSpec, PlacementState};
pub use support::{SupportProbe, SurfaceGrid};

/// Tuning knobs for the placement validator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Reach of each support probe measured in cells from the footprint
    /// cell's center.
    pub probe_distance: f32,
    /// Mirrors the current footprint into the grid's preview overlay on
    /// every legality recheck.
    pub highlight_preview: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            probe_distance: 1.0,
            highlight_preview: true,
        }
    }
}

/// Outcome of a single legality check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementCheck {
    footprint: BTreeSet<CellCoord>,
    verdict: Result<Option<SurfaceId>, Rejection>,
}

impl PlacementCheck {
    /// Whether the placeable may be committed where it stands.
    #[must_use]
    pub fn is_legal(&self) -> bool {
        self.verdict.is_ok()
    }

    /// Cells the placeable covers.
    #[must_use]
    pub fn footprint(&self) -> &BTreeSet<CellCoord> {
        &self.footprint
    }

    /// Reason the placement is illegal, if it is.
    #[must_use]
    pub fn rejection(&self) -> Option<Rejection> {
        self.verdict.err()
    }

    /// Surface every support probe agreed on, for legal support-requiring
    /// placements.
    #[must_use]
    pub fn support(&self) -> Option<SurfaceId> {
        self.verdict.ok().flatten()
    }
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Cells claimed in the grid.
    pub cells: Vec<CellCoord>,
    /// Surface the object was parented to, if it requires support.
    pub attached_to: Option<SurfaceId>,
}

/// Placement system orchestrating legality checks, rotation and commits.
#[derive(Clone, Debug)]
pub struct PlacementValidator {
    sampler: FootprintSampler,
    config: ValidatorConfig,
}

impl PlacementValidator {
    /// Creates a validator for grids using `layout`.
    #[must_use]
    pub fn new(layout: GridLayout, config: ValidatorConfig) -> Self {
        Self {
            sampler: FootprintSampler::new(layout),
            config,
        }
    }

    /// Creates a validator with a custom footprint sampler.
    #[must_use]
    pub fn with_sampler(sampler: FootprintSampler, config: ValidatorConfig) -> Self {
        Self { sampler, config }
    }

    /// Layout used to snap positions and sample footprints.
    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.sampler.layout()
    }

    /// Cells the placeable covers at its current transform.
    #[must_use]
    pub fn footprint(&self, placeable: &Placeable) -> BTreeSet<CellCoord> {
        self.sampler
            .sample(&placeable.spec().outline, &placeable.transform())
    }

    /// Computes the legality of the placeable against `grid`.
    ///
    /// Every footprint cell must be free. Objects that require support also
    /// need every probe, cast from each footprint cell opposite to the
    /// facing, to hit one and the same surface.
    #[must_use]
    pub fn check<P>(&self, placeable: &Placeable, grid: &CellGrid, probe: &P) -> PlacementCheck
    where
        P: SupportProbe + ?Sized,
    {
        let footprint = self.footprint(placeable);
        let verdict = self.judge(placeable, &footprint, grid, probe);
        PlacementCheck { footprint, verdict }
    }

    /// Reports whether the placeable could be committed right now.
    #[must_use]
    pub fn can_place<P>(&self, placeable: &Placeable, grid: &CellGrid, probe: &P) -> bool
    where
        P: SupportProbe + ?Sized,
    {
        self.check(placeable, grid, probe).is_legal()
    }

    /// Rechecks legality and emits presentation feedback.
    ///
    /// Records the agreed surface as the placeable's attach target, pushes a
    /// [`Event::PlacementFeedback`], and refreshes the placeable's own
    /// preview overlay when enabled. None of this influences future legality.
    pub fn refresh<P>(
        &self,
        placeable: &mut Placeable,
        world: &mut World,
        probe: &P,
        out_events: &mut Vec<Event>,
    ) -> Result<PlacementCheck, PlacementError>
    where
        P: SupportProbe + ?Sized,
    {
        placeable.ensure_mutable()?;
        let check = self.check(placeable, query::cell_grid(world), probe);
        placeable.set_attach_target(check.support());

        if let Some(rejection) = check.rejection() {
            log::debug!("placeable {} rejected: {rejection}", placeable.id().get());
        }

        if self.config.highlight_preview {
            let cells = check.footprint.iter().copied().collect();
            world::apply(
                world,
                Command::Highlight {
                    owner: placeable.id(),
                    cells,
                },
                out_events,
            )?;
        }

        out_events.push(Event::PlacementFeedback {
            placeable: placeable.id(),
            looks_ok: check.is_legal(),
        });
        Ok(check)
    }

    /// Discards an uncommitted placeable and its preview overlay.
    ///
    /// Occupancy is never touched.
    pub fn cancel(
        &self,
        placeable: &mut Placeable,
        world: &mut World,
        out_events: &mut Vec<Event>,
    ) -> Result<(), PlacementError> {
        placeable.cancel()?;
        world::apply(
            world,
            Command::ClearHighlights {
                owner: placeable.id(),
            },
            out_events,
        )?;
        log::debug!("placeable {} cancelled", placeable.id().get());
        Ok(())
    }

    /// Moves the placeable to the cell under `world_position` and rechecks it.
    pub fn move_to<P>(
        &self,
        placeable: &mut Placeable,
        world_position: Vec2,
        world: &mut World,
        probe: &P,
        out_events: &mut Vec<Event>,
    ) -> Result<PlacementCheck, PlacementError>
    where
        P: SupportProbe + ?Sized,
    {
        placeable.move_to(world_position, &self.layout())?;
        self.refresh(placeable, world, probe, out_events)
    }

    /// Rotates the placeable according to its rotation policy and rechecks it.
    pub fn rotate<P>(
        &self,
        placeable: &mut Placeable,
        rotation: Rotation,
        world: &mut World,
        probe: &P,
        out_events: &mut Vec<Event>,
    ) -> Result<PlacementCheck, PlacementError>
    where
        P: SupportProbe + ?Sized,
    {
        placeable.rotate(rotation, &self.layout())?;
        self.refresh(placeable, world, probe, out_events)
    }

    /// Commits the placeable onto the grid.
    ///
    /// Legality is re-validated here rather than trusted from an earlier
    /// check. Either every footprint cell is taken or none is.
    pub fn commit<P>(
        &self,
        placeable: &mut Placeable,
        world: &mut World,
        probe: &P,
        out_events: &mut Vec<Event>,
    ) -> Result<CommitReceipt, PlacementError>
    where
        P: SupportProbe + ?Sized,
    {
        placeable.ensure_mutable()?;
        if placeable.state() != PlacementState::Previewing {
            return Err(PlacementError::NotPreviewing {
                placeable: placeable.id(),
            });
        }

        let check = self.check(placeable, query::cell_grid(world), probe);
        out_events.push(Event::PlacementFeedback {
            placeable: placeable.id(),
            looks_ok: check.is_legal(),
        });
        let support = match check.verdict {
            Ok(support) => support,
            Err(rejection) => {
                placeable.set_attach_target(None);
                log::debug!("placeable {} commit rejected: {rejection}", placeable.id().get());
                return Err(PlacementError::Rejected(rejection));
            }
        };
        let cells: Vec<CellCoord> = check.footprint.into_iter().collect();

        world::apply(
            world,
            Command::TakeCells {
                owner: placeable.id(),
                cells: cells.clone(),
            },
            out_events,
        )?;
        world::apply(
            world,
            Command::ClearHighlights {
                owner: placeable.id(),
            },
            out_events,
        )?;

        placeable.mark_placed(support);
        out_events.push(Event::PlacementCommitted {
            placeable: placeable.id(),
            cells: cells.clone(),
            attached_to: placeable.parent(),
        });

        Ok(CommitReceipt {
            cells,
            attached_to: placeable.parent(),
        })
    }

    fn judge<P>(
        &self,
        placeable: &Placeable,
        footprint: &BTreeSet<CellCoord>,
        grid: &CellGrid,
        probe: &P,
    ) -> Result<Option<SurfaceId>, Rejection>
    where
        P: SupportProbe + ?Sized,
    {
        if footprint.is_empty() {
            return Err(Rejection::EmptyFootprint);
        }

        for &cell in footprint {
            if grid.can_take(cell) {
                continue;
            }
            return Err(if grid.bounds().contains(cell) {
                Rejection::Occupied { cell }
            } else {
                Rejection::OutOfBounds { cell }
            });
        }

        if !placeable.requires_support() {
            return Ok(None);
        }

        let layout = self.layout();
        let direction = placeable.facing().opposite();
        let max_distance = self.config.probe_distance * layout.cell_size();
        let mut agreed: Option<SurfaceId> = None;

        for &cell in footprint {
            let hit = probe
                .probe(layout.cell_center(cell), direction, max_distance)
                .ok_or(Rejection::NoSupport { cell })?;
            match agreed {
                None => agreed = Some(hit),
                Some(first) if first != hit => {
                    return Err(Rejection::SplitSupport { first, second: hit })
                }
                Some(_) => {}
            }
        }

        Ok(agreed)
    }
}
