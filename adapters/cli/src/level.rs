//! TOML level files describing the grid, its solid cells and the content
//! that is spawned or placed on it.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use glam::Vec2;
use party_grid_core::{CellCoord, CellRect, CellRectSize, CellState, GridLayout};
use party_grid_system_placement::{PlaceableSpec, PlacementValidator, SurfaceGrid, ValidatorConfig};
use party_grid_system_spawn_search::{SpawnRequest, SpawnSearchConfig};
use party_grid_world::{query, PlatformMask, World, LEVEL_OWNER, SOLID_TILE};
use serde::Deserialize;

/// Character printed for empty cells.
const EMPTY_TILE: char = '.';
/// Character printed for highlighted preview cells.
const HIGHLIGHT_TILE: char = '+';
/// Characters cycled through for cells owned by committed placeables.
const OWNER_TILES: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Raw contents of a level file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelFile {
    /// World-space origin and cell size of the grid.
    #[serde(default)]
    layout: GridLayout,
    /// Level rows from top to bottom; `#` marks solid ground.
    rows: Vec<String>,
    /// Region spawn points are drawn from; defaults to the whole level.
    #[serde(default)]
    spawn_region: Option<CellRect>,
    /// Spawn search tuning.
    #[serde(default)]
    spawn: SpawnSearchConfig,
    /// Placement validator tuning.
    #[serde(default)]
    validator: ValidatorConfig,
    /// Placeable kinds available to scripted placements, keyed by name.
    #[serde(default)]
    placeables: BTreeMap<String, PlaceableSpec>,
    /// Placements replayed in order by the `place` command.
    #[serde(default)]
    script: Vec<ScriptedPlacement>,
}

/// A single scripted placement attempt.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedPlacement {
    /// Name of a placeable kind declared in the level.
    pub(crate) item: String,
    /// World-space position the object is moved to.
    pub(crate) at: Vec2,
    /// Quarter turns applied before committing; negative values turn
    /// counter-clockwise.
    #[serde(default)]
    pub(crate) rotations: i32,
}

/// Parsed level ready to build worlds and systems from.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    file: LevelFile,
    layout: GridLayout,
    bounds: CellRect,
    mask: PlatformMask,
}

impl Level {
    /// Parses and validates a level from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let file: LevelFile = toml::from_str(text).context("level file is not valid TOML")?;
        Self::from_file(file)
    }

    fn from_file(file: LevelFile) -> Result<Self> {
        if file.rows.is_empty() {
            bail!("level has no rows");
        }

        let mask = PlatformMask::from_rows(&file.rows, CellCoord::new(0, 0))
            .context("level rows are malformed")?;
        let width = file.rows.first().map_or(0, |row| row.chars().count());
        let width = u32::try_from(width).context("level is too wide")?;
        let height = u32::try_from(file.rows.len()).context("level is too tall")?;
        let bounds = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(width, height));

        for placement in &file.script {
            if !file.placeables.contains_key(&placement.item) {
                bail!("script refers to unknown placeable '{}'", placement.item);
            }
        }

        let layout = GridLayout::new(file.layout.origin(), file.layout.cell_size());
        Ok(Self {
            file,
            layout,
            bounds,
            mask,
        })
    }

    /// Layout shared by every system built from the level.
    pub(crate) const fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Cells covered by the level.
    pub(crate) const fn bounds(&self) -> CellRect {
        self.bounds
    }

    /// Solid ground of the level.
    pub(crate) const fn mask(&self) -> &PlatformMask {
        &self.mask
    }

    /// Spawn search tuning from the file.
    pub(crate) const fn spawn_config(&self) -> SpawnSearchConfig {
        self.file.spawn
    }

    /// Scripted placements in replay order.
    pub(crate) fn script(&self) -> &[ScriptedPlacement] {
        &self.file.script
    }

    /// Placeable kind registered under `name`.
    pub(crate) fn placeable(&self, name: &str) -> Option<&PlaceableSpec> {
        self.file.placeables.get(name)
    }

    /// Spawn request over the configured region.
    pub(crate) fn spawn_request(&self, triangle_count: usize, circle_count: usize) -> SpawnRequest {
        let region = self.file.spawn_region.unwrap_or(self.bounds);
        SpawnRequest::new(region, triangle_count, circle_count)
    }

    /// Fresh world whose baseline occupies every solid cell.
    pub(crate) fn world(&self) -> World {
        let solid: Vec<CellCoord> = self.mask.iter().collect();
        World::new(self.layout, self.bounds, self.mask.clone(), &solid)
    }

    /// Support probe treating each connected solid region as one surface.
    pub(crate) fn surfaces(&self) -> SurfaceGrid {
        SurfaceGrid::from_connected(self.layout, self.mask.iter())
    }

    /// Placement validator configured from the file.
    pub(crate) fn validator(&self) -> PlacementValidator {
        PlacementValidator::new(self.layout, self.file.validator)
    }

    /// Draws the world's grid as text, top row first.
    pub(crate) fn render(&self, world: &World) -> String {
        let grid = query::cell_grid(world);
        let origin = self.bounds.origin();
        let size = self.bounds.size();
        let mut out = String::new();

        for dy in (0..size.height()).rev() {
            for dx in 0..size.width() {
                let cell = origin.offset(dx as i32, dy as i32);
                let tile = match (grid.state(cell), grid.occupant(cell)) {
                    (_, Some(owner)) if owner == LEVEL_OWNER => SOLID_TILE,
                    (_, Some(owner)) => {
                        let index = owner.get() as usize % OWNER_TILES.len();
                        char::from(OWNER_TILES[index])
                    }
                    (Some(CellState::Highlighted), None) => HIGHLIGHT_TILE,
                    _ => EMPTY_TILE,
                };
                out.push(tile);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use party_grid_core::{PlaceableId, RotationPolicy};
    use party_grid_world as world;

    const DEMO: &str = r#######"
        rows = [
            "......",
            "......",
            "######",
        ]

        [spawn]
        seed = 9

        [placeables.crate]
        outline = { kind = "rect", half_extents = [0.45, 0.45] }

        [placeables.sign]
        outline = { kind = "rect", half_extents = [0.45, 0.45] }
        requires_support = true
        rotation_policy = "HorizontalMirror"

        [[script]]
        item = "sign"
        at = [2.5, 1.5]
    "#######;

    #[test]
    fn parses_rows_and_content() {
        let level = Level::parse(DEMO).expect("valid level");

        assert_eq!(level.bounds().size(), CellRectSize::new(6, 3));
        assert_eq!(level.mask().len(), 6);
        assert!(level.mask().is_solid(CellCoord::new(5, 0)));
        assert_eq!(level.spawn_config().seed, 9);
        assert_eq!(level.script().len(), 1);

        let sign = level.placeable("sign").expect("sign registered");
        assert!(sign.requires_support);
        assert_eq!(sign.rotation_policy, RotationPolicy::HorizontalMirror);
        assert_eq!(level.spawn_request(1, 2).region, level.bounds());
    }

    #[test]
    fn rejects_scripts_with_unknown_items() {
        let text = r###"
            rows = ["..", "##"]

            [[script]]
            item = "ghost"
            at = [0.5, 1.5]
        "###;
        let error = Level::parse(text).expect_err("unknown item");
        assert!(error.to_string().contains("ghost"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let text = r#"rows = ["...", ".."]"#;
        assert!(Level::parse(text).is_err());
    }

    #[test]
    fn renders_solid_and_owned_cells() {
        let level = Level::parse(DEMO).expect("valid level");
        let mut world = level.world();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            party_grid_core::Command::TakeCells {
                owner: PlaceableId::new(1),
                cells: vec![CellCoord::new(1, 1)],
            },
            &mut events,
        )
        .expect("free cell");

        assert_eq!(level.render(&world), "......\n.b....\n######\n");
    }
}
