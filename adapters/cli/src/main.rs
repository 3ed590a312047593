#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs spawn searches and scripted placements
//! against a level file.

mod level;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use party_grid_core::{CellCoord, Command, Event, PlaceableId, PlacementError, Rotation};
use party_grid_system_placement::Placeable;
use party_grid_system_spawn_search::{SpawnPlan, SpawnSearch};
use party_grid_system_spawning::{Config as SequencerConfig, SpawnSequencer};
use party_grid_world::{self as world, query};

use crate::level::Level;

/// Upper bound on simulated sequencer ticks.
const MAX_SEQUENCER_TICKS: u32 = 10_000;

/// Command-line arguments accepted by the `party-grid` binary.
#[derive(Debug, Parser)]
#[command(author, version, about = "Grid placement and spawn search playground")]
struct Cli {
    /// Path to the TOML level file.
    #[arg(long, short)]
    level: PathBuf,
    /// Operation to run against the level.
    #[command(subcommand)]
    mode: Mode,
}

/// Operations supported by the command-line interface.
#[derive(Debug, Subcommand)]
enum Mode {
    /// Searches the level for spawn points and prints them in draw order.
    Spawn {
        /// Number of triangle-validated points.
        #[arg(long, default_value_t = 1)]
        triangles: usize,
        /// Number of circle-validated points.
        #[arg(long, default_value_t = 0)]
        circles: usize,
        /// Overrides the seed from the level file.
        #[arg(long)]
        seed: Option<u64>,
        /// Replays the plan through the sequencer at this release interval.
        #[arg(long)]
        release_interval_ms: Option<u64>,
    },
    /// Replays the level's placement script and prints the resulting grid.
    Place,
}

/// Entry point for the Party Grid command-line interface.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.level)
        .with_context(|| format!("failed to read level file {}", cli.level.display()))?;
    let level = Level::parse(&text)
        .with_context(|| format!("failed to load level {}", cli.level.display()))?;
    log::info!(
        "loaded {}x{} level with {} solid cells",
        level.bounds().size().width(),
        level.bounds().size().height(),
        level.mask().len()
    );

    match cli.mode {
        Mode::Spawn {
            triangles,
            circles,
            seed,
            release_interval_ms,
        } => {
            let plan = run_spawn(&level, triangles, circles, seed);
            if let Some(interval) = release_interval_ms {
                run_sequencer(&level, plan, Duration::from_millis(interval))?;
            }
            Ok(())
        }
        Mode::Place => run_script(&level),
    }
}

fn run_spawn(level: &Level, triangles: usize, circles: usize, seed: Option<u64>) -> SpawnPlan {
    let mut config = level.spawn_config();
    if let Some(seed) = seed {
        config.seed = seed;
    }

    let mut search = SpawnSearch::new(config);
    let plan = search.find_spawn_positions(level.mask(), &level.spawn_request(triangles, circles));

    for (order, point) in plan.points().iter().enumerate() {
        println!(
            "{order:>3}  {:?}  ({}, {})  {:?}",
            point.category,
            point.cell.x(),
            point.cell.y(),
            point.resolution
        );
    }
    println!(
        "{} points, {} relaxed, {} fallback, {} sentinel, {} spacing violations",
        plan.len(),
        plan.relaxed_count(),
        plan.fallback_count(),
        plan.sentinel_count(),
        plan.spacing_violations(config.min_spacing)
    );
    plan
}

fn run_sequencer(level: &Level, plan: SpawnPlan, interval: Duration) -> Result<()> {
    let mut world = level.world();
    let mut sequencer = SpawnSequencer::new(SequencerConfig::new(interval));
    sequencer.load(plan);

    let mut events = Vec::new();
    world::apply(&mut world, Command::BeginRound, &mut events).context("failed to begin round")?;

    let step = if interval.is_zero() {
        Duration::from_millis(1)
    } else {
        interval
    };
    let mut elapsed = Duration::ZERO;
    let mut released = Vec::new();

    for _ in 0..MAX_SEQUENCER_TICKS {
        if sequencer.is_finished() {
            break;
        }
        world::apply(&mut world, Command::Tick { dt: step }, &mut events)
            .context("failed to advance time")?;
        elapsed += step;
        sequencer.handle(&events, query::phase(&world), &mut released);
        events.clear();

        for event in released.drain(..) {
            if let Event::SpawnReleased { order, point } = event {
                println!(
                    "t={:>6}ms  release #{order} at ({}, {})",
                    elapsed.as_millis(),
                    point.cell.x(),
                    point.cell.y()
                );
            }
        }
    }

    world::apply(&mut world, Command::EndRound, &mut events).context("failed to end round")?;
    Ok(())
}

fn run_script(level: &Level) -> Result<()> {
    let mut world = level.world();
    let validator = level.validator();
    let surfaces = level.surfaces();
    let mut events = Vec::new();

    for (index, step) in level.script().iter().enumerate() {
        let spec = level
            .placeable(&step.item)
            .with_context(|| format!("unknown placeable '{}'", step.item))?;
        let id = PlaceableId::new(u32::try_from(index + 1).context("script is too long")?);
        let mut placeable = Placeable::new(id, spec.clone(), CellCoord::new(0, 0), &level.layout());

        let _ = validator.move_to(&mut placeable, step.at, &mut world, &surfaces, &mut events)?;
        let rotation = if step.rotations < 0 {
            Rotation::CounterClockwise
        } else {
            Rotation::Clockwise
        };
        for _ in 0..step.rotations.unsigned_abs() {
            let _ = validator.rotate(&mut placeable, rotation, &mut world, &surfaces, &mut events)?;
        }

        match validator.commit(&mut placeable, &mut world, &surfaces, &mut events) {
            Ok(receipt) => {
                let attached = receipt
                    .attached_to
                    .map_or_else(|| "free-standing".to_owned(), |surface| format!("on surface {}", surface.get()));
                println!(
                    "#{} {} placed on {} cells facing {:?}, {attached}",
                    id.get(),
                    step.item,
                    receipt.cells.len(),
                    placeable.facing()
                );
            }
            Err(PlacementError::Rejected(rejection)) => {
                println!("#{} {} rejected: {rejection}", id.get(), step.item);
                validator.cancel(&mut placeable, &mut world, &mut events)?;
            }
            Err(error) => return Err(error.into()),
        }
    }

    print!("{}", level.render(&world));
    Ok(())
}
