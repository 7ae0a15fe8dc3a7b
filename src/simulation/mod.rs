pub mod growth;
pub mod rules;
pub mod weather;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::scenario::{Scenario, StoryEvent, UNLOCK_PLANT_TYPE};
use crate::simulation::rules::PlantRegistry;
use crate::simulation::weather::ActiveWeather;
use crate::world::{GridState, MAX_GROWTH, PlantKind};

/// What happened during a single turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    pub turn: u32,
    pub activated: Vec<String>,
    pub expired: Vec<String>,
    pub unlocked: Vec<PlantKind>,
    pub cells_grown: u32,
    pub sun_chance: f64,
    pub rain_chance: f64,
}

/// Advance the simulation by one turn.
///
/// Increments the turn counter, resolves weather and story events scheduled
/// for the new turn, resamples sun and rain for every cell, then grows every
/// eligible plant by exactly one level. Snapshotting is left to the caller.
pub fn advance_turn<R: Rng + ?Sized>(
    grid: &mut GridState,
    scenario: &Scenario,
    registry: &PlantRegistry,
    weather: &mut ActiveWeather,
    sowable: &mut Vec<PlantKind>,
    rng: &mut R,
) -> TurnReport {
    let turn = grid.increment_turn();

    // Event resolution
    let changes = weather::resolve_weather_events(turn, &scenario.weather_policy, weather);
    let unlocked = apply_story_events(turn, &scenario.scheduled_events, registry, sowable);

    // Per-cell resampling
    let sun_chance = weather::sun_chance(scenario.weather_policy.sun_chance, weather);
    let rain_chance = weather::rain_chance(scenario.weather_policy.rain_chance, weather);
    for cell in grid.cells_mut() {
        weather::resample_cell(cell, sun_chance, rain_chance, rng);
    }

    // Growth resolution: decide on the resampled state, then apply
    let growing: Vec<usize> = grid
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_empty() && cell.growth < MAX_GROWTH)
        .map(|(i, _)| i)
        .filter(|&i| {
            let p = grid.position_of(i);
            matches!(growth::can_grow(grid, p.x, p.y, registry, weather), Ok(true))
        })
        .collect();

    let cells = grid.cells_mut();
    for &i in &growing {
        cells[i].growth += 1;
    }

    let report = TurnReport {
        turn,
        activated: changes.activated,
        expired: changes.expired,
        unlocked,
        cells_grown: growing.len() as u32,
        sun_chance,
        rain_chance,
    };

    debug!(
        turn,
        cells_grown = report.cells_grown,
        sun_chance,
        rain_chance,
        activated = ?report.activated,
        expired = ?report.expired,
        "Turn advanced"
    );

    report
}

/// Apply the story events scheduled for `turn`. Returns newly unlocked kinds.
fn apply_story_events(
    turn: u32,
    events: &[StoryEvent],
    registry: &PlantRegistry,
    sowable: &mut Vec<PlantKind>,
) -> Vec<PlantKind> {
    let mut unlocked = Vec::new();

    for event in events.iter().filter(|e| e.turn == turn) {
        if event.action != UNLOCK_PLANT_TYPE {
            warn!(turn, action = %event.action, "Unknown scheduled event action, skipping");
            continue;
        }
        let Some(name) = event.plant_type.as_deref() else {
            warn!(turn, "Unlock event without a plant type, skipping");
            continue;
        };
        match registry.kind_by_name(name) {
            Some(kind) if !sowable.contains(&kind) => {
                sowable.push(kind);
                unlocked.push(kind);
            }
            Some(_) => {}
            None => warn!(turn, plant_type = name, "Unknown plant type in scheduled event, skipping"),
        }
    }

    unlocked
}
