use crate::simulation::rules::{GrowthContext, PlantRegistry};
use crate::simulation::weather::ActiveWeather;
use crate::world::{GridError, GridState};

/// Decide whether the plant at (x, y) may advance one growth level.
///
/// Empty cells never grow. Otherwise every condition registered for the
/// plant's kind must hold; a kind without a definition always may grow.
pub fn can_grow(
    grid: &GridState,
    x: usize,
    y: usize,
    registry: &PlantRegistry,
    weather: &ActiveWeather,
) -> Result<bool, GridError> {
    let cell = grid.cell(x, y)?;
    if cell.is_empty() {
        return Ok(false);
    }

    let Some(definition) = registry.get(cell.plant) else {
        return Ok(true);
    };

    let neighbors = grid.neighbor_kinds(x, y)?;
    let ctx = GrowthContext {
        kind: cell.plant,
        sun: cell.sun,
        moisture: cell.moisture,
        turn: grid.turn(),
        neighbors: &neighbors,
        weather,
    };
    Ok(definition.allows_growth(&ctx))
}
