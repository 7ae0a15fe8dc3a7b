use std::fmt::Write;

use crate::game::Game;
use crate::simulation::TurnReport;
use crate::simulation::rules::PlantRegistry;
use crate::world::{Cell, GridState, PlantKind};

/// Column width of one cell in debug view, wide enough for `S255M255`.
const DEBUG_CELL_WIDTH: usize = 8;

/// Single-character symbol for a plant kind.
pub fn plant_symbol(kind: PlantKind, registry: &PlantRegistry) -> char {
    match kind {
        PlantKind::None => '.',
        PlantKind::Wheat => 'W',
        PlantKind::Corn => 'C',
        PlantKind::Rice => 'R',
        PlantKind::Custom(_) => registry
            .name_of(kind)
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?'),
    }
}

fn debug_label(cell: &Cell, symbol: char) -> String {
    if cell.is_empty() {
        symbol.to_string()
    } else {
        format!("{}{}", symbol, cell.growth)
    }
}

/// Draw the field. The player's cell shows `P`. In debug view every plant
/// shows its growth level and a second line under each row lists sun and
/// moisture per column.
pub fn render_grid(state: &GridState, registry: &PlantRegistry, debug: bool) -> String {
    let mut out = String::new();
    let player = state.player();

    for y in 0..state.height() {
        let row = &state.cells()[y * state.width()..(y + 1) * state.width()];
        let mut top = String::new();
        let mut bottom = String::new();

        for (x, cell) in row.iter().enumerate() {
            let is_player = player.x == x && player.y == y;
            let symbol = if is_player {
                'P'
            } else {
                plant_symbol(cell.plant, registry)
            };

            if debug {
                let label = if is_player {
                    "P".to_string()
                } else {
                    debug_label(cell, symbol)
                };
                let _ = write!(top, "{:<width$}", label, width = DEBUG_CELL_WIDTH + 1);
                let _ = write!(
                    bottom,
                    "{:<width$}",
                    format!("S{}M{}", cell.sun, cell.moisture),
                    width = DEBUG_CELL_WIDTH + 1
                );
            } else {
                top.push(symbol);
            }
        }

        out.push_str(top.trim_end());
        out.push('\n');
        if debug {
            out.push_str(bottom.trim_end());
            out.push('\n');
        }
    }

    out
}

/// One-line session summary shown under the field.
pub fn status_line<R>(game: &Game<R>) -> String {
    let weather = if game.weather().is_empty() {
        "clear".to_string()
    } else {
        game.weather()
            .iter()
            .map(|(name, left)| format!("{} ({} left)", name, left))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let sowable = game
        .sowable()
        .iter()
        .map(|k| game.registry().name_of(*k))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Turn {} | Reaped {}/{} | Weather: {} | Seeds: {}",
        game.state().turn(),
        game.reaped(),
        game.target(),
        weather,
        if sowable.is_empty() { "none" } else { &sowable }
    )
}

/// Short description of what a turn changed.
pub fn turn_summary(report: &TurnReport, registry: &PlantRegistry) -> String {
    let mut parts = vec![format!("Turn {}", report.turn)];
    if report.cells_grown > 0 {
        parts.push(format!("{} plant(s) grew", report.cells_grown));
    }
    for event in &report.activated {
        parts.push(format!("{} begins", event));
    }
    for event in &report.expired {
        parts.push(format!("{} ends", event));
    }
    for kind in &report.unlocked {
        parts.push(format!("{} seeds unlocked", registry.name_of(*kind)));
    }
    parts.join(" | ")
}

/// Full screen: field plus status line.
pub fn render_game<R>(game: &Game<R>) -> String {
    let mut out = render_grid(game.state(), game.registry(), game.debug());
    out.push_str(&status_line(game));
    out.push('\n');
    out
}
