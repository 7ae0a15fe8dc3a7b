use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

use crate::cli::input::{Command, HELP};
use crate::cli::render;
use crate::config::game::GameConfig;
use crate::config::plants;
use crate::config::scenario::{BUILTIN_SCENARIOS, Scenario};
use crate::game::Game;
use crate::persistence::{self, SaveFile};
use crate::world::GridState;

/// Where and whether the interactive loop persists the game.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub save_dir: PathBuf,
    pub autosave: bool,
}

impl SessionSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            save_dir: config.save_dir(),
            autosave: config.autosave,
        }
    }
}

/// Options for `play` that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub scenario: Option<String>,
    pub seed: Option<u64>,
    /// Skip the resume prompt even when an autosave exists.
    pub fresh: bool,
}

/// Start an interactive game on `input`/`output`.
pub fn play<I: BufRead, O: Write>(
    config: &GameConfig,
    options: &PlayOptions,
    input: &mut I,
    output: &mut O,
) -> Result<(), String> {
    // 1. Rules and scenario
    let registry =
        plants::load_registry(config.plant_definitions.as_deref().map(Path::new))?;
    let key = options
        .scenario
        .as_deref()
        .unwrap_or(&config.default_scenario);
    let (scenario_key, scenario) = Scenario::resolve(key)?;

    // 2. Randomness
    let seed = options.seed.unwrap_or(config.seed);
    let rng = if seed == 0 {
        ChaCha8Rng::from_entropy()
    } else {
        ChaCha8Rng::seed_from_u64(seed)
    };
    info!(scenario = %scenario_key, seed, "Starting game");

    let mut game = Game::new(
        scenario_key,
        scenario,
        registry,
        config.history_limit,
        rng,
    )?;
    let settings = SessionSettings::from_config(config);

    // 3. Offer to resume the autosave
    if settings.autosave && !options.fresh {
        offer_resume(&mut game, &settings, input, output).map_err(|e| e.to_string())?;
    }

    writeln!(output, "{}\n", HELP).map_err(|e| e.to_string())?;
    run_session(&mut game, &settings, input, output).map_err(|e| e.to_string())
}

fn offer_resume<R: Rng, I: BufRead, O: Write>(
    game: &mut Game<R>,
    settings: &SessionSettings,
    input: &mut I,
    output: &mut O,
) -> io::Result<()> {
    let path = persistence::autosave_path(&settings.save_dir);
    if !path.exists() {
        return Ok(());
    }

    let save = match persistence::load_game(&path) {
        Ok(save) => save,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable autosave");
            return Ok(());
        }
    };

    write!(
        output,
        "Found an autosave ({}, turn {}). Resume it? [y/N] ",
        save.scenario_key,
        save.turn().unwrap_or(0)
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        match game.restore(&save) {
            Ok(()) => writeln!(output, "Autosave restored.")?,
            Err(e) => writeln!(output, "Cannot resume autosave: {}", e)?,
        }
    }
    Ok(())
}

/// Read commands until `q` or end of input, redrawing after each one.
pub fn run_session<R: Rng, I: BufRead, O: Write>(
    game: &mut Game<R>,
    settings: &SessionSettings,
    input: &mut I,
    output: &mut O,
) -> io::Result<()> {
    let mut line = String::new();

    loop {
        write!(output, "{}", render::render_game(game))?;
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(e) => {
                writeln!(output, "{}", e)?;
                continue;
            }
        };

        if command == Command::Quit {
            writeln!(output, "Goodbye.")?;
            break;
        }

        if game.is_victory() && !command.allowed_after_victory() {
            writeln!(
                output,
                "The game is won. Only debug, save, load, help and q are available."
            )?;
            continue;
        }

        match execute(game, &command, settings) {
            Ok(message) => {
                if !message.is_empty() {
                    writeln!(output, "{}", message)?;
                }
                if command.is_mutating() && settings.autosave {
                    autosave(game, settings);
                }
            }
            Err(message) => writeln!(output, "{}", message)?,
        }
    }

    Ok(())
}

/// Apply one command. `Ok` carries a message for the player; `Err` means the
/// command was refused and the game is unchanged.
fn execute<R: Rng>(
    game: &mut Game<R>,
    command: &Command,
    settings: &SessionSettings,
) -> Result<String, String> {
    match command {
        Command::Move(dir) => {
            game.move_player(*dir).map_err(|e| e.to_string())?;
            Ok(String::new())
        }
        Command::Sow(dir) => {
            let (pos, kind) = game.sow(*dir).map_err(|e| e.to_string())?;
            Ok(format!(
                "Sowed {} at ({}, {})",
                game.registry().name_of(kind),
                pos.x,
                pos.y
            ))
        }
        Command::Reap(dir) => {
            let outcome = game.reap(*dir).map_err(|e| e.to_string())?;
            let name = game.registry().name_of(outcome.kind);
            let mut message = if outcome.counted {
                format!("Reaped a fully grown {} ({}/{})", name, game.reaped(), game.target())
            } else {
                format!("Cleared an unripe {} (growth {})", name, outcome.growth)
            };
            if outcome.victory {
                message.push_str(&format!(
                    "\nVictory! You reaped {} fully grown plants.",
                    game.reaped()
                ));
            }
            Ok(message)
        }
        Command::NextTurn => {
            let report = game.advance_turn().map_err(|e| e.to_string())?;
            Ok(render::turn_summary(&report, game.registry()))
        }
        Command::Undo => match game.undo().map_err(|e| e.to_string())? {
            true => Ok("Undone.".to_string()),
            false => Err("Nothing to undo.".to_string()),
        },
        Command::Redo => match game.redo().map_err(|e| e.to_string())? {
            true => Ok("Redone.".to_string()),
            false => Err("Nothing to redo.".to_string()),
        },
        Command::Debug => {
            let on = game.toggle_debug();
            Ok(format!("Debug view {}", if on { "on" } else { "off" }))
        }
        Command::Save(name) => {
            let path = persistence::save_path(&settings.save_dir, name).map_err(|e| e.to_string())?;
            persistence::save_game(&game.to_save_file(), &path)
                .map_err(|e| format!("Save failed: {}", e))?;
            info!(path = %path.display(), "Game saved");
            Ok(format!("Saved to {}", path.display()))
        }
        Command::Load(name) => {
            let path = persistence::save_path(&settings.save_dir, name).map_err(|e| e.to_string())?;
            let save = persistence::load_game(&path).map_err(|e| format!("Load failed: {}", e))?;
            game.restore(&save).map_err(|e| format!("Load failed: {}", e))?;
            info!(path = %path.display(), "Game loaded");
            Ok(format!("Loaded {}", path.display()))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

fn autosave<R: Rng>(game: &Game<R>, settings: &SessionSettings) {
    let path = persistence::autosave_path(&settings.save_dir);
    match persistence::save_game(&game.to_save_file(), &path) {
        Ok(()) => debug!(path = %path.display(), turn = game.state().turn(), "Autosaved"),
        Err(e) => warn!(path = %path.display(), error = %e, "Autosave failed"),
    }
}

/// Print the built-in scenarios.
pub fn list_scenarios<O: Write>(output: &mut O) -> Result<(), String> {
    let write = |output: &mut O| -> io::Result<()> {
        writeln!(output, "{:<22} {:>7} {:>7} {:>8}", "Scenario", "Grid", "Target", "Events")?;
        writeln!(output, "{}", "-".repeat(47))?;
        for (key, _) in BUILTIN_SCENARIOS {
            let Some(s) = Scenario::builtin(key) else {
                continue;
            };
            writeln!(
                output,
                "{:<22} {:>7} {:>7} {:>8}",
                key,
                format!("{}x{}", s.width(), s.height()),
                s.victory_condition.target,
                s.weather_policy.events.len() + s.scheduled_events.len()
            )?;
        }
        Ok(())
    };
    write(output).map_err(|e| e.to_string())
}

/// Print the saves in `dir`, newest first.
pub fn list_saves<O: Write>(dir: &Path, output: &mut O) -> Result<(), String> {
    let saves = persistence::list_saves(dir).map_err(|e| format!("Error listing saves: {}", e))?;

    let write = |output: &mut O| -> io::Result<()> {
        if saves.is_empty() {
            writeln!(output, "No saves found in {}", dir.display())?;
            return Ok(());
        }
        writeln!(output, "{:<30} {:>12} {:>10}", "Save", "Modified", "Size")?;
        writeln!(output, "{}", "-".repeat(54))?;
        for s in &saves {
            let modified = s
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            writeln!(
                output,
                "{:<30} {:>12} {:>7} KB",
                s.name,
                modified,
                s.file_size.div_ceil(1024)
            )?;
        }
        writeln!(output, "\n{} save(s) in {}", saves.len(), dir.display())
    };
    write(output).map_err(|e| e.to_string())
}

/// Print a summary of a save file and its current field.
pub fn inspect<O: Write>(path: &Path, output: &mut O) -> Result<(), String> {
    let save = persistence::load_game(path).map_err(|e| format!("Failed to load save: {}", e))?;
    let registry = plants::load_registry(None)?;
    let state = GridState::from_flat(save.width, save.height, &save.game_state)
        .map_err(|e| format!("Failed to decode save: {}", e))?;

    write_inspection(&save, &state, &registry, output).map_err(|e| e.to_string())
}

fn write_inspection<O: Write>(
    save: &SaveFile,
    state: &GridState,
    registry: &crate::simulation::rules::PlantRegistry,
    output: &mut O,
) -> io::Result<()> {
    writeln!(output, "=== Save: {} ===", save.scenario_key)?;
    writeln!(output, "Grid: {}x{}", save.width, save.height)?;
    writeln!(output, "Turn: {}", state.turn())?;
    writeln!(
        output,
        "Player: ({}, {})",
        state.player().x,
        state.player().y
    )?;
    writeln!(
        output,
        "Reaped: {}/{}{}",
        save.fully_grown_plants_reaped,
        save.scenario.victory_condition.target,
        if save.victory_condition_met { " (won)" } else { "" }
    )?;
    writeln!(output, "Planted cells: {}", state.planted_count())?;
    writeln!(
        output,
        "History: {} undo, {} redo",
        save.history.len(),
        save.future.len()
    )?;
    if save.active_weather_events.is_empty() {
        writeln!(output, "Weather: clear")?;
    } else {
        for (event, left) in &save.active_weather_events {
            writeln!(output, "Weather: {} ({} turns left)", event, left)?;
        }
    }
    writeln!(output, "Seeds: {}", save.available_plant_types.join(", "))?;
    writeln!(output)?;
    write!(output, "{}", render::render_grid(state, registry, save.debug_mode))
}
