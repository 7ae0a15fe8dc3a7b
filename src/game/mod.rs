pub mod history;

use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::scenario::{Scenario, VictoryKind};
use crate::persistence::{SAVE_VERSION, SaveError, SaveFile};
use crate::simulation::rules::PlantRegistry;
use crate::simulation::weather::ActiveWeather;
use crate::simulation::{self, TurnReport};
use crate::world::{Cell, Direction, GridState, PlantKind, Position};

pub use history::History;

/// Why a player action was refused. State is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    OutOfBounds(Direction),
    Occupied(Position),
    Empty(Position),
    NoSowableKinds,
    GameOver,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::OutOfBounds(dir) => write!(f, "Cannot reach {}: edge of the field", dir),
            ActionError::Occupied(p) => write!(f, "Cell ({}, {}) is already planted", p.x, p.y),
            ActionError::Empty(p) => write!(f, "Nothing to reap at ({}, {})", p.x, p.y),
            ActionError::NoSowableKinds => write!(f, "No plant types are available to sow"),
            ActionError::GameOver => write!(f, "The game is over"),
        }
    }
}

impl std::error::Error for ActionError {}

/// Result of a successful reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapOutcome {
    pub position: Position,
    pub kind: PlantKind,
    pub growth: u8,
    /// True when the plant was fully grown and counted toward victory.
    pub counted: bool,
    /// True when this reap met the victory condition.
    pub victory: bool,
}

/// One play session: scenario, live state, history and session flags.
///
/// Every successful mutating action pushes exactly one snapshot onto the
/// history. Once victory is reached all mutating actions return
/// [`ActionError::GameOver`].
pub struct Game<R = ChaCha8Rng> {
    scenario_key: String,
    scenario: Scenario,
    registry: PlantRegistry,
    state: GridState,
    history: History,
    weather: ActiveWeather,
    sowable: Vec<PlantKind>,
    reaped: u32,
    victory: bool,
    debug: bool,
    rng: R,
}

impl<R: Rng> Game<R> {
    pub fn new(
        scenario_key: impl Into<String>,
        scenario: Scenario,
        registry: PlantRegistry,
        history_limit: usize,
        rng: R,
    ) -> Result<Self, String> {
        let state = scenario.initial_grid(&registry)?;
        let sowable = scenario.initial_sowable(&registry)?;
        let mut history = History::with_capacity(history_limit);
        history.push(state.clone());

        let mut game = Game {
            scenario_key: scenario_key.into(),
            reaped: scenario.starting_conditions.fully_grown_plants_reaped,
            scenario,
            registry,
            state,
            history,
            weather: ActiveWeather::default(),
            sowable,
            victory: false,
            debug: false,
            rng,
        };
        game.check_victory();
        Ok(game)
    }

    /// Restore a session from a save record, keeping the registry and RNG.
    pub fn from_save_file(
        save: &SaveFile,
        registry: PlantRegistry,
        history_limit: usize,
        rng: R,
    ) -> Result<Self, SaveError> {
        let mut game = Game {
            scenario_key: String::new(),
            scenario: save.scenario.clone(),
            registry,
            state: decode_grid(save, &save.game_state, "gameState")?,
            history: History::with_capacity(history_limit),
            weather: ActiveWeather::default(),
            sowable: Vec::new(),
            reaped: 0,
            victory: false,
            debug: false,
            rng,
        };
        game.restore(save)?;
        Ok(game)
    }

    /// Replace this session's state with a save record. On error the
    /// session is left untouched.
    pub fn restore(&mut self, save: &SaveFile) -> Result<(), SaveError> {
        save.check_consistency().map_err(SaveError::Corrupt)?;

        let state = decode_grid(save, &save.game_state, "gameState")?;
        let past = save
            .history
            .iter()
            .map(|flat| decode_grid(save, flat, "history"))
            .collect::<Result<Vec<_>, _>>()?;
        let future = save
            .future
            .iter()
            .map(|flat| decode_grid(save, flat, "future"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sowable = Vec::new();
        for name in &save.available_plant_types {
            let kind = resolve_kind_name(&self.registry, name)
                .ok_or_else(|| SaveError::Corrupt(format!("unknown plant type '{}'", name)))?;
            if !sowable.contains(&kind) {
                sowable.push(kind);
            }
        }

        let mut history = History::from_parts(past, future, self.history.capacity());
        if history.current() != Some(&state) {
            history.push(state.clone());
        }

        self.scenario_key = save.scenario_key.clone();
        self.scenario = save.scenario.clone();
        self.state = state;
        self.history = history;
        self.weather = ActiveWeather::from_map(save.active_weather_events.clone());
        self.sowable = sowable;
        self.reaped = save.fully_grown_plants_reaped;
        self.victory = save.victory_condition_met;
        self.debug = save.debug_mode;
        Ok(())
    }

    pub fn to_save_file(&self) -> SaveFile {
        SaveFile {
            version: SAVE_VERSION,
            scenario_key: self.scenario_key.clone(),
            scenario: self.scenario.clone(),
            width: self.state.width(),
            height: self.state.height(),
            game_state: self.state.to_flat(),
            history: self.history.past().map(GridState::to_flat).collect(),
            future: self.history.future().iter().map(GridState::to_flat).collect(),
            fully_grown_plants_reaped: self.reaped,
            victory_condition_met: self.victory,
            active_weather_events: self.weather.to_map(),
            available_plant_types: self
                .sowable
                .iter()
                .map(|k| self.registry.name_of(*k))
                .collect(),
            debug_mode: self.debug,
        }
    }

    fn ensure_playing(&self) -> Result<(), ActionError> {
        if self.victory {
            Err(ActionError::GameOver)
        } else {
            Ok(())
        }
    }

    fn commit(&mut self) {
        self.history.push(self.state.clone());
    }

    fn facing(&self, direction: Direction) -> Result<Position, ActionError> {
        self.state
            .step(self.state.player(), direction)
            .ok_or(ActionError::OutOfBounds(direction))
    }

    /// Move one cell, clamped at the edges. A blocked move still records a
    /// history entry.
    pub fn move_player(&mut self, direction: Direction) -> Result<Position, ActionError> {
        self.ensure_playing()?;
        let current = self.state.player();
        let next = self.state.step(current, direction).unwrap_or(current);
        self.state.set_player(next).map_err(|_| ActionError::OutOfBounds(direction))?;
        self.commit();
        Ok(next)
    }

    /// Plant a random sowable kind at growth 1 in the adjacent cell.
    pub fn sow(&mut self, direction: Direction) -> Result<(Position, PlantKind), ActionError> {
        self.ensure_playing()?;
        let target = self.facing(direction)?;
        let cell = self
            .state
            .cell(target.x, target.y)
            .map_err(|_| ActionError::OutOfBounds(direction))?;
        if !cell.is_empty() {
            return Err(ActionError::Occupied(target));
        }
        let kind = *self
            .sowable
            .choose(&mut self.rng)
            .ok_or(ActionError::NoSowableKinds)?;
        self.state
            .set_plant(target.x, target.y, kind, 1)
            .map_err(|_| ActionError::OutOfBounds(direction))?;
        self.commit();
        Ok((target, kind))
    }

    /// Clear the adjacent cell. Fully grown plants count toward victory.
    pub fn reap(&mut self, direction: Direction) -> Result<ReapOutcome, ActionError> {
        self.ensure_playing()?;
        let target = self.facing(direction)?;
        let cell = self
            .state
            .cell(target.x, target.y)
            .map_err(|_| ActionError::OutOfBounds(direction))?;
        if cell.is_empty() {
            return Err(ActionError::Empty(target));
        }

        let counted = cell.is_fully_grown();
        if counted {
            self.reaped += 1;
        }
        self.state
            .set_plant(target.x, target.y, PlantKind::None, 0)
            .map_err(|_| ActionError::OutOfBounds(direction))?;
        self.commit();
        let victory = self.check_victory();

        Ok(ReapOutcome {
            position: target,
            kind: cell.plant,
            growth: cell.growth,
            counted,
            victory,
        })
    }

    pub fn advance_turn(&mut self) -> Result<TurnReport, ActionError> {
        self.ensure_playing()?;
        let report = simulation::advance_turn(
            &mut self.state,
            &self.scenario,
            &self.registry,
            &mut self.weather,
            &mut self.sowable,
            &mut self.rng,
        );
        self.commit();
        Ok(report)
    }

    /// Step back one snapshot. `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, ActionError> {
        self.ensure_playing()?;
        match self.history.undo() {
            Some(state) => {
                self.state = state.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply an undone snapshot. `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, ActionError> {
        self.ensure_playing()?;
        match self.history.redo() {
            Some(state) => {
                self.state = state.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    /// Latch victory once the condition is met. Returns true only on the
    /// call that first meets it.
    fn check_victory(&mut self) -> bool {
        if self.victory {
            return false;
        }
        let met = match self.scenario.victory_condition.kind {
            VictoryKind::ReapPlants => self.reaped >= self.scenario.victory_condition.target,
        };
        if met {
            self.victory = true;
            info!(
                scenario = %self.scenario_key,
                reaped = self.reaped,
                turn = self.state.turn(),
                "Victory condition met"
            );
        }
        met
    }
}

impl<R> Game<R> {
    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn scenario_key(&self) -> &str {
        &self.scenario_key
    }

    pub fn registry(&self) -> &PlantRegistry {
        &self.registry
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn weather(&self) -> &ActiveWeather {
        &self.weather
    }

    pub fn sowable(&self) -> &[PlantKind] {
        &self.sowable
    }

    pub fn reaped(&self) -> u32 {
        self.reaped
    }

    pub fn target(&self) -> u32 {
        self.scenario.victory_condition.target
    }

    pub fn is_victory(&self) -> bool {
        self.victory
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn cell_at(&self, position: Position) -> Option<Cell> {
        self.state.cell(position.x, position.y).ok()
    }
}

fn decode_grid(save: &SaveFile, flat: &[u32], what: &str) -> Result<GridState, SaveError> {
    GridState::from_flat(save.width, save.height, flat)
        .map_err(|e| SaveError::Corrupt(format!("{}: {}", what, e)))
}

/// Resolve a saved plant name, including the `Plant<code>` form used for
/// custom kinds without a definition.
fn resolve_kind_name(registry: &PlantRegistry, name: &str) -> Option<PlantKind> {
    registry.kind_by_name(name).or_else(|| {
        let code = name.strip_prefix("Plant")?.parse::<u8>().ok()?;
        (code >= PlantKind::FIRST_CUSTOM_CODE).then(|| PlantKind::from_code(code))
    })
}
