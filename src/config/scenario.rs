use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::simulation::rules::PlantRegistry;
use crate::world::grid::MAX_DIMENSION;
use crate::world::{Cell, GridState, MAX_GROWTH, PlantKind, Position};

/// Story event action that adds a plant kind to the sowable set.
pub const UNLOCK_PLANT_TYPE: &str = "unlock_plant_type";

/// Scenarios compiled into the binary, by key.
pub const BUILTIN_SCENARIOS: &[(&str, &str)] = &[
    ("easy_start", include_str!("../../scenarios/easy_start.json")),
    (
        "drought_challenge",
        include_str!("../../scenarios/drought_challenge.json"),
    ),
    (
        "survival_challenge",
        include_str!("../../scenarios/survival_challenge.json"),
    ),
];

/// Static description of a game: starting grid, weather policy, scheduled
/// events and victory condition. Loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub starting_conditions: StartingConditions,
    pub weather_policy: WeatherPolicy,
    #[serde(default)]
    pub scheduled_events: Vec<StoryEvent>,
    pub victory_condition: VictoryCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingConditions {
    #[serde(default = "default_grid_size")]
    pub grid_size: [usize; 2],
    pub player_position: [usize; 2],
    #[serde(default)]
    pub grid: Vec<StartingCell>,
    #[serde(default)]
    pub fully_grown_plants_reaped: u32,
    #[serde(default = "default_available_plant_types")]
    pub available_plant_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingCell {
    pub x: usize,
    pub y: usize,
    pub plant_type: String,
    pub growth_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherPolicy {
    pub sun_chance: f64,
    pub rain_chance: f64,
    #[serde(default)]
    pub events: Vec<WeatherEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub turn: u32,
    #[serde(default = "default_duration")]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryEvent {
    pub turn: u32,
    pub action: String,
    #[serde(default)]
    pub plant_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryKind {
    ReapPlants,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictoryCondition {
    #[serde(rename = "type")]
    pub kind: VictoryKind,
    pub target: u32,
}

fn default_grid_size() -> [usize; 2] {
    [20, 15]
}
fn default_available_plant_types() -> Vec<String> {
    vec!["Wheat".to_string(), "Corn".to_string(), "Rice".to_string()]
}
fn default_duration() -> u32 {
    1
}

impl Scenario {
    /// An empty grid with no events, steady weather and a reap target.
    pub fn empty(width: usize, height: usize, target: u32) -> Self {
        Scenario {
            starting_conditions: StartingConditions {
                grid_size: [width, height],
                player_position: [width / 2, height / 2],
                grid: Vec::new(),
                fully_grown_plants_reaped: 0,
                available_plant_types: default_available_plant_types(),
            },
            weather_policy: WeatherPolicy {
                sun_chance: 0.5,
                rain_chance: 0.5,
                events: Vec::new(),
            },
            scheduled_events: Vec::new(),
            victory_condition: VictoryCondition {
                kind: VictoryKind::ReapPlants,
                target,
            },
        }
    }

    pub fn builtin(key: &str) -> Option<Scenario> {
        BUILTIN_SCENARIOS
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(k, json)| Self::from_json_str(json, k).ok())
    }

    pub fn builtin_keys() -> impl Iterator<Item = &'static str> {
        BUILTIN_SCENARIOS.iter().map(|(k, _)| *k)
    }

    /// Resolve a built-in key or a path to a scenario JSON file.
    /// Returns the scenario key (the file stem for paths) and the scenario.
    pub fn resolve(key_or_path: &str) -> Result<(String, Scenario), String> {
        if let Some(scenario) = Self::builtin(key_or_path) {
            return Ok((key_or_path.to_string(), scenario));
        }
        let path = Path::new(key_or_path);
        if !path.exists() {
            let known: Vec<_> = Self::builtin_keys().collect();
            return Err(format!(
                "Unknown scenario '{}'. Use one of {:?} or a path to a scenario JSON file",
                key_or_path, known
            ));
        }
        let scenario = Self::from_file(path)?;
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(key_or_path)
            .to_string();
        Ok((key, scenario))
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    pub fn from_json_str(content: &str, source: &str) -> Result<Self, String> {
        let scenario: Scenario =
            serde_json::from_str(content).map_err(|e| format!("{}: {}", source, e))?;
        scenario
            .validate()
            .map_err(|e| format!("{}: {}", source, e))?;
        Ok(scenario)
    }

    pub fn width(&self) -> usize {
        self.starting_conditions.grid_size[0]
    }

    pub fn height(&self) -> usize {
        self.starting_conditions.grid_size[1]
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        let sc = &self.starting_conditions;
        let [width, height] = sc.grid_size;

        if width == 0 || height == 0 {
            errors.push(format!(
                "gridSize must be at least 1x1, got {}x{}. Example: \"gridSize\": [20, 15]",
                width, height
            ));
        } else if width > MAX_DIMENSION || height > MAX_DIMENSION {
            errors.push(format!(
                "gridSize sides must be at most {}, got {}x{}",
                MAX_DIMENSION, width, height
            ));
        }

        let [px, py] = sc.player_position;
        if px >= width || py >= height {
            errors.push(format!(
                "playerPosition [{}, {}] is outside the {}x{} grid",
                px, py, width, height
            ));
        }

        for cell in &sc.grid {
            if cell.x >= width || cell.y >= height {
                errors.push(format!(
                    "grid cell ({}, {}) is outside the {}x{} grid",
                    cell.x, cell.y, width, height
                ));
            }
            if cell.growth_level > MAX_GROWTH {
                errors.push(format!(
                    "grid cell ({}, {}) growthLevel must be 0-{}, got {}",
                    cell.x, cell.y, MAX_GROWTH, cell.growth_level
                ));
            }
        }

        let policy = &self.weather_policy;
        if !(0.0..=1.0).contains(&policy.sun_chance) {
            errors.push(format!(
                "weatherPolicy.sunChance must be 0.0-1.0, got {}",
                policy.sun_chance
            ));
        }
        if !(0.0..=1.0).contains(&policy.rain_chance) {
            errors.push(format!(
                "weatherPolicy.rainChance must be 0.0-1.0, got {}",
                policy.rain_chance
            ));
        }

        for event in &self.scheduled_events {
            if event.action != UNLOCK_PLANT_TYPE {
                errors.push(format!(
                    "scheduled event on turn {} has unknown action '{}'. Example: \"action\": \"{}\"",
                    event.turn, event.action, UNLOCK_PLANT_TYPE
                ));
            } else if event.plant_type.is_none() {
                errors.push(format!(
                    "scheduled event on turn {} needs a plantType",
                    event.turn
                ));
            }
        }

        if self.victory_condition.target == 0 {
            errors.push("victoryCondition.target must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }

    /// Build the turn-0 grid, resolving plant names through `registry`.
    pub fn initial_grid(&self, registry: &PlantRegistry) -> Result<GridState, String> {
        let sc = &self.starting_conditions;
        let player = Position::new(sc.player_position[0], sc.player_position[1]);
        let mut grid =
            GridState::new(self.width(), self.height(), player).map_err(|e| e.to_string())?;

        for start in &sc.grid {
            let plant = registry
                .kind_by_name(&start.plant_type)
                .ok_or_else(|| format!("Unknown plant type '{}'", start.plant_type))?;
            grid.set_cell(start.x, start.y, Cell::planted(plant, start.growth_level))
                .map_err(|e| e.to_string())?;
        }
        Ok(grid)
    }

    /// Kinds available to sow at game start, in scenario order without duplicates.
    pub fn initial_sowable(&self, registry: &PlantRegistry) -> Result<Vec<PlantKind>, String> {
        let mut kinds = Vec::new();
        for name in &self.starting_conditions.available_plant_types {
            let kind = registry
                .kind_by_name(name)
                .ok_or_else(|| format!("Unknown plant type '{}'", name))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}
