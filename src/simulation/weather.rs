use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::scenario::WeatherPolicy;
use crate::world::Cell;

pub const DROUGHT: &str = "Drought";
pub const RAINSTORM: &str = "Rainstorm";

const DROUGHT_SUN_BONUS: f64 = 0.2;
const DROUGHT_RAIN_PENALTY: f64 = 0.3;
const RAINSTORM_RAIN_BONUS: f64 = 0.5;

/// Sun and rain values written by a successful draw.
const FULL: u8 = 255;

/// Weather events currently in effect, keyed by event type, with the number
/// of turns each has left.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveWeather {
    events: BTreeMap<String, u32>,
}

impl ActiveWeather {
    pub fn from_map(events: BTreeMap<String, u32>) -> Self {
        let mut weather = Self { events };
        weather.events.retain(|_, remaining| *remaining > 0);
        weather
    }

    pub fn is_active(&self, event: &str) -> bool {
        self.remaining(event) > 0
    }

    pub fn remaining(&self, event: &str) -> u32 {
        self.events.get(event).copied().unwrap_or(0)
    }

    /// Set (or overwrite) the remaining duration of `event`.
    pub fn activate(&mut self, event: &str, duration: u32) {
        if duration == 0 {
            self.events.remove(event);
        } else {
            self.events.insert(event.to_string(), duration);
        }
    }

    /// Count every event down by one turn. Returns the events that ran out.
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.events.retain(|name, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                expired.push(name.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.events.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, u32> {
        self.events.clone()
    }
}

/// Weather events that changed state during one turn's resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherChanges {
    pub expired: Vec<String>,
    pub activated: Vec<String>,
}

/// Resolve scheduled weather for `turn`.
///
/// Events scheduled for `turn` are activated first, then every active event,
/// including the ones just activated, counts down by one. A duration-d event
/// is therefore in effect for d - 1 turns, and a duration-1 event expires in
/// the same resolution that activated it.
pub fn resolve_weather_events(
    turn: u32,
    policy: &WeatherPolicy,
    weather: &mut ActiveWeather,
) -> WeatherChanges {
    let mut activated = Vec::new();
    for event in policy.events.iter().filter(|e| e.turn == turn) {
        weather.activate(&event.kind, event.duration);
        activated.push(event.kind.clone());
    }
    let expired = weather.tick();
    WeatherChanges { expired, activated }
}

/// Probability of full sun on a cell this turn.
pub fn sun_chance(base: f64, weather: &ActiveWeather) -> f64 {
    let mut chance = base;
    if weather.is_active(DROUGHT) {
        chance += DROUGHT_SUN_BONUS;
    }
    chance.clamp(0.0, 1.0)
}

/// Probability of rain on a cell this turn. Modifiers stack before clamping.
pub fn rain_chance(base: f64, weather: &ActiveWeather) -> f64 {
    let mut chance = base;
    if weather.is_active(DROUGHT) {
        chance -= DROUGHT_RAIN_PENALTY;
    }
    if weather.is_active(RAINSTORM) {
        chance += RAINSTORM_RAIN_BONUS;
    }
    chance.clamp(0.0, 1.0)
}

/// Draw fresh sun for a cell and add half of any rain to its moisture.
///
/// Sun does not carry over between turns; moisture only accumulates, capped at 255.
pub fn resample_cell<R: Rng + ?Sized>(
    cell: &mut Cell,
    sun_chance: f64,
    rain_chance: f64,
    rng: &mut R,
) {
    cell.sun = if rng.gen_bool(sun_chance) { FULL } else { 0 };
    let rain = if rng.gen_bool(rain_chance) { FULL } else { 0 };
    cell.moisture = cell.moisture.saturating_add(rain / 2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scenario::WeatherEvent;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn policy(events: Vec<WeatherEvent>) -> WeatherPolicy {
        WeatherPolicy {
            sun_chance: 0.5,
            rain_chance: 0.5,
            events,
        }
    }

    fn event(kind: &str, turn: u32, duration: u32) -> WeatherEvent {
        WeatherEvent {
            kind: kind.to_string(),
            turn,
            duration,
        }
    }

    #[test]
    fn tick_removes_exhausted_events() {
        let mut w = ActiveWeather::default();
        w.activate(DROUGHT, 2);
        w.activate(RAINSTORM, 1);
        assert_eq!(w.tick(), vec![RAINSTORM.to_string()]);
        assert!(w.is_active(DROUGHT));
        assert_eq!(w.remaining(DROUGHT), 1);
        assert_eq!(w.tick(), vec![DROUGHT.to_string()]);
        assert!(w.is_empty());
    }

    #[test]
    fn duration_one_event_expires_on_its_trigger_turn() {
        let p = policy(vec![event(DROUGHT, 3, 1)]);
        let mut w = ActiveWeather::default();

        let changes = resolve_weather_events(2, &p, &mut w);
        assert!(changes.activated.is_empty());
        assert!(!w.is_active(DROUGHT));

        let changes = resolve_weather_events(3, &p, &mut w);
        assert_eq!(changes.activated, vec![DROUGHT.to_string()]);
        assert_eq!(changes.expired, vec![DROUGHT.to_string()]);
        assert!(!w.is_active(DROUGHT));
        assert_eq!(sun_chance(0.5, &w), 0.5);
    }

    #[test]
    fn event_is_in_effect_one_turn_less_than_its_duration() {
        let p = policy(vec![event(DROUGHT, 1, 3)]);
        let mut w = ActiveWeather::default();

        let active_turns: Vec<u32> = (1..=5)
            .filter(|&turn| {
                resolve_weather_events(turn, &p, &mut w);
                w.is_active(DROUGHT)
            })
            .collect();
        assert_eq!(active_turns, vec![1, 2]);
    }

    #[test]
    fn retrigger_overwrites_remaining_duration() {
        let p = policy(vec![event(RAINSTORM, 1, 5), event(RAINSTORM, 2, 2)]);
        let mut w = ActiveWeather::default();
        resolve_weather_events(1, &p, &mut w);
        assert_eq!(w.remaining(RAINSTORM), 4);
        resolve_weather_events(2, &p, &mut w);
        assert_eq!(w.remaining(RAINSTORM), 1);
    }

    #[test]
    fn chances_stack_and_clamp() {
        let mut w = ActiveWeather::default();
        assert_eq!(sun_chance(0.5, &w), 0.5);
        assert_eq!(rain_chance(0.5, &w), 0.5);

        w.activate(DROUGHT, 3);
        assert!((sun_chance(0.5, &w) - 0.7).abs() < 1e-9);
        assert_eq!(sun_chance(0.9, &w), 1.0);
        assert!((rain_chance(0.5, &w) - 0.2).abs() < 1e-9);
        assert_eq!(rain_chance(0.1, &w), 0.0);

        w.activate(RAINSTORM, 3);
        assert!((rain_chance(0.5, &w) - 0.7).abs() < 1e-9);
        assert_eq!(rain_chance(0.9, &w), 1.0);
    }

    #[test]
    fn resample_with_certain_weather() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut cell = Cell {
            sun: 77,
            moisture: 200,
            ..Cell::EMPTY
        };
        resample_cell(&mut cell, 1.0, 1.0, &mut rng);
        assert_eq!(cell.sun, 255);
        assert_eq!(cell.moisture, 255);

        resample_cell(&mut cell, 0.0, 0.0, &mut rng);
        assert_eq!(cell.sun, 0);
        assert_eq!(cell.moisture, 255);
    }

    #[test]
    fn rain_adds_half_of_full() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut cell = Cell::EMPTY;
        resample_cell(&mut cell, 0.0, 1.0, &mut rng);
        assert_eq!(cell.moisture, 127);
        resample_cell(&mut cell, 0.0, 1.0, &mut rng);
        assert_eq!(cell.moisture, 254);
    }

    #[test]
    fn from_map_drops_exhausted_entries() {
        let mut map = BTreeMap::new();
        map.insert(DROUGHT.to_string(), 0);
        map.insert(RAINSTORM.to_string(), 2);
        let w = ActiveWeather::from_map(map);
        assert!(!w.is_active(DROUGHT));
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![(RAINSTORM, 2)]);
    }
}
