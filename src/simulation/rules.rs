use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::simulation::weather::ActiveWeather;
use crate::world::PlantKind;

/// Everything a growth condition may look at for one cell on one turn.
#[derive(Debug, Clone, Copy)]
pub struct GrowthContext<'a> {
    pub kind: PlantKind,
    pub sun: u8,
    pub moisture: u8,
    pub turn: u32,
    /// Kinds of the in-bounds orthogonal neighbors.
    pub neighbors: &'a [PlantKind],
    pub weather: &'a ActiveWeather,
}

impl GrowthContext<'_> {
    pub fn is_weather_active(&self, event: &str) -> bool {
        self.weather.is_active(event)
    }
}

/// A single declarative growth predicate.
///
/// Serialized externally tagged in snake_case, so a TOML plant file can write
/// `{ sun_above = 128 }` or `{ moisture_between = { min = 10, max = 25 } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthCondition {
    SunAbove(u8),
    MoistureAbove(u8),
    MoistureBetween { min: u8, max: u8 },
    NeighborSameKindAtLeast(usize),
    NeighborAnyKindAtLeast(usize),
    TurnAfter(u32),
    WeatherActive(String),
}

impl GrowthCondition {
    pub fn holds(&self, ctx: &GrowthContext<'_>) -> bool {
        match self {
            GrowthCondition::SunAbove(threshold) => ctx.sun > *threshold,
            GrowthCondition::MoistureAbove(threshold) => ctx.moisture > *threshold,
            GrowthCondition::MoistureBetween { min, max } => {
                (*min..=*max).contains(&ctx.moisture)
            }
            GrowthCondition::NeighborSameKindAtLeast(count) => {
                ctx.neighbors.iter().filter(|&&k| k == ctx.kind).count() >= *count
            }
            GrowthCondition::NeighborAnyKindAtLeast(count) => {
                ctx.neighbors.iter().filter(|k| !k.is_none()).count() >= *count
            }
            GrowthCondition::TurnAfter(turn) => ctx.turn > *turn,
            GrowthCondition::WeatherActive(event) => ctx.is_weather_active(event),
        }
    }
}

/// Growth rules for one plant kind. All conditions must hold for the plant to grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantDefinition {
    pub name: String,
    pub kind: PlantKind,
    pub conditions: Vec<GrowthCondition>,
}

impl PlantDefinition {
    /// Start a definition with no conditions; chain `require_*` calls to add them.
    pub fn new(name: impl Into<String>, kind: PlantKind) -> Self {
        Self {
            name: name.into(),
            kind,
            conditions: Vec::new(),
        }
    }

    pub fn require(mut self, condition: GrowthCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn require_sun_above(self, threshold: u8) -> Self {
        self.require(GrowthCondition::SunAbove(threshold))
    }

    pub fn require_moisture_above(self, threshold: u8) -> Self {
        self.require(GrowthCondition::MoistureAbove(threshold))
    }

    pub fn require_moisture_between(self, min: u8, max: u8) -> Self {
        self.require(GrowthCondition::MoistureBetween { min, max })
    }

    pub fn require_adjacent_same_kind(self, count: usize) -> Self {
        self.require(GrowthCondition::NeighborSameKindAtLeast(count))
    }

    pub fn require_adjacent_any_kind(self, count: usize) -> Self {
        self.require(GrowthCondition::NeighborAnyKindAtLeast(count))
    }

    pub fn require_turn_after(self, turn: u32) -> Self {
        self.require(GrowthCondition::TurnAfter(turn))
    }

    pub fn require_weather_active(self, event: impl Into<String>) -> Self {
        self.require(GrowthCondition::WeatherActive(event.into()))
    }

    /// True when every condition holds. A definition without conditions always holds.
    pub fn allows_growth(&self, ctx: &GrowthContext<'_>) -> bool {
        self.conditions.iter().all(|c| c.holds(ctx))
    }
}

/// Lookup table from plant kind to its growth rules.
///
/// Built once at startup and passed by reference into the growth evaluator
/// and turn engine. Kinds without a definition have no growth requirements.
#[derive(Debug, Clone, Default)]
pub struct PlantRegistry {
    definitions: HashMap<PlantKind, PlantDefinition>,
    order: Vec<PlantKind>,
}

impl PlantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the Wheat, Corn and Rice rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            PlantDefinition::new("Wheat", PlantKind::Wheat)
                .require_moisture_above(10)
                .require_adjacent_same_kind(1),
        );
        registry.register(PlantDefinition::new("Corn", PlantKind::Corn).require_sun_above(128));
        registry.register(
            PlantDefinition::new("Rice", PlantKind::Rice)
                .require_moisture_between(10, 25)
                .require_adjacent_any_kind(2),
        );
        registry
    }

    /// Insert or replace the definition for `definition.kind`.
    pub fn register(&mut self, definition: PlantDefinition) {
        let kind = definition.kind;
        if self.definitions.insert(kind, definition).is_none() {
            self.order.push(kind);
        }
    }

    pub fn get(&self, kind: PlantKind) -> Option<&PlantDefinition> {
        self.definitions.get(&kind)
    }

    /// Registered kinds in first-registration order.
    pub fn kinds(&self) -> &[PlantKind] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolve a plant name (case-insensitive). Built-in names resolve even
    /// when the registry carries no rules for them.
    pub fn kind_by_name(&self, name: &str) -> Option<PlantKind> {
        let registered = self
            .order
            .iter()
            .find(|k| self.definitions[*k].name.eq_ignore_ascii_case(name))
            .copied();
        registered.or_else(|| {
            PlantKind::builtin()
                .into_iter()
                .find(|k| builtin_name(*k).eq_ignore_ascii_case(name))
        })
    }

    pub fn name_of(&self, kind: PlantKind) -> String {
        match self.definitions.get(&kind) {
            Some(def) => def.name.clone(),
            None => match kind {
                PlantKind::Custom(code) => format!("Plant{}", code),
                other => builtin_name(other).to_string(),
            },
        }
    }
}

fn builtin_name(kind: PlantKind) -> &'static str {
    match kind {
        PlantKind::None => "None",
        PlantKind::Wheat => "Wheat",
        PlantKind::Corn => "Corn",
        PlantKind::Rice => "Rice",
        PlantKind::Custom(_) => "Custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        kind: PlantKind,
        sun: u8,
        moisture: u8,
        neighbors: &'a [PlantKind],
        weather: &'a ActiveWeather,
    ) -> GrowthContext<'a> {
        GrowthContext {
            kind,
            sun,
            moisture,
            turn: 1,
            neighbors,
            weather,
        }
    }

    #[test]
    fn sun_and_moisture_thresholds_are_strict() {
        let w = ActiveWeather::default();
        let sun = GrowthCondition::SunAbove(128);
        assert!(sun.holds(&ctx(PlantKind::Corn, 129, 0, &[], &w)));
        assert!(!sun.holds(&ctx(PlantKind::Corn, 128, 0, &[], &w)));

        let moisture = GrowthCondition::MoistureAbove(10);
        assert!(moisture.holds(&ctx(PlantKind::Wheat, 0, 11, &[], &w)));
        assert!(!moisture.holds(&ctx(PlantKind::Wheat, 0, 10, &[], &w)));
    }

    #[test]
    fn moisture_range_is_inclusive() {
        let w = ActiveWeather::default();
        let range = GrowthCondition::MoistureBetween { min: 10, max: 25 };
        for (m, expected) in [(9, false), (10, true), (17, true), (25, true), (26, false)] {
            assert_eq!(range.holds(&ctx(PlantKind::Rice, 0, m, &[], &w)), expected, "moisture {}", m);
        }
    }

    #[test]
    fn neighbor_counts() {
        let w = ActiveWeather::default();
        let neighbors = [PlantKind::Wheat, PlantKind::None, PlantKind::Corn];
        let c = ctx(PlantKind::Wheat, 0, 0, &neighbors, &w);
        assert!(GrowthCondition::NeighborSameKindAtLeast(1).holds(&c));
        assert!(!GrowthCondition::NeighborSameKindAtLeast(2).holds(&c));
        assert!(GrowthCondition::NeighborAnyKindAtLeast(2).holds(&c));
        assert!(!GrowthCondition::NeighborAnyKindAtLeast(3).holds(&c));
    }

    #[test]
    fn turn_and_weather_conditions() {
        let mut w = ActiveWeather::default();
        let mut c = ctx(PlantKind::Corn, 0, 0, &[], &w);
        c.turn = 5;
        assert!(GrowthCondition::TurnAfter(4).holds(&c));
        assert!(!GrowthCondition::TurnAfter(5).holds(&c));
        assert!(!GrowthCondition::WeatherActive("Rainstorm".into()).holds(&c));

        w.activate("Rainstorm", 2);
        let c = ctx(PlantKind::Corn, 0, 0, &[], &w);
        assert!(GrowthCondition::WeatherActive("Rainstorm".into()).holds(&c));
    }

    #[test]
    fn empty_definition_always_allows_growth() {
        let w = ActiveWeather::default();
        let def = PlantDefinition::new("Weed", PlantKind::Custom(4));
        assert!(def.allows_growth(&ctx(PlantKind::Custom(4), 0, 0, &[], &w)));
    }

    #[test]
    fn condition_order_does_not_change_result() {
        let w = ActiveWeather::default();
        let a = PlantDefinition::new("A", PlantKind::Rice)
            .require_moisture_between(10, 25)
            .require_adjacent_any_kind(2);
        let b = PlantDefinition::new("B", PlantKind::Rice)
            .require_adjacent_any_kind(2)
            .require_moisture_between(10, 25);
        let neighbor_sets: [&[PlantKind]; 3] = [
            &[],
            &[PlantKind::Corn],
            &[PlantKind::Corn, PlantKind::Wheat],
        ];
        for neighbors in neighbor_sets {
            for m in [5, 10, 20, 30] {
                let c = ctx(PlantKind::Rice, 0, m, neighbors, &w);
                assert_eq!(a.allows_growth(&c), b.allows_growth(&c));
            }
        }
    }

    #[test]
    fn builtins_registered_in_order() {
        let r = PlantRegistry::with_builtins();
        assert_eq!(r.kinds(), &[PlantKind::Wheat, PlantKind::Corn, PlantKind::Rice]);
        assert_eq!(
            r.get(PlantKind::Wheat).unwrap().conditions,
            vec![
                GrowthCondition::MoistureAbove(10),
                GrowthCondition::NeighborSameKindAtLeast(1)
            ]
        );
        assert_eq!(
            r.get(PlantKind::Corn).unwrap().conditions,
            vec![GrowthCondition::SunAbove(128)]
        );
        assert!(r.get(PlantKind::None).is_none());
    }

    #[test]
    fn register_overwrites_last_write_wins() {
        let mut r = PlantRegistry::with_builtins();
        r.register(PlantDefinition::new("Corn", PlantKind::Corn).require_sun_above(10));
        r.register(PlantDefinition::new("Corn", PlantKind::Corn).require_sun_above(50));
        assert_eq!(r.len(), 3);
        assert_eq!(
            r.get(PlantKind::Corn).unwrap().conditions,
            vec![GrowthCondition::SunAbove(50)]
        );
    }

    #[test]
    fn names_resolve_case_insensitive() {
        let mut r = PlantRegistry::new();
        assert_eq!(r.kind_by_name("wheat"), Some(PlantKind::Wheat));
        assert_eq!(r.kind_by_name("pumpkin"), None);

        r.register(PlantDefinition::new("Pumpkin", PlantKind::Custom(4)));
        assert_eq!(r.kind_by_name("PUMPKIN"), Some(PlantKind::Custom(4)));
        assert_eq!(r.name_of(PlantKind::Custom(4)), "Pumpkin");
        assert_eq!(r.name_of(PlantKind::Custom(9)), "Plant9");
        assert_eq!(r.name_of(PlantKind::Rice), "Rice");
    }

    #[test]
    fn conditions_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            conditions: Vec<GrowthCondition>,
        }
        let toml = r#"
            conditions = [
                { sun_above = 100 },
                { moisture_between = { min = 10, max = 25 } },
                { neighbor_same_kind_at_least = 1 },
                { weather_active = "Rainstorm" },
            ]
        "#;
        let parsed: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(
            parsed.conditions,
            vec![
                GrowthCondition::SunAbove(100),
                GrowthCondition::MoistureBetween { min: 10, max: 25 },
                GrowthCondition::NeighborSameKindAtLeast(1),
                GrowthCondition::WeatherActive("Rainstorm".to_string()),
            ]
        );
    }
}
