use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::simulation::rules::{GrowthCondition, PlantDefinition, PlantRegistry};
use crate::world::PlantKind;

/// A TOML file of extra plant kinds:
///
/// ```toml
/// [[plant]]
/// name = "Pumpkin"
/// code = 4
/// conditions = [{ sun_above = 100 }, { turn_after = 5 }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PlantFile {
    #[serde(default, rename = "plant")]
    pub plants: Vec<PlantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlantEntry {
    pub name: String,
    pub code: u8,
    #[serde(default)]
    pub conditions: Vec<GrowthCondition>,
}

impl PlantFile {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let file: PlantFile =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        file.validate()
            .map_err(|e| format!("{}: {}", source_path.display(), e))?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();
        let mut codes = HashSet::new();
        let builtin_names = ["none", "wheat", "corn", "rice"];

        for entry in &self.plants {
            let lower = entry.name.to_ascii_lowercase();
            if entry.name.trim().is_empty() {
                errors.push(format!("plant with code {} needs a name", entry.code));
            } else if builtin_names.contains(&lower.as_str()) {
                errors.push(format!(
                    "plant name '{}' is reserved for a built-in kind",
                    entry.name
                ));
            } else if !names.insert(lower) {
                errors.push(format!("plant name '{}' is defined twice", entry.name));
            }

            if entry.code < PlantKind::FIRST_CUSTOM_CODE {
                errors.push(format!(
                    "plant '{}' code must be >= {}, got {}. Codes 0-{} are built-in",
                    entry.name,
                    PlantKind::FIRST_CUSTOM_CODE,
                    entry.code,
                    PlantKind::FIRST_CUSTOM_CODE - 1
                ));
            } else if !codes.insert(entry.code) {
                errors.push(format!("plant code {} is used twice", entry.code));
            }

            for condition in &entry.conditions {
                match condition {
                    GrowthCondition::MoistureBetween { min, max } if min > max => {
                        errors.push(format!(
                            "plant '{}' moisture_between has min {} > max {}",
                            entry.name, min, max
                        ));
                    }
                    _ => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = PlantDefinition> + '_ {
        self.plants.iter().map(|entry| PlantDefinition {
            name: entry.name.clone(),
            kind: PlantKind::Custom(entry.code),
            conditions: entry.conditions.clone(),
        })
    }

    /// Register every definition in `registry`. Returns how many were added.
    pub fn register_into(&self, registry: &mut PlantRegistry) -> usize {
        let mut count = 0;
        for definition in self.definitions() {
            registry.register(definition);
            count += 1;
        }
        count
    }
}

/// Build the plant registry: built-ins plus any definitions from `path`.
pub fn load_registry(path: Option<&Path>) -> Result<PlantRegistry, String> {
    let mut registry = PlantRegistry::with_builtins();
    if let Some(path) = path {
        let file = PlantFile::from_file(path)?;
        let added = file.register_into(&mut registry);
        tracing::info!(path = %path.display(), count = added, "Loaded plant definitions");
    }
    Ok(registry)
}
