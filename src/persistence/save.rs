use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::scenario::Scenario;
use crate::world::grid::{self, MAX_DIMENSION};

/// Save record format version.
pub const SAVE_VERSION: u32 = 1;
/// Fixed save name written after every successful action.
pub const AUTOSAVE_NAME: &str = "autosave";

/// Complete persisted session: current state, both history stacks and all
/// session flags. Grids are stored in the flat numeric encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub version: u32,
    pub scenario_key: String,
    pub scenario: Scenario,
    pub width: usize,
    pub height: usize,
    pub game_state: Vec<u32>,
    pub history: Vec<Vec<u32>>,
    pub future: Vec<Vec<u32>>,
    pub fully_grown_plants_reaped: u32,
    pub victory_condition_met: bool,
    pub active_weather_events: BTreeMap<String, u32>,
    pub available_plant_types: Vec<String>,
    pub debug_mode: bool,
}

impl SaveFile {
    /// Turn recorded in the current state, if the record is well formed.
    pub fn turn(&self) -> Option<u32> {
        self.game_state.last().copied()
    }

    /// Check the version and that every grid has the length its dimensions require.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.version != SAVE_VERSION {
            return Err(format!(
                "unsupported save version {}, expected {}",
                self.version, SAVE_VERSION
            ));
        }
        let Some(expected) = grid::flat_len(self.width, self.height) else {
            return Err(format!(
                "invalid grid size {}x{}, each side must be 1-{}",
                self.width, self.height, MAX_DIMENSION
            ));
        };
        let grids = std::iter::once(&self.game_state)
            .chain(self.history.iter())
            .chain(self.future.iter());
        for (i, grid) in grids.enumerate() {
            if grid.len() != expected {
                return Err(format!(
                    "grid {} has {} values, expected {}",
                    i,
                    grid.len(),
                    expected
                ));
            }
        }
        Ok(())
    }
}

/// Metadata about a save file on disk.
#[derive(Debug, Clone)]
pub struct SaveMetadata {
    pub path: PathBuf,
    pub name: String,
    pub modified: SystemTime,
    pub file_size: u64,
}

/// Errors that can occur while saving or loading a game.
#[derive(Debug)]
pub enum SaveError {
    Io(io::Error),
    Serialize(String),
    Deserialize(String),
    Corrupt(String),
    NotFound(PathBuf),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {}", e),
            SaveError::Serialize(e) => write!(f, "Serialization error: {}", e),
            SaveError::Deserialize(e) => write!(f, "Deserialization error: {}", e),
            SaveError::Corrupt(msg) => write!(f, "Corrupt save: {}", msg),
            SaveError::NotFound(path) => {
                write!(f, "No save found at {}", path.display())
            }
        }
    }
}

impl std::error::Error for SaveError {}

impl From<io::Error> for SaveError {
    fn from(e: io::Error) -> Self {
        SaveError::Io(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Bincode,
}

fn encoding_for(path: &Path) -> Encoding {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => Encoding::Bincode,
        _ => Encoding::Json,
    }
}

fn is_save_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("bin")
    )
}

/// Path of the named save inside `dir`. Names without a `.json` or `.bin`
/// extension get `.json`.
pub fn save_path(dir: &Path, name: &str) -> Result<PathBuf, SaveError> {
    let name = name.trim();
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name != "..";
    if !valid {
        return Err(SaveError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid save name '{}'", name),
        )));
    }
    if is_save_file(Path::new(name)) {
        Ok(dir.join(name))
    } else {
        Ok(dir.join(format!("{}.json", name)))
    }
}

pub fn autosave_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.json", AUTOSAVE_NAME))
}

/// Write a save atomically: encode, write a temp file, then rename over the target.
/// A failed write never leaves a partial save behind.
pub fn save_game(save: &SaveFile, path: &Path) -> Result<(), SaveError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let encoded = match encoding_for(path) {
        Encoding::Json => {
            serde_json::to_vec_pretty(save).map_err(|e| SaveError::Serialize(e.to_string()))?
        }
        Encoding::Bincode => {
            bincode::serialize(save).map_err(|e| SaveError::Serialize(e.to_string()))?
        }
    };

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("save");
    let tmp = path.with_file_name(format!(".{}.tmp", filename));

    if let Err(e) = fs::write(&tmp, &encoded) {
        let _ = fs::remove_file(&tmp);
        return Err(SaveError::Io(e));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(SaveError::Io(e));
    }

    Ok(())
}

/// Read and decode a save, checking that its grids are well formed.
pub fn load_game(path: &Path) -> Result<SaveFile, SaveError> {
    if !path.exists() {
        return Err(SaveError::NotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    let save: SaveFile = match encoding_for(path) {
        Encoding::Json => {
            serde_json::from_slice(&data).map_err(|e| SaveError::Deserialize(e.to_string()))?
        }
        Encoding::Bincode => {
            bincode::deserialize(&data).map_err(|e| SaveError::Deserialize(e.to_string()))?
        }
    };

    save.check_consistency()
        .map_err(|e| SaveError::Corrupt(format!("{}: {}", path.display(), e)))?;

    Ok(save)
}

/// List save files in a directory, newest first.
pub fn list_saves(dir: &Path) -> Result<Vec<SaveMetadata>, SaveError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut saves = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() || !is_save_file(&path) {
            continue;
        }

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };

        // Skip temp files
        if filename.starts_with('.') {
            continue;
        }

        let metadata = entry.metadata()?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&filename)
            .to_string();
        saves.push(SaveMetadata {
            path: path.clone(),
            name,
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            file_size: metadata.len(),
        });
    }

    saves.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.name.cmp(&b.name)));

    Ok(saves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample(width: usize, height: usize) -> SaveFile {
        let len = grid::flat_len(width, height).unwrap();
        let mut state = vec![0u32; len];
        state[2] = 1;
        state[3] = 2;
        let mut weather = BTreeMap::new();
        weather.insert("Drought".to_string(), 2);
        SaveFile {
            version: SAVE_VERSION,
            scenario_key: "easy_start".to_string(),
            scenario: Scenario::empty(width, height, 3),
            width,
            height,
            game_state: state.clone(),
            history: vec![vec![0u32; len], state],
            future: vec![vec![0u32; len]],
            fully_grown_plants_reaped: 2,
            victory_condition_met: false,
            active_weather_events: weather,
            available_plant_types: vec!["Wheat".to_string(), "Corn".to_string()],
            debug_mode: true,
        }
    }

    #[test]
    fn json_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = save_path(dir.path(), "slot1").unwrap();
        assert_eq!(path.file_name().unwrap(), "slot1.json");

        let save = sample(4, 3);
        save_game(&save, &path).unwrap();
        assert_eq!(load_game(&path).unwrap(), save);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"gameState\""));
        assert!(raw.contains("\"fullyGrownPlantsReaped\": 2"));
        assert!(raw.contains("\"activeWeatherEvents\""));
    }

    #[test]
    fn bincode_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = save_path(dir.path(), "slot.bin").unwrap();
        let save = sample(3, 3);
        save_game(&save, &path).unwrap();
        assert_eq!(load_game(&path).unwrap(), save);
    }

    #[test]
    fn missing_save_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_game(&dir.path().join("nothing.json")).unwrap_err();
        assert!(matches!(err, SaveError::NotFound(_)));
    }

    #[test]
    fn garbage_is_a_deserialize_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_game(&path).unwrap_err(), SaveError::Deserialize(_)));

        let path = dir.path().join("bad.bin");
        fs::write(&path, b"\x01\x02").unwrap();
        assert!(matches!(load_game(&path).unwrap_err(), SaveError::Deserialize(_)));
    }

    #[test]
    fn wrong_grid_length_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.json");
        let mut save = sample(4, 3);
        save.history[0].pop();
        save_game(&save, &path).unwrap();
        let err = load_game(&path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt(_)));
        assert!(err.to_string().contains("grid 1"));
    }

    #[test]
    fn huge_dimensions_are_corrupt_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.json");
        let mut save = sample(2, 2);
        save.width = usize::MAX / 2;
        save.height = 4;
        save_game(&save, &path).unwrap();
        let err = load_game(&path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt(_)));
        assert!(err.to_string().contains("invalid grid size"));

        save.width = 0;
        assert!(save.check_consistency().is_err());
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let mut save = sample(2, 2);
        save.version = 99;
        assert!(save.check_consistency().unwrap_err().contains("version 99"));
    }

    #[test]
    fn invalid_names_rejected() {
        let dir = Path::new("saves");
        for bad in ["", "  ", "../escape", ".hidden", "a/b"] {
            assert!(save_path(dir, bad).is_err(), "{:?} should be rejected", bad);
        }
        assert_eq!(
            autosave_path(dir),
            save_path(dir, AUTOSAVE_NAME).unwrap()
        );
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        save_game(&sample(2, 2), &dir.path().join("a.json")).unwrap();
        let temp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_str().is_some_and(|n| n.starts_with('.')))
            .collect();
        assert!(temp_files.is_empty());
    }

    #[test]
    fn save_creates_directory_if_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("saves").join("x.json");
        save_game(&sample(2, 2), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn list_saves_newest_first_and_skips_other_files() {
        let dir = TempDir::new().unwrap();
        save_game(&sample(2, 2), &dir.path().join("older.json")).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        save_game(&sample(2, 2), &dir.path().join("newer.bin")).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join(".pending.json.tmp"), "tmp").unwrap();

        let saves = list_saves(dir.path()).unwrap();
        let names: Vec<&str> = saves.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
        assert!(saves.iter().all(|s| s.file_size > 0));
    }

    #[test]
    fn list_saves_missing_dir_is_empty() {
        assert!(list_saves(Path::new("/tmp/nonexistent_farmgrid_saves_4821"))
            .unwrap()
            .is_empty());
    }
}
