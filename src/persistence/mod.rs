pub mod save;

pub use save::{
    autosave_path, list_saves, load_game, save_game, save_path, SaveError, SaveFile,
    SaveMetadata, AUTOSAVE_NAME, SAVE_VERSION,
};
