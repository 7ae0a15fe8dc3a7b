pub mod game;
pub mod plants;
pub mod scenario;
