pub mod cell;
pub mod grid;

pub use cell::{Cell, Direction, MAX_GROWTH, PlantKind, Position};
pub use grid::{GridError, GridState};
