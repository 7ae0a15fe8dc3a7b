use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Growth level of a fully grown plant.
pub const MAX_GROWTH: u8 = 3;

// === Enums ===

/// Kind of plant occupying a cell.
///
/// Built-in kinds have fixed codes (None=0, Wheat=1, Corn=2, Rice=3). Kinds
/// registered at runtime use `Custom` with a code of 4 or above; always build
/// them through [`PlantKind::from_code`] so a code never has two spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlantKind {
    #[default]
    None,
    Wheat,
    Corn,
    Rice,
    Custom(u8),
}

impl PlantKind {
    /// Lowest code available to runtime-registered kinds.
    pub const FIRST_CUSTOM_CODE: u8 = 4;

    pub fn builtin() -> [PlantKind; 3] {
        [PlantKind::Wheat, PlantKind::Corn, PlantKind::Rice]
    }

    pub fn code(self) -> u8 {
        match self {
            PlantKind::None => 0,
            PlantKind::Wheat => 1,
            PlantKind::Corn => 2,
            PlantKind::Rice => 3,
            PlantKind::Custom(code) => code,
        }
    }

    pub fn from_code(code: u8) -> PlantKind {
        match code {
            0 => PlantKind::None,
            1 => PlantKind::Wheat,
            2 => PlantKind::Corn,
            3 => PlantKind::Rice,
            other => PlantKind::Custom(other),
        }
    }

    pub fn is_none(self) -> bool {
        self == PlantKind::None
    }
}

/// One of the four orthogonal directions used for movement and targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    /// (dx, dy) with y growing downwards.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(format!(
                "Invalid direction '{}'. Expected one of: up, down, left, right",
                other
            )),
        }
    }
}

// === Position ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

// === Cell ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub sun: u8,
    pub moisture: u8,
    pub plant: PlantKind,
    pub growth: u8,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        sun: 0,
        moisture: 0,
        plant: PlantKind::None,
        growth: 0,
    };

    /// A cell holding `plant` at `growth`, with no sun or moisture yet.
    pub fn planted(plant: PlantKind, growth: u8) -> Self {
        Self {
            plant,
            growth,
            ..Cell::EMPTY
        }
    }

    /// Growth never exceeds [`MAX_GROWTH`], and only planted cells may have growth.
    pub fn is_valid(&self) -> bool {
        self.growth <= MAX_GROWTH && (self.growth == 0 || !self.plant.is_none())
    }

    pub fn is_empty(&self) -> bool {
        self.plant.is_none()
    }

    pub fn is_fully_grown(&self) -> bool {
        !self.plant.is_none() && self.growth >= MAX_GROWTH
    }
}
