use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::world::cell::{Cell, Direction, PlantKind, Position};

/// Values stored per cell in the flat encoding: sun, moisture, kind code, growth.
pub const CELL_DATA_SIZE: usize = 4;
/// Values after the cells in the flat encoding: player x, player y, turn.
pub const TRAILER_SIZE: usize = 3;
/// Largest accepted width or height.
pub const MAX_DIMENSION: usize = 1024;

/// Length of the flat encoding of a `width` x `height` grid. `None` when a
/// side is zero or larger than [`MAX_DIMENSION`].
pub fn flat_len(width: usize, height: usize) -> Option<usize> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return None;
    }
    width
        .checked_mul(height)?
        .checked_mul(CELL_DATA_SIZE)?
        .checked_add(TRAILER_SIZE)
}

/// Errors from grid access and flat decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    InvalidCoordinate {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    InvalidCell {
        x: usize,
        y: usize,
        cell: Cell,
    },
    TurnRegression {
        current: u32,
        requested: u32,
    },
    InvalidSize {
        width: usize,
        height: usize,
    },
    Corrupt(String),
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::InvalidCoordinate {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Invalid coordinate ({}, {}) for {}x{} grid",
                x, y, width, height
            ),
            GridError::InvalidCell { x, y, cell } => write!(
                f,
                "Invalid cell at ({}, {}): {:?} with growth {}",
                x, y, cell.plant, cell.growth
            ),
            GridError::TurnRegression { current, requested } => write!(
                f,
                "Turn cannot move backwards from {} to {}",
                current, requested
            ),
            GridError::InvalidSize { width, height } => write!(
                f,
                "Invalid grid size {}x{}: each side must be 1-{}",
                width, height, MAX_DIMENSION
            ),
            GridError::Corrupt(msg) => write!(f, "Corrupt grid data: {}", msg),
        }
    }
}

impl std::error::Error for GridError {}

/// Complete simulation state: cells, player position and turn counter.
///
/// Cell storage is shared copy-on-write, so cloning a `GridState` for a
/// history snapshot is O(1) and a snapshot never sees later writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridState {
    width: usize,
    height: usize,
    cells: Arc<Vec<Cell>>,
    player: Position,
    turn: u32,
}

impl GridState {
    /// Empty grid at turn 0 with the player at `player`.
    pub fn new(width: usize, height: usize, player: Position) -> Result<Self, GridError> {
        if flat_len(width, height).is_none() {
            return Err(GridError::InvalidSize { width, height });
        }
        if !(player.x < width && player.y < height) {
            return Err(GridError::InvalidCoordinate {
                x: player.x,
                y: player.y,
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            cells: Arc::new(vec![Cell::EMPTY; width * height]),
            player,
            turn: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    fn index(&self, x: usize, y: usize) -> Result<usize, GridError> {
        if self.in_bounds(x, y) {
            Ok(y * self.width + x)
        } else {
            Err(GridError::InvalidCoordinate {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn cell(&self, x: usize, y: usize) -> Result<Cell, GridError> {
        let i = self.index(x, y)?;
        Ok(self.cells[i])
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) -> Result<(), GridError> {
        let i = self.index(x, y)?;
        if !cell.is_valid() {
            return Err(GridError::InvalidCell { x, y, cell });
        }
        Arc::make_mut(&mut self.cells)[i] = cell;
        Ok(())
    }

    pub fn set_sun(&mut self, x: usize, y: usize, sun: u8) -> Result<(), GridError> {
        let cell = self.cell(x, y)?;
        self.set_cell(x, y, Cell { sun, ..cell })
    }

    pub fn set_moisture(&mut self, x: usize, y: usize, moisture: u8) -> Result<(), GridError> {
        let cell = self.cell(x, y)?;
        self.set_cell(x, y, Cell { moisture, ..cell })
    }

    /// Replace the plant in a cell, keeping its sun and moisture.
    pub fn set_plant(
        &mut self,
        x: usize,
        y: usize,
        plant: PlantKind,
        growth: u8,
    ) -> Result<(), GridError> {
        let cell = self.cell(x, y)?;
        self.set_cell(
            x,
            y,
            Cell {
                plant,
                growth,
                ..cell
            },
        )
    }

    pub fn set_player(&mut self, player: Position) -> Result<(), GridError> {
        self.index(player.x, player.y)?;
        self.player = player;
        Ok(())
    }

    /// Advance the turn counter by one and return the new turn.
    pub fn increment_turn(&mut self) -> u32 {
        self.turn += 1;
        self.turn
    }

    /// Set the turn counter. The counter never decreases.
    pub fn set_turn(&mut self, turn: u32) -> Result<(), GridError> {
        if turn < self.turn {
            return Err(GridError::TurnRegression {
                current: self.turn,
                requested: turn,
            });
        }
        self.turn = turn;
        Ok(())
    }

    /// Row-major view of all cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        Arc::make_mut(&mut self.cells).as_mut_slice()
    }

    pub fn position_of(&self, index: usize) -> Position {
        Position::new(index % self.width, index / self.width)
    }

    /// The cell one step from `from` in `direction`, if it is inside the grid.
    pub fn step(&self, from: Position, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        let x = from.x.checked_add_signed(dx)?;
        let y = from.y.checked_add_signed(dy)?;
        self.in_bounds(x, y).then_some(Position::new(x, y))
    }

    /// In-bounds orthogonal neighbors of (x, y). Off-grid neighbors are skipped.
    pub fn neighbors(&self, x: usize, y: usize) -> Result<Vec<Position>, GridError> {
        self.index(x, y)?;
        let origin = Position::new(x, y);
        Ok(Direction::all()
            .into_iter()
            .filter_map(|dir| self.step(origin, dir))
            .collect())
    }

    /// Plant kinds of the in-bounds orthogonal neighbors of (x, y).
    pub fn neighbor_kinds(&self, x: usize, y: usize) -> Result<Vec<PlantKind>, GridError> {
        Ok(self
            .neighbors(x, y)?
            .into_iter()
            .map(|p| self.cells[p.y * self.width + p.x].plant)
            .collect())
    }

    pub fn planted_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Encode as a flat numeric array: four values per cell, then player x, y and turn.
    pub fn to_flat(&self) -> Vec<u32> {
        let mut data = Vec::with_capacity(self.cells.len() * CELL_DATA_SIZE + TRAILER_SIZE);
        for cell in self.cells.iter() {
            data.push(cell.sun as u32);
            data.push(cell.moisture as u32);
            data.push(cell.plant.code() as u32);
            data.push(cell.growth as u32);
        }
        data.push(self.player.x as u32);
        data.push(self.player.y as u32);
        data.push(self.turn);
        data
    }

    /// Decode a flat array produced by [`GridState::to_flat`], validating every value.
    pub fn from_flat(width: usize, height: usize, data: &[u32]) -> Result<Self, GridError> {
        let expected =
            flat_len(width, height).ok_or(GridError::InvalidSize { width, height })?;
        let cell_count = width * height;
        if data.len() != expected {
            return Err(GridError::Corrupt(format!(
                "expected {} values for {}x{} grid, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        let byte = |value: u32, what: &str, index: usize| -> Result<u8, GridError> {
            u8::try_from(value).map_err(|_| {
                GridError::Corrupt(format!("{} {} out of range at cell {}", what, value, index))
            })
        };

        let mut cells = Vec::with_capacity(cell_count);
        for (i, chunk) in data[..cell_count * CELL_DATA_SIZE]
            .chunks_exact(CELL_DATA_SIZE)
            .enumerate()
        {
            let cell = Cell {
                sun: byte(chunk[0], "sun", i)?,
                moisture: byte(chunk[1], "moisture", i)?,
                plant: PlantKind::from_code(byte(chunk[2], "plant code", i)?),
                growth: byte(chunk[3], "growth", i)?,
            };
            if !cell.is_valid() {
                return Err(GridError::InvalidCell {
                    x: i % width.max(1),
                    y: i / width.max(1),
                    cell,
                });
            }
            cells.push(cell);
        }

        let trailer = &data[cell_count * CELL_DATA_SIZE..];
        let player = Position::new(trailer[0] as usize, trailer[1] as usize);
        let mut grid = GridState::new(width, height, player)?;
        grid.cells = Arc::new(cells);
        grid.turn = trailer[2];
        Ok(grid)
    }
}
