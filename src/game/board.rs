use std::fmt;

use serde::{Deserialize, Serialize};

/// 棋盘边长。
pub const BOARD_SIZE: usize = 9;
pub const TOTAL_CELLS: usize = BOARD_SIZE * BOARD_SIZE;
/// 小区域（以及元棋盘）的边长。
pub const REGION_SIZE: usize = 3;

/// 玩家，A 为先手。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Player {
    A,
    B,
}

impl Player {
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Player::A => "◯",
            Player::B => "✕",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.symbol())
    }
}

/// 格子内容：`None` 为空。元棋盘上 `None` 表示该区域尚未决出胜者。
pub type Mark = Option<Player>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BoardError {
    InvalidCoordinate { row: i32, col: i32 },
    CellOccupied { row: u8, col: u8 },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::InvalidCoordinate { row, col } => {
                write!(f, "coordinate ({row}, {col}) is off the board")
            }
            BoardError::CellOccupied { row, col } => write!(f, "cell ({row}, {col}) is occupied"),
        }
    }
}

/// 9×9 棋盘上的坐标。反序列化时同样做越界检查。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "RawPos")]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

#[derive(Deserialize)]
struct RawPos {
    row: i32,
    col: i32,
}

impl TryFrom<RawPos> for Pos {
    type Error = BoardError;

    fn try_from(raw: RawPos) -> Result<Self, Self::Error> {
        Pos::new(raw.row, raw.col)
    }
}

impl Pos {
    pub fn new(row: i32, col: i32) -> Result<Self, BoardError> {
        if Self::is_valid(row, col) {
            Ok(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            Err(BoardError::InvalidCoordinate { row, col })
        }
    }

    #[inline]
    pub fn is_valid(row: i32, col: i32) -> bool {
        (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        debug_assert!(index < TOTAL_CELLS);
        Self {
            row: (index / BOARD_SIZE) as u8,
            col: (index % BOARD_SIZE) as u8,
        }
    }

    #[inline]
    pub fn region(self) -> RegionPos {
        RegionPos {
            row: self.row / REGION_SIZE as u8,
            col: self.col / REGION_SIZE as u8,
        }
    }

    /// 沿 `(dr, dc)` 方向走 `step` 格，越界时返回 `None`。
    #[inline]
    pub fn offset(self, dr: i32, dc: i32, step: i32) -> Option<Pos> {
        let row = self.row as i32 + dr * step;
        let col = self.col as i32 + dc * step;
        Pos::is_valid(row, col).then(|| Pos {
            row: row as u8,
            col: col as u8,
        })
    }
}

/// 元棋盘坐标，也就是小区域的编号 `(row / 3, col / 3)`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub row: u8,
    pub col: u8,
}

impl RegionPos {
    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!((row as usize) < REGION_SIZE && (col as usize) < REGION_SIZE);
        Self { row, col }
    }

    pub fn origin(self) -> Pos {
        Pos {
            row: self.row * REGION_SIZE as u8,
            col: self.col * REGION_SIZE as u8,
        }
    }

    /// 区域内第 `(r, c)` 个格子（0..3）。
    pub fn cell(self, r: usize, c: usize) -> Pos {
        let origin = self.origin();
        Pos {
            row: origin.row + r as u8,
            col: origin.col + c as u8,
        }
    }
}

/// 9×9 落子棋盘，按行优先连续存放 81 个格子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Mark>>", try_from = "Vec<Vec<Mark>>")]
pub struct Board {
    cells: [Mark; TOTAL_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [None; TOTAL_CELLS],
        }
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Mark {
        self.cells[pos.index()]
    }

    pub fn get_at(&self, row: i32, col: i32) -> Result<Mark, BoardError> {
        Ok(self.get(Pos::new(row, col)?))
    }

    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.get(pos).is_none()
    }

    /// 落子。格子只能从空变为有子一次。
    pub fn set(&mut self, pos: Pos, player: Player) -> Result<(), BoardError> {
        let cell = &mut self.cells[pos.index()];
        if cell.is_some() {
            return Err(BoardError::CellOccupied {
                row: pos.row,
                col: pos.col,
            });
        }
        *cell = Some(player);
        Ok(())
    }

    pub fn set_at(&mut self, row: i32, col: i32, player: Player) -> Result<(), BoardError> {
        self.set(Pos::new(row, col)?, player)
    }

    pub fn count(&self, player: Player) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell == Some(player))
            .count()
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| Pos::from_index(index))
    }

    pub fn occupied_by(&self, player: Player) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| **cell == Some(player))
            .map(|(index, _)| Pos::from_index(index))
    }

    /// 区域内的 3×3 子格，`[r][c]` 为区域内相对坐标。
    pub fn region_cells(&self, region: RegionPos) -> [[Mark; REGION_SIZE]; REGION_SIZE] {
        let mut grid = [[None; REGION_SIZE]; REGION_SIZE];
        for (r, row) in grid.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.get(region.cell(r, c));
            }
        }
        grid
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Mark]> + '_ {
        self.cells.chunks(BOARD_SIZE)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Board> for Vec<Vec<Mark>> {
    fn from(board: Board) -> Self {
        board.rows().map(<[Mark]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<Mark>>> for Board {
    type Error = String;

    fn try_from(rows: Vec<Vec<Mark>>) -> Result<Self, Self::Error> {
        if rows.len() != BOARD_SIZE {
            return Err(format!("expected {BOARD_SIZE} rows, got {}", rows.len()));
        }
        let mut board = Board::new();
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(format!(
                    "row {row_index}: expected {BOARD_SIZE} cells, got {}",
                    row.len()
                ));
            }
            for (col_index, cell) in row.into_iter().enumerate() {
                board.cells[row_index * BOARD_SIZE + col_index] = cell;
            }
        }
        Ok(board)
    }
}

/// 3×3 元棋盘，记录每个区域的胜者。一旦写入不会再改变。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaBoard {
    grid: [[Mark; REGION_SIZE]; REGION_SIZE],
}

impl MetaBoard {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, region: RegionPos) -> Mark {
        self.grid[region.row as usize][region.col as usize]
    }

    #[inline]
    pub fn is_decided(&self, region: RegionPos) -> bool {
        self.get(region).is_some()
    }

    /// 记录区域胜者；已决出的区域保持原值并返回 `false`。
    pub fn set(&mut self, region: RegionPos, winner: Player) -> bool {
        let entry = &mut self.grid[region.row as usize][region.col as usize];
        if entry.is_some() {
            return false;
        }
        *entry = Some(winner);
        true
    }

    pub fn regions() -> impl Iterator<Item = RegionPos> {
        (0..REGION_SIZE as u8)
            .flat_map(|row| (0..REGION_SIZE as u8).map(move |col| RegionPos::new(row, col)))
    }
}
