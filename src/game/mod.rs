//! 游戏核心逻辑模块（棋盘、状态、规则引擎、对局控制）。

pub mod board;
pub mod controller;
pub mod rules;
pub mod state;

pub use board::{
    Board,
    BoardError,
    Mark,
    MetaBoard,
    Player,
    Pos,
    RegionPos,
    BOARD_SIZE,
    REGION_SIZE,
    TOTAL_CELLS,
};
pub use controller::{GameController, GameMode, AI_PLAYER};
pub use rules::{IllegalReason, MoveResult, RegionWin, RuleEngine, RuleError, Winner, WIN_LENGTH};
pub use state::{
    GameEvent,
    GameState,
    IntegrityError,
    MoveHistory,
    Outcome,
    VictoryReason,
    WinningLine,
};
