use serde::{Deserialize, Serialize};

use super::board::{Board, MetaBoard, Player, Pos, RegionPos};
use super::rules::RuleEngine;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum VictoryReason {
    FiveInRow { line: Vec<Pos> },
    MetaLine { regions: Vec<RegionPos> },
    NoLegalMoves,
}

/// 终局结果；`winner` 为 `None` 表示和棋。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Option<Player>,
    pub reason: VictoryReason,
}

/// 供前端绘制的获胜连线。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "coords", rename_all = "lowercase")]
pub enum WinningLine {
    Cells(Vec<Pos>),
    Regions(Vec<RegionPos>),
}

impl Outcome {
    pub fn winning_line(&self) -> Option<WinningLine> {
        match &self.reason {
            VictoryReason::FiveInRow { line } => Some(WinningLine::Cells(line.clone())),
            VictoryReason::MetaLine { regions } => Some(WinningLine::Regions(regions.clone())),
            VictoryReason::NoLegalMoves => None,
        }
    }
}

/// 双方共用的两步落子历史。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveHistory {
    #[serde(default)]
    pub last: Option<Pos>,
    #[serde(default)]
    pub second_last: Option<Pos>,
}

impl MoveHistory {
    pub fn push(&mut self, pos: Pos) {
        self.second_last = self.last;
        self.last = Some(pos);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlayed { player: Player, pos: Pos },
    RegionWon { region: RegionPos, winner: Player },
    GameWon { winner: Player, reason: VictoryReason },
    GameDrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MarkCountMismatch { a: usize, b: usize },
    TurnMismatch { expected: Player, actual: Player },
    UnbackedRegionWinner { region: RegionPos, winner: Player },
    UnrecordedRegionWinner { region: RegionPos },
    HistoryOnEmptyCell { pos: Pos },
}

/// 游戏整体状态。搜索时按值复制，不与控制器持有的权威状态共享。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    #[serde(default)]
    pub meta: MetaBoard,
    pub current_player: Player,
    #[serde(default)]
    pub history: MoveHistory,
    #[serde(default)]
    pub turn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            meta: MetaBoard::new(),
            current_player: Player::A,
            history: MoveHistory::default(),
            turn: 0,
            outcome: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn winner(&self) -> Option<Player> {
        self.outcome.as_ref().and_then(|outcome| outcome.winner)
    }

    pub fn advance_turn(&mut self) {
        self.current_player = self.current_player.opponent();
    }

    pub fn declare_victory(&mut self, winner: Player, reason: VictoryReason) -> Outcome {
        let outcome = Outcome {
            winner: Some(winner),
            reason,
        };
        if self.outcome.is_none() {
            self.outcome = Some(outcome.clone());
        }
        outcome
    }

    pub fn declare_draw(&mut self) -> Outcome {
        let outcome = Outcome {
            winner: None,
            reason: VictoryReason::NoLegalMoves,
        };
        if self.outcome.is_none() {
            self.outcome = Some(outcome.clone());
        }
        outcome
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let a = self.board.count(Player::A);
        let b = self.board.count(Player::B);
        if a < b || a > b + 1 {
            return Err(IntegrityError::MarkCountMismatch { a, b });
        }

        if !self.is_finished() {
            let expected = if a == b { Player::A } else { Player::B };
            if self.current_player != expected {
                return Err(IntegrityError::TurnMismatch {
                    expected,
                    actual: self.current_player,
                });
            }
        }

        for region in MetaBoard::regions() {
            match self.meta.get(region) {
                Some(winner) => {
                    if !RuleEngine::region_has_line(&self.board, region, winner) {
                        return Err(IntegrityError::UnbackedRegionWinner { region, winner });
                    }
                }
                None => {
                    if RuleEngine::check_region_win(&self.board, region).is_some() {
                        return Err(IntegrityError::UnrecordedRegionWinner { region });
                    }
                }
            }
        }

        for pos in [self.history.last, self.history.second_last]
            .into_iter()
            .flatten()
        {
            if self.board.is_empty(pos) {
                return Err(IntegrityError::HistoryOnEmptyCell { pos });
            }
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
