use serde::{Deserialize, Serialize};

use super::{
    board::{Board, BoardError, Mark, MetaBoard, Player, Pos, RegionPos, REGION_SIZE},
    state::{GameEvent, GameState, IntegrityError, VictoryReason, WinningLine},
};

/// 连成五子即获胜。
pub const WIN_LENGTH: usize = 5;

/// 四个方向：纵、横、主对角线、副对角线。
pub const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// 3×3 格内的 8 条线：3 行、3 列、2 条对角线（按此顺序检查）。
const TRIPLE_LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IllegalReason {
    Occupied,
    RegionRepeat { region: RegionPos },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    InvalidCoordinate { row: i32, col: i32 },
    IllegalMove { pos: Pos, reason: IllegalReason },
    IntegrityViolation { error: IntegrityError },
}

impl From<BoardError> for RuleError {
    fn from(error: BoardError) -> Self {
        match error {
            BoardError::InvalidCoordinate { row, col } => RuleError::InvalidCoordinate { row, col },
            BoardError::CellOccupied { row, col } => RuleError::IllegalMove {
                pos: Pos { row, col },
                reason: IllegalReason::Occupied,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionWin {
    pub region: RegionPos,
    pub winner: Player,
}

/// 对外展示的胜负：`"A"`、`"B"` 或 `"draw"`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Winner {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Option<Player>> for Winner {
    fn from(player: Option<Player>) -> Self {
        match player {
            Some(Player::A) => Winner::A,
            Some(Player::B) => Winner::B,
            None => Winner::Draw,
        }
    }
}

/// 每一步落子后交给前端渲染的结果。`pos` 为空表示行棋方无子可下、直接判和。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResult {
    pub state: GameState,
    pub mover: Player,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Pos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_just_won: Option<RegionWin>,
    pub terminal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_sequence: Option<WinningLine>,
    pub events: Vec<GameEvent>,
}

impl MoveResult {
    pub fn new(
        state: GameState,
        mover: Player,
        pos: Pos,
        region_just_won: Option<RegionWin>,
        events: Vec<GameEvent>,
    ) -> Self {
        Self::build(state, mover, Some(pos), region_just_won, events)
    }

    /// 没有落子的终局结果（`mover` 无合法落点时判和）。
    pub fn without_move(state: GameState, mover: Player) -> Self {
        Self::build(state, mover, None, None, Vec::new())
    }

    fn build(
        state: GameState,
        mover: Player,
        pos: Option<Pos>,
        region_just_won: Option<RegionWin>,
        mut events: Vec<GameEvent>,
    ) -> Self {
        let outcome = state.outcome.clone();
        if let Some(ref outcome) = outcome {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { .. } | GameEvent::GameDrawn));
            if !has_event {
                events.push(match outcome.winner {
                    Some(winner) => GameEvent::GameWon {
                        winner,
                        reason: outcome.reason.clone(),
                    },
                    None => GameEvent::GameDrawn,
                });
            }
        }

        Self {
            terminal: outcome.is_some(),
            winner: outcome.as_ref().map(|outcome| Winner::from(outcome.winner)),
            winning_sequence: outcome.as_ref().and_then(|outcome| outcome.winning_line()),
            state,
            mover,
            pos,
            region_just_won,
            events,
        }
    }
}

/// 规则引擎：合法性判断、落子以及三种胜利判定。不持有状态。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    /// 空格，且不在前前一手所在的区域（双方共用同一个历史）。
    pub fn is_legal_move(state: &GameState, pos: Pos) -> bool {
        Self::check_placement(state, pos).is_ok()
    }

    fn check_placement(state: &GameState, pos: Pos) -> Result<(), IllegalReason> {
        if !state.board.is_empty(pos) {
            return Err(IllegalReason::Occupied);
        }
        if let Some(second_last) = state.history.second_last {
            let region = second_last.region();
            if region == pos.region() {
                return Err(IllegalReason::RegionRepeat { region });
            }
        }
        Ok(())
    }

    pub fn validate_move(state: &GameState, pos: Pos) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Self::check_placement(state, pos).map_err(|reason| RuleError::IllegalMove { pos, reason })
    }

    /// 行优先顺序的全部合法落点。
    pub fn legal_moves(state: &GameState) -> Vec<Pos> {
        let blocked = state.history.second_last.map(Pos::region);
        state
            .board
            .empty_cells()
            .filter(|pos| Some(pos.region()) != blocked)
            .collect()
    }

    /// 就地落子并推进历史，不切换当前玩家。
    pub fn place(state: &mut GameState, pos: Pos, player: Player) -> Result<(), RuleError> {
        state.board.set(pos, player)?;
        state.history.push(pos);
        state.turn += 1;
        Ok(())
    }

    pub fn apply_move(state: &GameState, pos: Pos, player: Player) -> Result<GameState, RuleError> {
        let mut next = state.clone();
        Self::place(&mut next, pos, player)?;
        Ok(next)
    }

    pub fn check_region_win(board: &Board, region: RegionPos) -> Mark {
        let grid = board.region_cells(region);
        TRIPLE_LINES.iter().find_map(|line| uniform(&grid, line))
    }

    pub fn region_has_line(board: &Board, region: RegionPos, player: Player) -> bool {
        let grid = board.region_cells(region);
        TRIPLE_LINES
            .iter()
            .any(|line| uniform(&grid, line) == Some(player))
    }

    /// 若该区域刚刚出现三连且元棋盘尚未记录，则写入元棋盘。
    pub fn settle_region(state: &mut GameState, pos: Pos) -> Option<RegionWin> {
        let region = pos.region();
        if state.meta.is_decided(region) {
            return None;
        }
        let winner = Self::check_region_win(&state.board, region)?;
        state.meta.set(region, winner);
        Some(RegionWin { region, winner })
    }

    /// 以刚落下的 `pos` 为锚点检查五连，只在 `player` 刚在此落子后有效。
    pub fn check_overall_win(board: &Board, pos: Pos, player: Player) -> Option<Vec<Pos>> {
        for (dr, dc) in DIRECTIONS {
            let backward = run_cells(board, pos, -dr, -dc, player);
            let forward = run_cells(board, pos, dr, dc, player);
            if backward.len() + forward.len() + 1 >= WIN_LENGTH {
                let mut line: Vec<Pos> = backward.into_iter().rev().collect();
                line.push(pos);
                line.extend(forward);
                return Some(line);
            }
        }
        None
    }

    /// 全盘扫描 `player` 的五连，返回找到的第一条。
    pub fn find_five(board: &Board, player: Player) -> Option<Vec<Pos>> {
        for start in board.occupied_by(player) {
            for (dr, dc) in DIRECTIONS {
                let continues_backward = start
                    .offset(dr, dc, -1)
                    .map_or(false, |prev| board.get(prev) == Some(player));
                if continues_backward {
                    continue;
                }
                let mut line = vec![start];
                line.extend(run_cells(board, start, dr, dc, player));
                if line.len() >= WIN_LENGTH {
                    return Some(line);
                }
            }
        }
        None
    }

    pub fn check_meta_win(meta: &MetaBoard, player: Player) -> Option<Vec<RegionPos>> {
        TRIPLE_LINES.iter().find_map(|line| {
            let regions = line.map(|(r, c)| RegionPos::new(r as u8, c as u8));
            regions
                .iter()
                .all(|region| meta.get(*region) == Some(player))
                .then(|| regions.to_vec())
        })
    }

    /// 完整的一步：校验 → 落子 → 区域 → 元棋盘（仅当区域刚被拿下）→ 五连 → 终局或换手。
    pub fn play(state: &mut GameState, pos: Pos) -> Result<MoveResult, RuleError> {
        Self::validate_move(state, pos)?;

        let mover = state.current_player;
        Self::place(state, pos, mover)?;
        let mut events = vec![GameEvent::MovePlayed { player: mover, pos }];

        let region_just_won = Self::settle_region(state, pos);
        if let Some(win) = region_just_won {
            events.push(GameEvent::RegionWon {
                region: win.region,
                winner: win.winner,
            });
            if let Some(regions) = Self::check_meta_win(&state.meta, mover) {
                state.declare_victory(mover, VictoryReason::MetaLine { regions });
            }
        }

        if !state.is_finished() {
            if let Some(line) = Self::check_overall_win(&state.board, pos, mover) {
                state.declare_victory(mover, VictoryReason::FiveInRow { line });
            }
        }

        if !state.is_finished() {
            state.advance_turn();
            if Self::legal_moves(state).is_empty() {
                state.declare_draw();
            }
        }

        Ok(MoveResult::new(
            state.clone(),
            mover,
            pos,
            region_just_won,
            events,
        ))
    }

    pub fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }
}

fn uniform(grid: &[[Mark; REGION_SIZE]; REGION_SIZE], line: &[(usize, usize); 3]) -> Mark {
    let [a, b, c] = line.map(|(r, c)| grid[r][c]);
    match a {
        Some(player) if b == a && c == a => Some(player),
        _ => None,
    }
}

/// 从 `pos`（不含）沿方向连续属于 `player` 的格子。
fn run_cells(board: &Board, pos: Pos, dr: i32, dc: i32, player: Player) -> Vec<Pos> {
    (1..)
        .map_while(|step| pos.offset(dr, dc, step))
        .take_while(|next| board.get(*next) == Some(player))
        .collect()
}

/// 同上，只计数不分配。
pub(crate) fn run_length(board: &Board, pos: Pos, dr: i32, dc: i32, player: Player) -> usize {
    (1..)
        .map_while(|step| pos.offset(dr, dc, step))
        .take_while(|next| board.get(*next) == Some(player))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i32, col: i32) -> Pos {
        Pos::new(row, col).expect("valid pos")
    }

    fn board_with(marks: &[(i32, i32, Player)]) -> Board {
        let mut board = Board::new();
        for &(row, col, player) in marks {
            board.set(pos(row, col), player).expect("empty cell");
        }
        board
    }

    fn play_all(state: &mut GameState, moves: &[(i32, i32)]) -> Vec<MoveResult> {
        moves
            .iter()
            .map(|&(row, col)| RuleEngine::play(state, pos(row, col)).expect("legal move"))
            .collect()
    }

    #[test]
    fn occupied_cell_is_illegal() {
        let mut state = GameState::new();
        play_all(&mut state, &[(4, 4)]);
        assert!(!RuleEngine::is_legal_move(&state, pos(4, 4)));
        assert_eq!(
            RuleEngine::validate_move(&state, pos(4, 4)),
            Err(RuleError::IllegalMove {
                pos: pos(4, 4),
                reason: IllegalReason::Occupied,
            })
        );
    }

    #[test]
    fn region_of_second_last_move_is_blocked_until_history_advances() {
        let mut state = GameState::new();
        // A:(4,4) in region (1,1), B:(0,0) in region (0,0).
        play_all(&mut state, &[(4, 4), (0, 0)]);
        assert_eq!(state.history.second_last, Some(pos(4, 4)));
        assert!(!RuleEngine::is_legal_move(&state, pos(4, 5)));
        assert!(!RuleEngine::is_legal_move(&state, pos(3, 3)));
        assert!(RuleEngine::is_legal_move(&state, pos(0, 1)));

        // A plays elsewhere, now region (0,0) (B's move) is the blocked one.
        play_all(&mut state, &[(8, 8)]);
        assert!(!RuleEngine::is_legal_move(&state, pos(1, 1)));
        assert!(RuleEngine::is_legal_move(&state, pos(4, 5)));

        // Two further moves elsewhere release region (0,0) again.
        play_all(&mut state, &[(6, 0)]);
        assert!(RuleEngine::is_legal_move(&state, pos(1, 1)));
    }

    #[test]
    fn region_repeat_reports_the_blocked_region() {
        let mut state = GameState::new();
        play_all(&mut state, &[(0, 0), (8, 8)]);
        assert_eq!(
            RuleEngine::validate_move(&state, pos(2, 2)),
            Err(RuleError::IllegalMove {
                pos: pos(2, 2),
                reason: IllegalReason::RegionRepeat {
                    region: RegionPos::new(0, 0),
                },
            })
        );
    }

    #[test]
    fn legal_moves_are_row_major_and_skip_blocked_region() {
        let mut state = GameState::new();
        assert_eq!(RuleEngine::legal_moves(&state).len(), 81);
        play_all(&mut state, &[(0, 0), (8, 8)]);
        let moves = RuleEngine::legal_moves(&state);
        assert_eq!(moves.len(), 81 - 2 - 8);
        assert_eq!(moves[0], pos(0, 3));
        assert!(moves.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(moves.iter().all(|mv| mv.region() != RegionPos::new(0, 0)));
    }

    #[test]
    fn apply_move_shifts_history_without_flipping_player() {
        let state = GameState::new();
        let next = RuleEngine::apply_move(&state, pos(2, 3), Player::A).expect("apply");
        assert_eq!(next.board.get(pos(2, 3)), Some(Player::A));
        assert_eq!(next.history.last, Some(pos(2, 3)));
        assert_eq!(next.history.second_last, None);
        assert_eq!(next.current_player, Player::A);
        assert!(state.board.is_empty(pos(2, 3)), "input state is untouched");
    }

    #[test]
    fn region_without_line_is_undecided() {
        use Player::{A, B};
        // A B A / A B B / B A A
        let board = board_with(&[
            (0, 0, A),
            (0, 1, B),
            (0, 2, A),
            (1, 0, A),
            (1, 1, B),
            (1, 2, B),
            (2, 0, B),
            (2, 1, A),
            (2, 2, A),
        ]);
        assert_eq!(RuleEngine::check_region_win(&board, RegionPos::new(0, 0)), None);
    }

    #[test]
    fn region_lines_are_detected() {
        let region = RegionPos::new(2, 1);
        for line in TRIPLE_LINES {
            let marks: Vec<_> = line
                .iter()
                .map(|&(r, c)| {
                    let cell = region.cell(r, c);
                    (cell.row as i32, cell.col as i32, Player::B)
                })
                .collect();
            let board = board_with(&marks);
            assert_eq!(RuleEngine::check_region_win(&board, region), Some(Player::B));
            assert!(RuleEngine::region_has_line(&board, region, Player::B));
            assert!(!RuleEngine::region_has_line(&board, region, Player::A));
        }
    }

    #[test]
    fn diagonal_five_through_last_move() {
        let board = board_with(&[
            (0, 0, Player::A),
            (1, 1, Player::A),
            (2, 2, Player::A),
            (3, 3, Player::A),
            (4, 4, Player::A),
        ]);
        let line = RuleEngine::check_overall_win(&board, pos(4, 4), Player::A)
            .expect("five on the diagonal");
        assert_eq!(
            line,
            vec![pos(0, 0), pos(1, 1), pos(2, 2), pos(3, 3), pos(4, 4)]
        );
    }

    #[test]
    fn four_in_a_row_is_not_a_win() {
        let board = board_with(&[
            (5, 2, Player::B),
            (5, 3, Player::B),
            (5, 4, Player::B),
            (5, 5, Player::B),
        ]);
        assert_eq!(RuleEngine::check_overall_win(&board, pos(5, 4), Player::B), None);
        assert_eq!(RuleEngine::find_five(&board, Player::B), None);
    }

    #[test]
    fn overline_and_anchor_in_the_middle() {
        let marks: Vec<_> = (1..8).map(|row| (row, 6, Player::A)).collect();
        let board = board_with(&marks);
        let line = RuleEngine::check_overall_win(&board, pos(4, 6), Player::A).expect("win");
        assert_eq!(line.len(), 7);
        assert_eq!(line.first(), Some(&pos(1, 6)));
        assert_eq!(line.last(), Some(&pos(7, 6)));
        assert_eq!(
            RuleEngine::find_five(&board, Player::A).map(|line| line.len()),
            Some(7)
        );
    }

    #[test]
    fn anti_diagonal_five_is_found_by_scan() {
        let marks: Vec<_> = (0..5).map(|i| (2 + i, 8 - i, Player::B)).collect();
        let board = board_with(&marks);
        let line = RuleEngine::find_five(&board, Player::B).expect("anti-diagonal");
        assert_eq!(line.len(), 5);
        assert_eq!(
            RuleEngine::check_overall_win(&board, pos(4, 6), Player::B).map(|line| line.len()),
            Some(5)
        );
    }

    #[test]
    fn meta_lines() {
        let mut meta = MetaBoard::new();
        assert_eq!(RuleEngine::check_meta_win(&meta, Player::B), None);
        meta.set(RegionPos::new(0, 0), Player::B);
        meta.set(RegionPos::new(0, 1), Player::B);
        meta.set(RegionPos::new(1, 1), Player::A);
        assert_eq!(RuleEngine::check_meta_win(&meta, Player::B), None);
        meta.set(RegionPos::new(0, 2), Player::B);
        assert_eq!(
            RuleEngine::check_meta_win(&meta, Player::B),
            Some(vec![
                RegionPos::new(0, 0),
                RegionPos::new(0, 1),
                RegionPos::new(0, 2),
            ])
        );
        assert_eq!(RuleEngine::check_meta_win(&meta, Player::A), None);

        let mut diagonal = MetaBoard::new();
        for i in 0..3 {
            diagonal.set(RegionPos::new(i, 2 - i), Player::A);
        }
        assert!(RuleEngine::check_meta_win(&diagonal, Player::A).is_some());
    }

    #[test]
    fn play_records_region_win_and_keeps_region_playable() {
        let mut state = GameState::new();
        // A builds the top row of region (0,0); B answers in other regions.
        let results = play_all(
            &mut state,
            &[(0, 0), (8, 8), (3, 3), (8, 5), (0, 1), (5, 8), (6, 3), (8, 2), (0, 2)],
        );
        let last = results.last().expect("results");
        assert_eq!(
            last.region_just_won,
            Some(RegionWin {
                region: RegionPos::new(0, 0),
                winner: Player::A,
            })
        );
        assert!(!last.terminal);
        assert_eq!(state.meta.get(RegionPos::new(0, 0)), Some(Player::A));
        assert_eq!(state.current_player, Player::B);

        // The decided region still accepts marks.
        play_all(&mut state, &[(1, 1)]);
        assert_eq!(state.board.get(pos(1, 1)), Some(Player::B));
        assert_eq!(state.meta.get(RegionPos::new(0, 0)), Some(Player::A));
        assert_eq!(state.integrity_check(), Ok(()));
    }

    #[test]
    fn play_declares_five_in_row_winner() {
        let mut state = GameState::new();
        let results = play_all(
            &mut state,
            &[
                (0, 0), (8, 0),
                (3, 3), (8, 3),
                (1, 1), (8, 6),
                (4, 4), (5, 8),
                (2, 2),
            ],
        );
        let last = results.last().expect("results");
        assert!(last.terminal);
        assert_eq!(last.winner, Some(Winner::A));
        assert_eq!(
            last.winning_sequence,
            Some(WinningLine::Cells(vec![
                pos(0, 0),
                pos(1, 1),
                pos(2, 2),
                pos(3, 3),
                pos(4, 4),
            ]))
        );
        assert!(last
            .events
            .iter()
            .any(|event| matches!(event, GameEvent::GameWon { winner: Player::A, .. })));
        assert_eq!(state.current_player, Player::A, "turn does not advance after a win");
        assert_eq!(
            RuleEngine::play(&mut state, pos(7, 7)).map(|_| ()),
            Err(RuleError::GameFinished)
        );
    }

    #[test]
    fn meta_win_ends_the_game_with_region_line() {
        let mut state = GameState::new();
        state.meta.set(RegionPos::new(0, 0), Player::B);
        state.meta.set(RegionPos::new(0, 1), Player::B);
        // Region (0,2): B holds (0,6),(0,7); completing (0,8) wins the region.
        state.board.set(pos(0, 6), Player::B).unwrap();
        state.board.set(pos(0, 7), Player::B).unwrap();
        state.current_player = Player::B;

        let result = RuleEngine::play(&mut state, pos(0, 8)).expect("legal");
        assert!(result.terminal);
        assert_eq!(result.winner, Some(Winner::B));
        assert_eq!(
            result.winning_sequence,
            Some(WinningLine::Regions(vec![
                RegionPos::new(0, 0),
                RegionPos::new(0, 1),
                RegionPos::new(0, 2),
            ]))
        );
        assert_eq!(state.winner(), Some(Player::B));
    }

    #[test]
    fn move_result_serializes_winner_as_string() {
        let mut state = GameState::new();
        let result = RuleEngine::play(&mut state, pos(4, 4)).expect("legal");
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["terminal"], false);
        assert!(json.get("winner").is_none());
        assert_eq!(serde_json::to_value(Winner::Draw).unwrap(), "draw");
        assert_eq!(serde_json::to_value(Winner::A).unwrap(), "A");
    }
}
