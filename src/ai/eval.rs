//! 局面评估：正分有利于 AI 一方，负分有利于对手。

use crate::game::rules::{run_length, DIRECTIONS};
use crate::game::{Board, GameState, Player, RuleEngine};

/// 元棋盘三连（或盘面已有五连）时的固定分值。
/// 大于 81 格 × 4 方向 × 5000 的潜力上限，保证压过其它所有项。
pub const WIN_SCORE: i32 = 10_000_000;
pub const MATERIAL_WEIGHT: i32 = 10;

/// 假设在空格落子后，某方向上连子长度对应的加分。
#[inline]
pub fn run_bonus(length: usize) -> i32 {
    match length {
        2 => 20,
        3 => 200,
        4 => 5_000,
        _ => 0,
    }
}

pub fn evaluate(state: &GameState, ai: Player) -> i32 {
    let opponent = ai.opponent();

    if let Some(score) = decisive_score(state, ai) {
        return score;
    }

    let material =
        (state.board.count(ai) as i32 - state.board.count(opponent) as i32) * MATERIAL_WEIGHT;

    material + potential(&state.board, ai) - potential(&state.board, opponent)
}

/// 元棋盘三连优先于五连；先看 AI 一方。
fn decisive_score(state: &GameState, ai: Player) -> Option<i32> {
    let opponent = ai.opponent();
    if RuleEngine::check_meta_win(&state.meta, ai).is_some() {
        return Some(WIN_SCORE);
    }
    if RuleEngine::check_meta_win(&state.meta, opponent).is_some() {
        return Some(-WIN_SCORE);
    }
    if RuleEngine::find_five(&state.board, ai).is_some() {
        return Some(WIN_SCORE);
    }
    if RuleEngine::find_five(&state.board, opponent).is_some() {
        return Some(-WIN_SCORE);
    }
    None
}

/// 所有空格、四个方向上 `side` 假设落子后的连子加分之和。
pub fn potential(board: &Board, side: Player) -> i32 {
    board
        .empty_cells()
        .map(|pos| {
            DIRECTIONS
                .iter()
                .map(|&(dr, dc)| {
                    let length = 1
                        + run_length(board, pos, dr, dc, side)
                        + run_length(board, pos, -dr, -dc, side);
                    run_bonus(length)
                })
                .sum::<i32>()
        })
        .sum()
}
