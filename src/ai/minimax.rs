use serde::{Deserialize, Serialize};

use super::eval::evaluate;
use crate::game::{GameState, Player, Pos, RuleEngine, RuleError};

/// 固定搜索深度（层数）。
pub const SEARCH_DEPTH: u8 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    pub depth: u8,
}

impl AiConfig {
    pub fn with_depth(depth: u8) -> Self {
        Self { depth }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            depth: SEARCH_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub score: i32,
    #[serde(rename = "move")]
    pub mv: Option<Pos>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub player: Player,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<Pos>,
    pub evaluation: i32,
    pub depth_reached: u8,
    pub nodes: u64,
    pub cutoffs: u64,
}

impl AiDecision {
    pub fn result(&self) -> SearchResult {
        SearchResult {
            score: self.evaluation,
            mv: self.mv,
        }
    }
}

struct SearchStats {
    nodes: u64,
    depth_reached: u8,
    cutoffs: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self {
            nodes: 0,
            depth_reached: 0,
            cutoffs: 0,
        }
    }
}

/// 极小化极大 + alpha-beta 剪枝。根节点的行棋方即 AI 一方。
#[derive(Debug, Clone, Default)]
pub struct AiAgent {
    config: AiConfig,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    pub fn decide(&mut self, state: &GameState) -> AiDecision {
        let ai = state.current_player;
        let mut stats = SearchStats::new();

        if state.is_finished() {
            return AiDecision {
                player: ai,
                mv: None,
                evaluation: evaluate(state, ai),
                depth_reached: 0,
                nodes: 0,
                cutoffs: 0,
            };
        }

        let depth = self.config.depth.max(1);
        let mut best_move = None;
        let mut best_score = i32::MIN;
        let mut alpha = i32::MIN;
        let beta = i32::MAX;

        for pos in RuleEngine::legal_moves(state) {
            let Ok(child) = simulate(state, pos) else {
                continue;
            };
            let score = self.minimax_rec(&child, depth - 1, alpha, beta, false, ai, &mut stats);
            if score > best_score {
                best_score = score;
                best_move = Some(pos);
            }
            alpha = alpha.max(best_score);
        }

        if best_move.is_none() {
            best_score = evaluate(state, ai);
        }

        AiDecision {
            player: ai,
            mv: best_move,
            evaluation: best_score,
            depth_reached: stats.depth_reached,
            nodes: stats.nodes,
            cutoffs: stats.cutoffs,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn minimax_rec(
        &self,
        state: &GameState,
        depth_remaining: u8,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        ai: Player,
        stats: &mut SearchStats,
    ) -> i32 {
        stats.nodes += 1;
        let depth_explored = self.config.depth.max(1) - depth_remaining;
        if depth_explored > stats.depth_reached {
            stats.depth_reached = depth_explored;
        }

        if depth_remaining == 0 {
            return evaluate(state, ai);
        }

        let moves = RuleEngine::legal_moves(state);
        if moves.is_empty() {
            return evaluate(state, ai);
        }

        if maximizing {
            let mut value = i32::MIN;
            for pos in moves {
                let Ok(child) = simulate(state, pos) else {
                    continue;
                };
                let score =
                    self.minimax_rec(&child, depth_remaining - 1, alpha, beta, false, ai, stats);
                value = value.max(score);
                alpha = alpha.max(value);
                if beta <= alpha {
                    stats.cutoffs += 1;
                    break;
                }
            }
            value
        } else {
            let mut value = i32::MAX;
            for pos in moves {
                let Ok(child) = simulate(state, pos) else {
                    continue;
                };
                let score =
                    self.minimax_rec(&child, depth_remaining - 1, alpha, beta, true, ai, stats);
                value = value.min(score);
                beta = beta.min(value);
                if beta <= alpha {
                    stats.cutoffs += 1;
                    break;
                }
            }
            value
        }
    }
}

/// 搜索用的落子：只更新区域胜负，不做五连和元棋盘终局判定，然后换手。
fn simulate(state: &GameState, pos: Pos) -> Result<GameState, RuleError> {
    let mut child = RuleEngine::apply_move(state, pos, state.current_player)?;
    RuleEngine::settle_region(&mut child, pos);
    child.advance_turn();
    Ok(child)
}

/// 为当前行棋方选点；没有合法落点时 `mv` 为 `None`（和棋）。
pub fn choose_move(state: &GameState, depth: u8) -> SearchResult {
    AiAgent::new(AiConfig::with_depth(depth))
        .decide(state)
        .result()
}
