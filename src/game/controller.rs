use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    board::{Player, Pos},
    rules::{MoveResult, RuleEngine, RuleError},
    state::GameState,
};
use crate::ai::{AiAgent, AiConfig, AiDecision};
use crate::{console_log, console_warn};

/// 人机对战时 AI 执后手。
pub const AI_PLAYER: Player = Player::B;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    #[default]
    HumanVsHuman,
    HumanVsAi,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::HumanVsHuman => "human-vs-human",
            GameMode::HumanVsAi => "human-vs-ai",
        }
    }

    pub fn ai_player(self) -> Option<Player> {
        match self {
            GameMode::HumanVsHuman => None,
            GameMode::HumanVsAi => Some(AI_PLAYER),
        }
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human-vs-human" | "pvp" | "local" => Ok(GameMode::HumanVsHuman),
            "human-vs-ai" | "ai" | "pve" => Ok(GameMode::HumanVsAi),
            _ => Err(()),
        }
    }
}

/// 唯一持有权威状态的一方：接收落子请求，推进回合，必要时同步调用 AI。
#[derive(Debug, Clone)]
pub struct GameController {
    state: GameState,
    mode: GameMode,
    agent: AiAgent,
}

impl GameController {
    pub fn new(mode: GameMode) -> Self {
        Self::with_config(mode, AiConfig::default())
    }

    pub fn with_config(mode: GameMode, config: AiConfig) -> Self {
        Self {
            state: GameState::new(),
            mode,
            agent: AiAgent::new(config),
        }
    }

    /// 从已有局面继续（调试、测试用）。
    pub fn with_state(mut self, state: GameState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_ai_turn(&self) -> bool {
        !self.state.is_finished() && self.mode.ai_player() == Some(self.state.current_player)
    }

    pub fn reset(&mut self) {
        self.state = GameState::new();
        console_log!("game reset ({})", self.mode.as_str());
    }

    pub fn on_mode_changed(&mut self, mode: GameMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn legal_moves(&self) -> Vec<Pos> {
        if self.state.is_finished() {
            return Vec::new();
        }
        RuleEngine::legal_moves(&self.state)
    }

    pub fn is_legal(&self, row: i32, col: i32) -> bool {
        Pos::new(row, col)
            .map(|pos| RuleEngine::validate_move(&self.state, pos).is_ok())
            .unwrap_or(false)
    }

    /// 前端点击入口。非法请求直接忽略并返回空列表；
    /// 否则依次返回人类这一步以及随后 AI 应手的结果。
    pub fn on_move_requested(&mut self, row: i32, col: i32) -> Vec<MoveResult> {
        if self.is_ai_turn() {
            console_log!("ignored ({row}, {col}): waiting for AI");
            return Vec::new();
        }

        let result = Pos::new(row, col)
            .map_err(RuleError::from)
            .and_then(|pos| self.submit_move(pos));
        match result {
            Ok(result) => {
                let mut results = vec![result];
                results.extend(self.play_ai_turn());
                results
            }
            Err(error) => {
                console_log!("ignored ({row}, {col}): {error:?}");
                Vec::new()
            }
        }
    }

    pub fn submit_move(&mut self, pos: Pos) -> Result<MoveResult, RuleError> {
        let result = RuleEngine::play(&mut self.state, pos)?;
        if let Some(outcome) = &self.state.outcome {
            console_log!("game over: {:?}", outcome);
        }
        Ok(result)
    }

    /// 轮到 AI 时同步搜索并落子；搜索无合法落点则判和。
    pub fn play_ai_turn(&mut self) -> Option<MoveResult> {
        if !self.is_ai_turn() {
            return None;
        }

        let decision = self.agent.decide(&self.state);
        console_log!(
            "ai {} -> {:?} (score {}, nodes {}, cutoffs {})",
            decision.player,
            decision.mv,
            decision.evaluation,
            decision.nodes,
            decision.cutoffs
        );

        match decision.mv {
            Some(pos) => match self.submit_move(pos) {
                Ok(result) => Some(result),
                Err(error) => {
                    console_warn!("ai chose a rejected move {pos:?}: {error:?}");
                    None
                }
            },
            None => {
                console_warn!("ai {} has no legal move, declaring a draw", decision.player);
                self.state.declare_draw();
                Some(MoveResult::without_move(self.state.clone(), decision.player))
            }
        }
    }

    /// 为当前行棋方给出建议，不改变局面。
    pub fn suggest_move(&self) -> AiDecision {
        self.agent.clone().decide(&self.state)
    }
}

impl Default for GameController {
    fn default() -> Self {
        Self::new(GameMode::default())
    }
}
