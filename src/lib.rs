pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{choose_move, evaluate, AiAgent, AiConfig, AiDecision, SearchResult, SEARCH_DEPTH};
pub use game::{
    Board, BoardError, GameController, GameEvent, GameMode, GameState, IllegalReason,
    IntegrityError, Mark, MetaBoard, MoveHistory, MoveResult, Outcome, Player, Pos, RegionPos,
    RegionWin, RuleEngine, RuleError, VictoryReason, Winner, WinningLine,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_mode(mode: Option<&str>) -> Result<GameMode, JsValue> {
    match mode {
        None => Ok(GameMode::default()),
        Some(value) => GameMode::from_str(value)
            .map_err(|_| JsValue::from_str(&format!("unknown game mode: {value}"))),
    }
}

fn parse_player(player: Option<&str>, fallback: Player) -> Result<Player, JsValue> {
    match player.map(str::to_ascii_uppercase).as_deref() {
        None => Ok(fallback),
        Some("A") | Some("◯") => Ok(Player::A),
        Some("B") | Some("✕") => Ok(Player::B),
        Some(other) => Err(JsValue::from_str(&format!("unknown player: {other}"))),
    }
}

fn state_from_js(state: JsValue) -> Result<GameState, JsValue> {
    from_value(state).map_err(JsValue::from)
}

/// 前端持有的对局句柄，内部是唯一的权威状态。
#[wasm_bindgen]
pub struct GomokuEngine {
    controller: GameController,
}

#[wasm_bindgen]
impl GomokuEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(mode: Option<String>) -> Result<GomokuEngine, JsValue> {
        let mode = parse_mode(mode.as_deref())?;
        Ok(GomokuEngine {
            controller: GameController::new(mode),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.controller.state()).map_err(serde_to_js_error)
    }

    pub fn mode(&self) -> String {
        self.controller.mode().as_str().to_string()
    }

    /// 返回本次请求产生的全部 `MoveResult`（JSON 数组）；被拒绝时为空数组。
    pub fn on_move_requested(&mut self, row: i32, col: i32) -> Result<String, JsValue> {
        let results = self.controller.on_move_requested(row, col);
        serde_json::to_string(&results).map_err(serde_to_js_error)
    }

    pub fn on_mode_changed(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = parse_mode(Some(mode))?;
        self.controller.on_mode_changed(mode);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    pub fn legal_moves_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.controller.legal_moves()).map_err(serde_to_js_error)
    }

    pub fn is_legal_move(&self, row: i32, col: i32) -> bool {
        self.controller.is_legal(row, col)
    }

    pub fn suggest_move_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.controller.suggest_move()).map_err(serde_to_js_error)
    }

    /// 异步给出当前行棋方的建议，`delay_ms` 用于前端展示“思考中”。
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let controller = self.controller.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let decision = controller.suggest_move();
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 返回初始空局面。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves(state: JsValue) -> Result<JsValue, JsValue> {
    let state = state_from_js(state)?;
    let moves = if state.is_finished() {
        Vec::new()
    } else {
        RuleEngine::legal_moves(&state)
    };
    to_value(&moves).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "isLegalMove")]
pub fn is_legal_move(state: JsValue, row: i32, col: i32) -> Result<bool, JsValue> {
    let state = state_from_js(state)?;
    let pos = Pos::new(row, col).map_err(|error| to_js_error(error.into()))?;
    Ok(RuleEngine::validate_move(&state, pos).is_ok())
}

/// 以 `player`（默认当前行棋方）的视角评估局面。
#[wasm_bindgen(js_name = "evaluateState")]
pub fn evaluate_state(state: JsValue, player: Option<String>) -> Result<i32, JsValue> {
    let state = state_from_js(state)?;
    let side = parse_player(player.as_deref(), state.current_player)?;
    Ok(evaluate(&state, side))
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(state: JsValue, depth: Option<u8>) -> Result<JsValue, JsValue> {
    let state = state_from_js(state)?;
    let config = depth.map(AiConfig::with_depth).unwrap_or_default();
    let decision = AiAgent::new(config).decide(&state);
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state = state_from_js(state)?;
    RuleEngine::ensure_integrity(&state).map_err(to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
