//! AI 算法模块（局面评估、极小化极大搜索）。

pub mod eval;
pub mod minimax;

pub use eval::{evaluate, WIN_SCORE};
pub use minimax::{choose_move, AiAgent, AiConfig, AiDecision, SearchResult, SEARCH_DEPTH};
